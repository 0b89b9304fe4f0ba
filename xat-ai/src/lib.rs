//! # xat-ai
//!
//! Account annotation and suggestion pipeline:
//! - identity extraction from a mutating document and idempotent badge rendering
//! - interaction recording and the two heuristic analyzers (patterns, content)
//! - confidence-weighted fusion of their hypotheses
//! - the inference boundary (pipeline side and the mediator service side)

pub mod analyzers;
pub mod api;
pub mod db;
pub mod dom;
pub mod error;
pub mod fusion;
pub mod gateway;
pub mod identity;
pub mod json_extract;
pub mod models;
pub mod pipeline;
pub mod recorder;
pub mod sampler;
pub mod scanner;
pub mod store;
pub mod suggestion;

pub use crate::error::{ApiError, ApiResult};
pub use crate::identity::IdentityHandle;
pub use crate::pipeline::Pipeline;

use axum::Router;
use chrono::{DateTime, Utc};
use gateway::InferenceBroker;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Shared state of the mediator service
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<InferenceBroker>,
    pub startup_time: DateTime<Utc>,
    pub last_error: Arc<RwLock<Option<String>>>,
    pub requests_handled: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(broker: InferenceBroker) -> Self {
        Self {
            broker: Arc::new(broker),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
            requests_handled: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn requests_handled(&self) -> u64 {
        self.requests_handled.load(Ordering::Relaxed)
    }
}

/// Build the mediator service router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::message_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
