//! Boundary endpoint: one envelope in, one envelope out

use axum::{extract::State, routing::post, Json, Router};
use std::sync::atomic::Ordering;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::gateway::{BoundaryRequest, BoundaryResponse};
use crate::AppState;

/// POST /message
///
/// Malformed envelopes are rejected with 400; inference failures are
/// reported inside the envelope (`success: false`) with status 200.
pub async fn handle_message(
    State(state): State<AppState>,
    payload: Result<Json<BoundaryRequest>, axum::extract::rejection::JsonRejection>,
) -> ApiResult<Json<BoundaryResponse>> {
    let Json(request) = payload.map_err(ApiError::from)?;
    debug!("Boundary request: {}", request.kind());

    let response = state.broker.handle(request).await;
    state.requests_handled.fetch_add(1, Ordering::Relaxed);
    if let Some(error) = &response.error {
        *state.last_error.write().await = Some(error.clone());
    }
    Ok(Json(response))
}

pub fn message_routes() -> Router<AppState> {
    Router::new().route("/message", post(handle_message))
}
