//! Persistent store seam
//!
//! The scanner, recorder and CLI only see `JudgmentStore`. `SqliteStore` is
//! the shipped implementation; tests may substitute their own.

pub mod portability;
pub mod sqlite;

use crate::identity::IdentityHandle;
use crate::models::{InteractionEvent, Judgment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use xat_common::Result;

pub use portability::{export_bundle, import_bundle, overview_stats, ExportBundle, OverviewStats};
pub use sqlite::SqliteStore;

/// Judgments (put/get/delete) and the append-only interaction log
#[async_trait]
pub trait JudgmentStore: Send + Sync {
    async fn get_judgment(&self, identity: &IdentityHandle) -> Result<Option<Judgment>>;

    /// Whole-record overwrite
    async fn put_judgment(&self, judgment: &Judgment) -> Result<()>;

    /// Returns whether a record existed
    async fn delete_judgment(&self, identity: &IdentityHandle) -> Result<bool>;

    async fn list_judgments(&self) -> Result<Vec<Judgment>>;

    async fn append_interaction(
        &self,
        identity: &IdentityHandle,
        kind: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<InteractionEvent>;

    /// Events for one identity in insertion order
    async fn list_interactions(&self, identity: &IdentityHandle) -> Result<Vec<InteractionEvent>>;
}
