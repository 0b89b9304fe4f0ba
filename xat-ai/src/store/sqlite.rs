//! SQLite-backed store

use super::JudgmentStore;
use crate::db;
use crate::identity::IdentityHandle;
use crate::models::{InteractionEvent, Judgment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::Path;
use xat_common::Result;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file
    pub async fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(xat_common::db::init_database(db_path).await?))
    }

    /// Private in-memory store with the full schema
    pub async fn in_memory() -> Result<Self> {
        Ok(Self::new(xat_common::db::init_memory_database().await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl JudgmentStore for SqliteStore {
    async fn get_judgment(&self, identity: &IdentityHandle) -> Result<Option<Judgment>> {
        db::judgments::load_judgment(&self.pool, identity).await
    }

    async fn put_judgment(&self, judgment: &Judgment) -> Result<()> {
        db::judgments::save_judgment(&self.pool, judgment).await
    }

    async fn delete_judgment(&self, identity: &IdentityHandle) -> Result<bool> {
        db::judgments::delete_judgment(&self.pool, identity).await
    }

    async fn list_judgments(&self) -> Result<Vec<Judgment>> {
        db::judgments::list_judgments(&self.pool).await
    }

    async fn append_interaction(
        &self,
        identity: &IdentityHandle,
        kind: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<InteractionEvent> {
        db::interactions::append_interaction(&self.pool, identity, kind, timestamp).await
    }

    async fn list_interactions(&self, identity: &IdentityHandle) -> Result<Vec<InteractionEvent>> {
        db::interactions::list_interactions(&self.pool, identity).await
    }
}
