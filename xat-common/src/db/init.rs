//! Database initialization
//!
//! Creates the SQLite file on first run and applies the (idempotent) schema:
//! - `settings`: key/value pairs, including the `ai_config` JSON blob
//! - `judgments`: one row per identity, overwritten wholesale on save
//! - `interactions`: append-only interaction log

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database file and apply the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the CLI read while the scanner writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// A single connection is used: every `:memory:` connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Apply all table definitions (safe to call repeatedly)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_judgments_table(pool).await?;
    create_interactions_table(pool).await?;
    Ok(())
}

/// Settings key/value table
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Judgment records keyed by identity handle
///
/// `topic_sentiments` and `last_ai_suggestion` are JSON text columns;
/// `last_updated` is Unix epoch milliseconds.
pub async fn create_judgments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS judgments (
            identity TEXT PRIMARY KEY,
            sentiment TEXT NOT NULL DEFAULT 'neutral',
            topic_sentiments TEXT NOT NULL DEFAULT '{}',
            notes TEXT NOT NULL DEFAULT '',
            interaction_count INTEGER NOT NULL DEFAULT 0 CHECK (interaction_count >= 0),
            last_updated INTEGER NOT NULL,
            suggested_by_ai INTEGER NOT NULL DEFAULT 0,
            last_ai_suggestion TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_judgments_sentiment ON judgments(sentiment)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_judgments_last_updated ON judgments(last_updated)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Append-only interaction log; `id` is the store-assigned monotonic key
pub async fn create_interactions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            identity TEXT NOT NULL,
            kind TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_interactions_identity ON interactions(identity)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_interactions_kind ON interactions(kind)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_interactions_timestamp ON interactions(timestamp)")
        .execute(pool)
        .await?;

    Ok(())
}
