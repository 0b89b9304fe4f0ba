//! Interaction log operations

use crate::identity::IdentityHandle;
use crate::models::InteractionEvent;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use xat_common::time::from_epoch_millis;
use xat_common::Result;

/// Append one event; the returned event carries the assigned id
pub async fn append_interaction(
    pool: &SqlitePool,
    identity: &IdentityHandle,
    kind: &str,
    timestamp: DateTime<Utc>,
) -> Result<InteractionEvent> {
    let result = sqlx::query("INSERT INTO interactions (identity, kind, timestamp) VALUES (?, ?, ?)")
        .bind(identity.as_str())
        .bind(kind)
        .bind(timestamp.timestamp_millis())
        .execute(pool)
        .await?;

    Ok(InteractionEvent {
        id: result.last_insert_rowid(),
        identity: identity.clone(),
        kind: kind.to_string(),
        timestamp: from_epoch_millis(timestamp.timestamp_millis()),
    })
}

/// Every event for one identity, in insertion order
pub async fn list_interactions(pool: &SqlitePool, identity: &IdentityHandle) -> Result<Vec<InteractionEvent>> {
    let rows = sqlx::query(
        "SELECT id, identity, kind, timestamp FROM interactions WHERE identity = ? ORDER BY id ASC",
    )
    .bind(identity.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter().map(event_from_row).collect()
}

/// Total number of recorded events
pub async fn count_interactions(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM interactions")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn event_from_row(row: &SqliteRow) -> Result<InteractionEvent> {
    let identity: String = row.try_get("identity")?;
    let timestamp: i64 = row.try_get("timestamp")?;
    Ok(InteractionEvent {
        id: row.try_get("id")?,
        identity: IdentityHandle::parse(&identity)?,
        kind: row.try_get("kind")?,
        timestamp: from_epoch_millis(timestamp),
    })
}
