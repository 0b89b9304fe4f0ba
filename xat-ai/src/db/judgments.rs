//! Judgment database operations

use crate::identity::IdentityHandle;
use crate::models::{Judgment, Sentiment, Suggestion};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::BTreeMap;
use xat_common::time::from_epoch_millis;
use xat_common::Result;

/// Insert or wholesale-replace the judgment for its identity
pub async fn save_judgment(pool: &SqlitePool, judgment: &Judgment) -> Result<()> {
    let topic_sentiments = serde_json::to_string(&judgment.topic_sentiments)?;
    let last_ai_suggestion = judgment
        .last_ai_suggestion
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        r#"
        INSERT INTO judgments (
            identity, sentiment, topic_sentiments, notes, interaction_count,
            last_updated, suggested_by_ai, last_ai_suggestion
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(identity) DO UPDATE SET
            sentiment = excluded.sentiment,
            topic_sentiments = excluded.topic_sentiments,
            notes = excluded.notes,
            interaction_count = excluded.interaction_count,
            last_updated = excluded.last_updated,
            suggested_by_ai = excluded.suggested_by_ai,
            last_ai_suggestion = excluded.last_ai_suggestion
        "#,
    )
    .bind(judgment.identity.as_str())
    .bind(judgment.sentiment.as_str())
    .bind(topic_sentiments)
    .bind(&judgment.notes)
    .bind(i64::from(judgment.interaction_count))
    .bind(judgment.last_updated.timestamp_millis())
    .bind(judgment.suggested_by_ai)
    .bind(last_ai_suggestion)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the judgment for one identity
pub async fn load_judgment(pool: &SqlitePool, identity: &IdentityHandle) -> Result<Option<Judgment>> {
    let row = sqlx::query(
        r#"
        SELECT identity, sentiment, topic_sentiments, notes, interaction_count,
               last_updated, suggested_by_ai, last_ai_suggestion
        FROM judgments
        WHERE identity = ?
        "#,
    )
    .bind(identity.as_str())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(judgment_from_row).transpose()
}

/// Remove the judgment for one identity; returns whether a row existed
pub async fn delete_judgment(pool: &SqlitePool, identity: &IdentityHandle) -> Result<bool> {
    let result = sqlx::query("DELETE FROM judgments WHERE identity = ?")
        .bind(identity.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// All judgments, most recently updated first
pub async fn list_judgments(pool: &SqlitePool) -> Result<Vec<Judgment>> {
    let rows = sqlx::query(
        r#"
        SELECT identity, sentiment, topic_sentiments, notes, interaction_count,
               last_updated, suggested_by_ai, last_ai_suggestion
        FROM judgments
        ORDER BY last_updated DESC, identity ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(judgment_from_row).collect()
}

fn judgment_from_row(row: &SqliteRow) -> Result<Judgment> {
    let identity: String = row.try_get("identity")?;
    let sentiment: String = row.try_get("sentiment")?;
    let topic_sentiments: String = row.try_get("topic_sentiments")?;
    let interaction_count: i64 = row.try_get("interaction_count")?;
    let last_updated: i64 = row.try_get("last_updated")?;
    let last_ai_suggestion: Option<String> = row.try_get("last_ai_suggestion")?;

    let topic_sentiments: BTreeMap<String, Sentiment> = if topic_sentiments.trim().is_empty() {
        BTreeMap::new()
    } else {
        serde_json::from_str(&topic_sentiments)?
    };
    let last_ai_suggestion = last_ai_suggestion
        .filter(|s| !s.trim().is_empty())
        .map(|s| serde_json::from_str::<Suggestion>(&s))
        .transpose()?;

    Ok(Judgment {
        identity: IdentityHandle::parse(&identity)?,
        sentiment: Sentiment::coerce(&sentiment),
        topic_sentiments,
        notes: row.try_get("notes")?,
        interaction_count: u32::try_from(interaction_count).unwrap_or(0),
        last_updated: from_epoch_millis(last_updated),
        suggested_by_ai: row.try_get("suggested_by_ai")?,
        last_ai_suggestion,
    })
}
