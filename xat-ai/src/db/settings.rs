//! Settings database operations
//!
//! Key/value accessors over the `settings` table. The pipeline settings blob
//! is stored as JSON under `ai_config`.

use sqlx::{Pool, Sqlite};
use tracing::warn;
use xat_common::{AiConfig, Error, Result};

/// Key holding the pipeline settings blob
pub const AI_CONFIG_KEY: &str = "ai_config";

/// Load the settings blob; None when it was never saved
///
/// A blob that no longer parses is reported and treated as absent so a bad
/// write cannot lock the user out of the pipeline.
pub async fn load_ai_config(db: &Pool<Sqlite>) -> Result<Option<AiConfig>> {
    let Some(raw) = get_setting::<String>(db, AI_CONFIG_KEY).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(config) => Ok(Some(config)),
        Err(e) => {
            warn!("Stored {} is not valid JSON, ignoring it: {}", AI_CONFIG_KEY, e);
            Ok(None)
        }
    }
}

/// Validate and persist the settings blob
pub async fn save_ai_config(db: &Pool<Sqlite>, config: &AiConfig) -> Result<()> {
    config.validate()?;
    let raw = serde_json::to_string(config)?;
    set_setting(db, AI_CONFIG_KEY, raw).await
}

/// Generic setting getter
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row.and_then(|(value,)| value) {
        Some(value) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xat_common::db::init_memory_database;

    #[tokio::test]
    async fn test_ai_config_absent_by_default() {
        let pool = init_memory_database().await.unwrap();
        assert!(load_ai_config(&pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ai_config_roundtrip_through_settings_table() {
        let pool = init_memory_database().await.unwrap();
        let mut config = AiConfig {
            enabled: true,
            model: "mistral".to_string(),
            ..AiConfig::default()
        };
        config.features.pattern_recognition = true;

        save_ai_config(&pool, &config).await.unwrap();
        assert_eq!(load_ai_config(&pool).await.unwrap(), Some(config.clone()));

        config.model = "qwen2.5".to_string();
        save_ai_config(&pool, &config).await.unwrap();
        assert_eq!(load_ai_config(&pool).await.unwrap().unwrap().model, "qwen2.5");
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_write() {
        let pool = init_memory_database().await.unwrap();
        let config = AiConfig {
            service_url: "not a url".to_string(),
            ..AiConfig::default()
        };
        assert!(save_ai_config(&pool, &config).await.is_err());
        assert!(load_ai_config(&pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_blob_treated_as_absent() {
        let pool = init_memory_database().await.unwrap();
        set_setting(&pool, AI_CONFIG_KEY, "{not json").await.unwrap();
        assert!(load_ai_config(&pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generic_setting_parse() {
        let pool = init_memory_database().await.unwrap();
        set_setting(&pool, "scan_debounce_ms", 250u64).await.unwrap();
        assert_eq!(get_setting::<u64>(&pool, "scan_debounce_ms").await.unwrap(), Some(250));
        assert!(get_setting::<u64>(&pool, "missing").await.unwrap().is_none());

        set_setting(&pool, "scan_debounce_ms", "soon").await.unwrap();
        assert!(get_setting::<u64>(&pool, "scan_debounce_ms").await.is_err());
    }
}
