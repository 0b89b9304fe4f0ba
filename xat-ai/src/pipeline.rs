//! Pipeline assembly
//!
//! Wires store, gateway, recorder, analyzers, suggestion service and scanner
//! around one shared document and one settings blob.

use crate::analyzers::{ContentAnalyzer, PatternAnalyzer};
use crate::db::settings::load_ai_config;
use crate::dom::SharedDocument;
use crate::gateway::{BoundaryChannel, ChannelError, InferenceGateway};
use crate::recorder::InteractionRecorder;
use crate::scanner::{AnnotationMenu, AnnotationScanner};
use crate::store::JudgmentStore;
use crate::suggestion::SuggestionService;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use xat_common::events::{EventBus, XatEvent};
use xat_common::{AiConfig, Result};

/// Settings in effect: the stored blob when present, otherwise the TOML section
pub async fn resolve_ai_config(pool: &SqlitePool, toml_ai: &AiConfig) -> Result<AiConfig> {
    match load_ai_config(pool).await? {
        Some(stored) => Ok(stored),
        None => Ok(toml_ai.clone()),
    }
}

pub struct Pipeline {
    pub store: Arc<dyn JudgmentStore>,
    pub gateway: Arc<InferenceGateway>,
    pub recorder: Arc<InteractionRecorder>,
    pub suggestions: Arc<SuggestionService>,
    pub scanner: Arc<AnnotationScanner>,
    pub event_bus: EventBus,
}

impl Pipeline {
    pub fn new(
        document: SharedDocument,
        store: Arc<dyn JudgmentStore>,
        channel: Arc<dyn BoundaryChannel>,
        menu: Arc<dyn AnnotationMenu>,
        config: AiConfig,
        event_bus: EventBus,
    ) -> Self {
        let gateway = Arc::new(InferenceGateway::new(channel, config.clone()));
        let recorder = Arc::new(
            InteractionRecorder::new(Arc::clone(&store), config.clone()).with_event_bus(event_bus.clone()),
        );
        let pattern = Arc::new(PatternAnalyzer::new(
            Arc::clone(&recorder),
            Arc::clone(&gateway),
            config.clone(),
        ));
        let content = Arc::new(ContentAnalyzer::new(Arc::clone(&gateway), config.clone()));
        let suggestions = Arc::new(
            SuggestionService::new(document.clone(), pattern, content).with_event_bus(event_bus.clone()),
        );
        let scanner = Arc::new(AnnotationScanner::new(
            document,
            Arc::clone(&store),
            Arc::clone(&recorder),
            Arc::clone(&suggestions),
            menu,
            config,
            event_bus.clone(),
        ));

        Self {
            store,
            gateway,
            recorder,
            suggestions,
            scanner,
            event_bus,
        }
    }

    /// Push new settings to every component
    pub async fn reconfigure(&self, config: AiConfig) {
        info!(
            "Applying settings: enabled={}, model={}",
            config.enabled, config.model
        );
        self.gateway.reconfigure(config.clone()).await;
        self.scanner.reconfigure(config.clone()).await;
        self.event_bus.emit_lossy(XatEvent::ConfigChanged {
            enabled: config.enabled,
            model: config.model,
            timestamp: Utc::now(),
        });
    }

    /// Models offered by the configured inference service
    pub async fn test_connection(&self) -> std::result::Result<Vec<String>, ChannelError> {
        self.gateway.list_models().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::settings::save_ai_config;
    use xat_common::db::init_memory_database;

    #[tokio::test]
    async fn test_stored_config_wins_over_toml() {
        let pool = init_memory_database().await.unwrap();
        let toml_ai = AiConfig {
            model: "from-toml".to_string(),
            ..AiConfig::default()
        };
        assert_eq!(resolve_ai_config(&pool, &toml_ai).await.unwrap().model, "from-toml");

        let stored = AiConfig {
            model: "from-db".to_string(),
            ..AiConfig::default()
        };
        save_ai_config(&pool, &stored).await.unwrap();
        assert_eq!(resolve_ai_config(&pool, &toml_ai).await.unwrap().model, "from-db");
    }
}
