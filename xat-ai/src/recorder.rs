//! Interaction recorder
//!
//! Appends the viewer's engagements with an identity to the store so the
//! pattern analyzer has something to work with. Recording is best effort:
//! it is skipped unless pattern recognition is active, and store failures
//! are logged and swallowed.

use crate::identity::IdentityHandle;
use crate::models::InteractionEvent;
use crate::store::JudgmentStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};
use xat_common::events::{EventBus, XatEvent};
use xat_common::{AiConfig, Result};

pub struct InteractionRecorder {
    store: Arc<dyn JudgmentStore>,
    config: RwLock<AiConfig>,
    event_bus: Option<EventBus>,
}

impl InteractionRecorder {
    pub fn new(store: Arc<dyn JudgmentStore>, config: AiConfig) -> Self {
        Self {
            store,
            config: RwLock::new(config),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub async fn reconfigure(&self, config: AiConfig) {
        *self.config.write().await = config;
    }

    /// Append one event; returns it when something was written
    pub async fn record(&self, identity: &IdentityHandle, kind: &str) -> Option<InteractionEvent> {
        if !self.config.read().await.pattern_recognition_active() {
            return None;
        }

        match self.store.append_interaction(identity, kind, Utc::now()).await {
            Ok(event) => {
                debug!("Recorded {} interaction with @{}", kind, identity);
                if let Some(bus) = &self.event_bus {
                    bus.emit_lossy(XatEvent::InteractionRecorded {
                        identity: identity.to_string(),
                        kind: kind.to_string(),
                        timestamp: event.timestamp,
                    });
                }
                Some(event)
            }
            Err(e) => {
                error!("Failed to record {} interaction with @{}: {}", kind, identity, e);
                None
            }
        }
    }

    /// Every recorded event for one identity, oldest first
    pub async fn list_all(&self, identity: &IdentityHandle) -> Result<Vec<InteractionEvent>> {
        self.store.list_interactions(identity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn active() -> AiConfig {
        let mut config = AiConfig {
            enabled: true,
            ..AiConfig::default()
        };
        config.features.pattern_recognition = true;
        config
    }

    #[tokio::test]
    async fn test_record_is_noop_unless_pattern_recognition_active() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let alice = IdentityHandle::parse("alice").unwrap();

        let mut only_feature = AiConfig::default();
        only_feature.features.pattern_recognition = true;
        let recorder = InteractionRecorder::new(store.clone(), only_feature);
        assert!(recorder.record(&alice, "like").await.is_none());
        assert!(recorder.list_all(&alice).await.unwrap().is_empty());

        recorder.reconfigure(active()).await;
        assert!(recorder.record(&alice, "like").await.is_some());
        assert_eq!(recorder.list_all(&alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_emits_event() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let recorder = InteractionRecorder::new(store, active()).with_event_bus(bus);

        recorder
            .record(&IdentityHandle::parse("bob").unwrap(), "retweet")
            .await
            .unwrap();
        match rx.try_recv().unwrap() {
            XatEvent::InteractionRecorded { identity, kind, .. } => {
                assert_eq!(identity, "bob");
                assert_eq!(kind, "retweet");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.pool().close().await;
        let recorder = InteractionRecorder::new(Arc::new(store), active());
        assert!(recorder
            .record(&IdentityHandle::parse("carol").unwrap(), "like")
            .await
            .is_none());
    }
}
