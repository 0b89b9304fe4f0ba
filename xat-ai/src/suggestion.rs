//! Suggestion service: pattern ∥ content analysis, then fusion

use crate::analyzers::{ContentAnalyzer, PatternAnalyzer};
use crate::dom::SharedDocument;
use crate::fusion::fuse;
use crate::identity::IdentityHandle;
use crate::models::Suggestion;
use crate::sampler::{sample, SampleLimits};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use xat_common::events::{EventBus, XatEvent};
use xat_common::AiConfig;

pub struct SuggestionService {
    document: SharedDocument,
    pattern: Arc<PatternAnalyzer>,
    content: Arc<ContentAnalyzer>,
    limits: SampleLimits,
    event_bus: Option<EventBus>,
}

impl SuggestionService {
    pub fn new(document: SharedDocument, pattern: Arc<PatternAnalyzer>, content: Arc<ContentAnalyzer>) -> Self {
        Self {
            document,
            pattern,
            content,
            limits: SampleLimits::default(),
            event_bus: None,
        }
    }

    pub fn with_limits(mut self, limits: SampleLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub async fn reconfigure(&self, config: AiConfig) {
        self.pattern.reconfigure(config.clone()).await;
        self.content.reconfigure(config).await;
    }

    /// Fresh suggestion for `identity`; never cached
    ///
    /// Both analyses run concurrently and either may come back empty.
    pub async fn suggest(&self, identity: &IdentityHandle) -> Option<Suggestion> {
        let content = async {
            if !self.content.is_active().await {
                return None;
            }
            let posts = {
                let doc = self.document.lock().await;
                sample(&doc, identity, self.limits)
            };
            self.content.analyze(identity, &posts).await
        };

        let (pattern, content) = tokio::join!(self.pattern.analyze(identity), content);
        let suggestion = fuse(pattern, content);

        match &suggestion {
            Some(s) => debug!(
                "Suggestion for @{}: {} ({:.2}) from {:?}",
                identity, s.sentiment, s.confidence, s.sources
            ),
            None => debug!("No suggestion available for @{}", identity),
        }

        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(XatEvent::SuggestionReady {
                identity: identity.to_string(),
                sentiment: suggestion.as_ref().map(|s| s.sentiment.to_string()),
                confidence: suggestion.as_ref().map(|s| s.confidence),
                sources: suggestion.as_ref().map(|s| s.source_names()).unwrap_or_default(),
                timestamp: Utc::now(),
            });
        }

        suggestion
    }
}
