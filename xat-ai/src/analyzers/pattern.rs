//! Pattern analyzer: interaction history → hypothesis

use super::{confidence_field, reply_object, sentiment_field, text_field};
use crate::gateway::InferenceGateway;
use crate::identity::IdentityHandle;
use crate::models::{Hypothesis, InteractionEvent};
use crate::recorder::InteractionRecorder;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use xat_common::time::short_date;
use xat_common::AiConfig;

/// Fewer events than this carry no usable signal
pub const MIN_INTERACTIONS: usize = 3;

const SYSTEM_PROMPT: &str = "You infer how a reader feels about a social media account from the \
way they engage with it. Reply with a single JSON object and nothing else, shaped exactly as \
{\"suggestedSentiment\": \"agree|disagree|mixed|expert|biased|neutral\", \
\"confidence\": <number between 0 and 1>, \"reasoning\": \"<one short sentence>\"}.";

/// Render events as `"<kind> on <date>"`, most recent first
///
/// Ordering is for readability only; recency carries no extra weight.
pub fn summarize(events: &[InteractionEvent]) -> String {
    let mut ordered: Vec<&InteractionEvent> = events.iter().collect();
    ordered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    ordered
        .iter()
        .map(|e| format!("{} on {}", e.kind, short_date(&e.timestamp)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn user_prompt(identity: &IdentityHandle, summary: &str) -> String {
    format!(
        "The reader has engaged with @{identity} as follows: {summary}. \
         Which sentiment does this engagement suggest? Answer with the JSON object only."
    )
}

pub struct PatternAnalyzer {
    recorder: Arc<InteractionRecorder>,
    gateway: Arc<InferenceGateway>,
    config: RwLock<AiConfig>,
}

impl PatternAnalyzer {
    pub fn new(recorder: Arc<InteractionRecorder>, gateway: Arc<InferenceGateway>, config: AiConfig) -> Self {
        Self {
            recorder,
            gateway,
            config: RwLock::new(config),
        }
    }

    pub async fn reconfigure(&self, config: AiConfig) {
        *self.config.write().await = config;
    }

    /// Hypothesis from the recorded interactions, None when there is not
    /// enough data or the model gave nothing usable
    pub async fn analyze(&self, identity: &IdentityHandle) -> Option<Hypothesis> {
        if !self.config.read().await.pattern_recognition_active() {
            return None;
        }

        let events = match self.recorder.list_all(identity).await {
            Ok(events) => events,
            Err(e) => {
                error!("Could not load interactions for @{}: {}", identity, e);
                return None;
            }
        };

        if events.len() < MIN_INTERACTIONS {
            debug!(
                "Not enough interactions with @{} ({} of {})",
                identity,
                events.len(),
                MIN_INTERACTIONS
            );
            return None;
        }

        debug!("Analyzing {} interactions with @{}", events.len(), identity);
        let prompt = user_prompt(identity, &summarize(&events));
        let reply = self.gateway.infer(Some(SYSTEM_PROMPT), &prompt).await?;

        let object = reply_object(&reply, "Pattern")?;
        let (Some(sentiment), Some(confidence)) = (
            sentiment_field(&object, "suggestedSentiment"),
            confidence_field(&object, "confidence"),
        ) else {
            warn!("Pattern analysis for @{} lacked sentiment or confidence", identity);
            return None;
        };

        let hypothesis = Hypothesis::new(sentiment, confidence, text_field(&object, "reasoning"));
        info!(
            "Interactions suggest {} for @{} ({:.0}% confident)",
            hypothesis.sentiment,
            identity,
            hypothesis.confidence * 100.0
        );
        Some(hypothesis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(id: i64, kind: &str, day: u32) -> InteractionEvent {
        InteractionEvent {
            id,
            identity: IdentityHandle::parse("alice").unwrap(),
            kind: kind.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_summary_most_recent_first() {
        let events = vec![event(1, "like", 1), event(2, "retweet", 5), event(3, "reply", 3)];
        assert_eq!(
            summarize(&events),
            "retweet on 2024-03-05, reply on 2024-03-03, like on 2024-03-01"
        );
    }

    #[test]
    fn test_summary_ties_broken_by_id() {
        let events = vec![event(1, "like", 2), event(2, "bookmark", 2)];
        assert_eq!(summarize(&events), "bookmark on 2024-03-02, like on 2024-03-02");
    }

    #[test]
    fn test_user_prompt_names_identity() {
        let prompt = user_prompt(&IdentityHandle::parse("alice").unwrap(), "like on 2024-03-01");
        assert!(prompt.contains("@alice"));
        assert!(prompt.contains("like on 2024-03-01"));
    }
}
