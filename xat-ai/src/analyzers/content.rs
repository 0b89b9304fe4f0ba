//! Content analyzer: sampled posts → hypothesis with topics and stance

use super::{confidence_field, list_field, reply_object, sentiment_field, text_field, text_or_list_field};
use crate::gateway::InferenceGateway;
use crate::identity::IdentityHandle;
use crate::models::Hypothesis;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use xat_common::AiConfig;

/// Posts included in one prompt
pub const MAX_POSTS: usize = 5;

/// Separator between posts in the prompt
pub const POST_SEPARATOR: &str = "\n\n---\n\n";

const SYSTEM_PROMPT: &str = "You read a handful of social media posts and describe the concrete \
positions their author takes, so a reader can decide whether they agree with the account. Name \
specific viewpoints and back them with examples from the posts. Reply with a single JSON object \
and nothing else, shaped exactly as {\"overallSentiment\": \"agree|disagree|mixed|expert|neutral\", \
\"topics\": [\"topic\", ...], \"confidence\": <number between 0 and 1>, \
\"reasoning\": \"<specific positions with examples>\", \
\"expertise\": \"<subjects the author shows knowledge of>\", \
\"perspectives\": \"<ideological leaning with examples>\", \
\"keyQuotes\": [\"<representative quote>\", ...]}.";

fn user_prompt(identity: &IdentityHandle, posts: &[String]) -> String {
    let joined = posts
        .iter()
        .take(MAX_POSTS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(POST_SEPARATOR);
    format!(
        "Recent posts by @{identity}:\n\n{joined}\n\n\
         Which viewpoints does the author express, on which topics, and with what leaning? \
         Do they state facts, opinions or advocacy? Quote what captures their stance. \
         Be specific and answer with the JSON object only."
    )
}

pub struct ContentAnalyzer {
    gateway: Arc<InferenceGateway>,
    config: RwLock<AiConfig>,
}

impl ContentAnalyzer {
    pub fn new(gateway: Arc<InferenceGateway>, config: AiConfig) -> Self {
        Self {
            gateway,
            config: RwLock::new(config),
        }
    }

    pub async fn reconfigure(&self, config: AiConfig) {
        *self.config.write().await = config;
    }

    /// Whether a call to `analyze` could produce anything at all
    pub async fn is_active(&self) -> bool {
        self.config.read().await.content_analysis_active()
    }

    pub async fn analyze(&self, identity: &IdentityHandle, posts: &[String]) -> Option<Hypothesis> {
        if !self.is_active().await {
            return None;
        }
        if posts.is_empty() {
            debug!("No visible posts by @{} to analyze", identity);
            return None;
        }

        debug!("Analyzing {} posts by @{}", posts.len().min(MAX_POSTS), identity);
        let reply = self
            .gateway
            .infer(Some(SYSTEM_PROMPT), &user_prompt(identity, posts))
            .await?;

        let object = reply_object(&reply, "Content")?;
        let (Some(sentiment), Some(confidence)) = (
            sentiment_field(&object, "overallSentiment"),
            confidence_field(&object, "confidence"),
        ) else {
            warn!("Content analysis for @{} lacked sentiment or confidence", identity);
            return None;
        };

        let mut hypothesis = Hypothesis::new(sentiment, confidence, text_field(&object, "reasoning"));
        hypothesis.topics = list_field(&object, "topics");
        hypothesis.expertise = text_or_list_field(&object, "expertise");
        hypothesis.perspectives = text_or_list_field(&object, "perspectives");
        hypothesis.key_quotes = list_field(&object, "keyQuotes");

        info!(
            "Content analysis for @{} found topics: {}",
            identity,
            hypothesis.topics.join(", ")
        );
        Some(hypothesis)
    }
}
