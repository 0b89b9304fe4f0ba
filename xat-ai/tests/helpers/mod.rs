//! Shared fixtures for the xat-ai integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use xat_ai::dom::{Document, SharedDocument};
use xat_ai::gateway::{BoundaryChannel, BoundaryRequest, BoundaryResponse, ChannelError};
use xat_ai::scanner::HeadlessMenu;
use xat_ai::store::SqliteStore;
use xat_ai::Pipeline;
use xat_common::events::EventBus;
use xat_common::AiConfig;

/// Inference stand-in that answers pattern and content prompts from a script
///
/// `None` replies simulate an unreachable service.
pub struct ScriptedInference {
    pub pattern_reply: Option<String>,
    pub content_reply: Option<String>,
    pub pattern_calls: AtomicUsize,
    pub content_calls: AtomicUsize,
}

impl ScriptedInference {
    pub fn new(pattern_reply: Option<&str>, content_reply: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            pattern_reply: pattern_reply.map(str::to_string),
            content_reply: content_reply.map(str::to_string),
            pattern_calls: AtomicUsize::new(0),
            content_calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> (usize, usize) {
        (
            self.pattern_calls.load(Ordering::SeqCst),
            self.content_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl BoundaryChannel for ScriptedInference {
    async fn send(&self, request: BoundaryRequest) -> Result<BoundaryResponse, ChannelError> {
        let BoundaryRequest::InferenceChat(payload) = request else {
            return Ok(BoundaryResponse::ok(json!({"models": [{"name": "scripted"}]})));
        };
        let user = payload
            .request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let reply = if user.contains("Recent posts by") {
            self.content_calls.fetch_add(1, Ordering::SeqCst);
            self.content_reply.clone()
        } else {
            self.pattern_calls.fetch_add(1, Ordering::SeqCst);
            self.pattern_reply.clone()
        };

        Ok(match reply {
            Some(content) => BoundaryResponse::ok(json!({
                "model": payload.request.model,
                "message": {"role": "assistant", "content": content},
                "done": true
            })),
            None => BoundaryResponse::err("error sending request: connection refused"),
        })
    }
}

pub fn config(content_analysis: bool, pattern_recognition: bool, auto_suggest: bool) -> AiConfig {
    let mut config = AiConfig {
        enabled: true,
        ..AiConfig::default()
    };
    config.features.content_analysis = content_analysis;
    config.features.pattern_recognition = pattern_recognition;
    config.features.auto_suggest = auto_suggest;
    config
}

/// One content item as the host renders it
pub fn post(handle: &str, text: &str) -> String {
    format!(
        r#"<article>
            <div data-testid="User-Name"><a href="/{handle}" role="link">{handle}</a><span>@{handle}</span></div>
            <div data-testid="tweetText">{text}</div>
            <div role="group">
                <button data-testid="reply">r</button>
                <button data-testid="retweet">rt</button>
                <button data-testid="like">l</button>
                <button data-testid="bookmark">b</button>
            </div>
        </article>"#
    )
}

pub fn page(posts: &[String]) -> String {
    format!(
        r#"<html><body><main><div aria-label="Timeline">{}</div></main></body></html>"#,
        posts.join("\n")
    )
}

pub struct Fixture {
    pub document: SharedDocument,
    pub store: Arc<SqliteStore>,
    pub menu: Arc<HeadlessMenu>,
    pub pipeline: Pipeline,
    pub event_bus: EventBus,
}

pub async fn fixture(html: &str, channel: Arc<dyn BoundaryChannel>, config: AiConfig) -> Fixture {
    let document = Document::parse(html).into_shared();
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let menu = Arc::new(HeadlessMenu::new());
    let event_bus = EventBus::new(256);
    let pipeline = Pipeline::new(
        document.clone(),
        store.clone(),
        channel,
        menu.clone(),
        config,
        event_bus.clone(),
    );
    Fixture {
        document,
        store,
        menu,
        pipeline,
        event_bus,
    }
}

/// Model reply for the pattern analyzer
pub fn pattern_json(sentiment: &str, confidence: f64) -> String {
    format!(
        r#"{{"suggestedSentiment": "{sentiment}", "confidence": {confidence}, "reasoning": "frequent engagement"}}"#
    )
}

/// Model reply for the content analyzer, wrapped in chatter
pub fn content_json(sentiment: &str, confidence: f64) -> String {
    format!(
        r#"Here is the analysis you asked for:
{{"overallSentiment": "{sentiment}", "topics": ["trade", "energy"], "confidence": {confidence},
  "reasoning": "argues for free trade", "expertise": ["economics"], "perspectives": "pro-market",
  "keyQuotes": ["tariffs are taxes"]}}
Let me know if you need more."#
    )
}
