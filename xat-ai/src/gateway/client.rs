//! Pipeline side of the boundary

use super::channel::{BoundaryChannel, ChannelError};
use super::protocol::{
    BoundaryRequest, ChatPayload, ChatRequest, ChatResponse, InferenceOptions, TagsPayload,
    TagsResponse,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use xat_common::AiConfig;

/// Issues inference requests through a boundary channel
///
/// `infer` returns `None` on every kind of failure; callers treat that as
/// "this analysis has no result" and move on. Nothing is retried.
pub struct InferenceGateway {
    channel: Arc<dyn BoundaryChannel>,
    config: RwLock<AiConfig>,
    options: InferenceOptions,
}

impl InferenceGateway {
    pub fn new(channel: Arc<dyn BoundaryChannel>, config: AiConfig) -> Self {
        Self {
            channel,
            config: RwLock::new(config),
            options: InferenceOptions::default(),
        }
    }

    /// Replace the settings used for subsequent requests
    pub async fn reconfigure(&self, config: AiConfig) {
        *self.config.write().await = config;
    }

    pub async fn config(&self) -> AiConfig {
        self.config.read().await.clone()
    }

    /// One chat completion with the configured model
    pub async fn infer(&self, system_prompt: Option<&str>, user_prompt: &str) -> Option<String> {
        let config = self.config().await;
        if !config.enabled {
            debug!("Inference skipped: pipeline disabled");
            return None;
        }

        let request = BoundaryRequest::InferenceChat(ChatPayload {
            service_url: config.base_url().to_string(),
            request: ChatRequest::new(&config.model, system_prompt, user_prompt, self.options.clone()),
        });

        let response = match self.channel.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Inference request did not complete: {}", e);
                return None;
            }
        };

        if !response.success {
            warn!(
                "Inference service reported failure: {}",
                response.error.as_deref().unwrap_or("unknown error")
            );
            return None;
        }

        let Some(data) = response.data else {
            warn!("Inference response carried no data");
            return None;
        };

        match serde_json::from_value::<ChatResponse>(data) {
            Ok(chat) => Some(chat.message.content),
            Err(e) => {
                warn!("Inference response lacks message.content: {}", e);
                None
            }
        }
    }

    /// Names of the models the service offers (connection test)
    ///
    /// Works regardless of the master switch so the user can check the
    /// endpoint before enabling the pipeline.
    pub async fn list_models(&self) -> Result<Vec<String>, ChannelError> {
        let config = self.config().await;
        let response = self
            .channel
            .send(BoundaryRequest::InferenceTags(TagsPayload {
                service_url: config.base_url().to_string(),
            }))
            .await?;

        if !response.success {
            return Err(ChannelError::Remote(
                response
                    .error
                    .unwrap_or_else(|| "inference service not responding".to_string()),
            ));
        }

        let data = response
            .data
            .ok_or_else(|| ChannelError::InvalidResponse("missing data".to_string()))?;
        let tags: TagsResponse = serde_json::from_value(data)
            .map_err(|e| ChannelError::InvalidResponse(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::protocol::BoundaryResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays a fixed response and remembers what it was sent
    struct ScriptedChannel {
        response: Result<BoundaryResponse, ()>,
        sent: Mutex<Vec<BoundaryRequest>>,
    }

    impl ScriptedChannel {
        fn new(response: Result<BoundaryResponse, ()>) -> Arc<Self> {
            Arc::new(Self {
                response,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl BoundaryChannel for ScriptedChannel {
        async fn send(&self, request: BoundaryRequest) -> Result<BoundaryResponse, ChannelError> {
            self.sent.lock().unwrap().push(request);
            self.response.clone().map_err(|_| ChannelError::Closed)
        }
    }

    fn enabled() -> AiConfig {
        AiConfig {
            enabled: true,
            service_url: "http://gpu:11434/".to_string(),
            ..AiConfig::default()
        }
    }

    fn chat_reply(content: &str) -> BoundaryResponse {
        BoundaryResponse::ok(json!({"message": {"role": "assistant", "content": content}}))
    }

    #[tokio::test]
    async fn test_disabled_pipeline_sends_nothing() {
        let channel = ScriptedChannel::new(Ok(chat_reply("hi")));
        let gateway = InferenceGateway::new(channel.clone(), AiConfig::default());
        assert!(gateway.infer(None, "hello").await.is_none());
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_chat_returns_content() {
        let channel = ScriptedChannel::new(Ok(chat_reply("{\"a\":1}")));
        let gateway = InferenceGateway::new(channel.clone(), enabled());
        let reply = gateway.infer(Some("system"), "user").await;
        assert_eq!(reply.as_deref(), Some("{\"a\":1}"));

        let sent = channel.sent.lock().unwrap();
        match &sent[0] {
            BoundaryRequest::InferenceChat(payload) => {
                assert_eq!(payload.service_url, "http://gpu:11434");
                assert_eq!(payload.request.messages.len(), 2);
                assert!(!payload.request.stream);
                assert_eq!(payload.request.options.max_output_tokens, 200);
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failures_become_none() {
        let cases = vec![
            Err(()),
            Ok(BoundaryResponse::err("connection refused")),
            Ok(BoundaryResponse {
                success: true,
                data: None,
                error: None,
            }),
            Ok(BoundaryResponse::ok(json!({"done": true}))),
        ];
        for case in cases {
            let gateway = InferenceGateway::new(ScriptedChannel::new(case), enabled());
            assert!(gateway.infer(None, "hello").await.is_none());
        }
    }

    #[tokio::test]
    async fn test_reconfigure_applies_to_next_request() {
        let channel = ScriptedChannel::new(Ok(chat_reply("ok")));
        let gateway = InferenceGateway::new(channel.clone(), AiConfig::default());
        assert!(gateway.infer(None, "x").await.is_none());

        gateway.reconfigure(enabled()).await;
        assert_eq!(gateway.infer(None, "x").await.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_list_models() {
        let channel = ScriptedChannel::new(Ok(BoundaryResponse::ok(
            json!({"models": [{"name": "llama3.2:3b"}, {"name": "mistral"}]}),
        )));
        let gateway = InferenceGateway::new(channel, AiConfig::default());
        assert_eq!(gateway.list_models().await.unwrap(), vec!["llama3.2:3b", "mistral"]);

        let gateway = InferenceGateway::new(
            ScriptedChannel::new(Ok(BoundaryResponse::err("down"))),
            AiConfig::default(),
        );
        assert!(matches!(gateway.list_models().await, Err(ChannelError::Remote(_))));
    }
}
