//! Mediator side of the boundary: performs the HTTP exchange

use super::protocol::{BoundaryRequest, BoundaryResponse, ChatRequest};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("xat/", env!("CARGO_PKG_VERSION"));

/// Broker errors (reported back as `success: false`)
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Inference service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Inference service returned HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Inference service returned an unreadable body: {0}")]
    InvalidBody(String),

    #[error("Inference service {0} is not in the allowed list")]
    NotAllowed(String),
}

/// Performs inference requests on behalf of the pipeline
///
/// One attempt per request, response buffered in full. The only timeout is
/// the HTTP client's own. With an allow-list set, any other service URL is
/// refused before a connection is made.
#[derive(Debug, Clone)]
pub struct InferenceBroker {
    http_client: reqwest::Client,
    allowed_services: Vec<String>,
}

impl InferenceBroker {
    pub fn new(request_timeout: Duration) -> Result<Self, BrokerError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http_client,
            allowed_services: Vec::new(),
        })
    }

    /// Restrict requests to these service base URLs (empty allows any)
    pub fn with_allowed_services(mut self, services: &[String]) -> Self {
        self.allowed_services = services.iter().map(|s| normalize(s)).collect();
        self
    }

    /// Full endpoint URL, if `service_url` may be contacted
    fn endpoint(&self, service_url: &str, path: &str) -> Result<String, BrokerError> {
        let base = normalize(service_url);
        if !self.allowed_services.is_empty() && !self.allowed_services.contains(&base) {
            return Err(BrokerError::NotAllowed(service_url.trim().to_string()));
        }
        Ok(format!("{}{}", service_url.trim().trim_end_matches('/'), path))
    }

    /// Answer one boundary request; never fails, errors become the envelope
    pub async fn handle(&self, request: BoundaryRequest) -> BoundaryResponse {
        let kind = request.kind();
        let result = match request {
            BoundaryRequest::InferenceTags(payload) => self.tags(&payload.service_url).await,
            BoundaryRequest::InferenceChat(payload) => {
                self.chat(&payload.service_url, &payload.request).await
            }
        };

        match result {
            Ok(data) => BoundaryResponse::ok(data),
            Err(e) => {
                warn!("{} request failed: {}", kind, e);
                BoundaryResponse::err(e.to_string())
            }
        }
    }

    /// POST {service}/api/chat
    pub async fn chat(&self, service_url: &str, request: &ChatRequest) -> Result<Value, BrokerError> {
        let url = self.endpoint(service_url, "/api/chat")?;
        debug!(model = %request.model, messages = request.messages.len(), "Sending chat request to {}", url);

        let started = Instant::now();
        let response = self.http_client.post(&url).json(request).send().await?;
        let body = read_body(response).await?;

        info!(
            model = %request.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Chat request completed"
        );
        Ok(body)
    }

    /// GET {service}/api/tags
    pub async fn tags(&self, service_url: &str) -> Result<Value, BrokerError> {
        let url = self.endpoint(service_url, "/api/tags")?;
        debug!("Listing models at {}", url);
        let response = self.http_client.get(&url).send().await?;
        read_body(response).await
    }
}

fn normalize(service_url: &str) -> String {
    service_url.trim().trim_end_matches('/').to_ascii_lowercase()
}

async fn read_body(response: reqwest::Response) -> Result<Value, BrokerError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(BrokerError::Status(status.as_u16(), text));
    }
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| BrokerError::InvalidBody(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::protocol::{ChatPayload, InferenceOptions, TagsPayload};

    #[tokio::test]
    async fn test_unreachable_service_becomes_error_envelope() {
        let broker = InferenceBroker::new(Duration::from_secs(2)).unwrap();
        // Port 9 (discard) on localhost is closed in test environments
        let response = broker
            .handle(BoundaryRequest::InferenceTags(TagsPayload {
                service_url: "http://127.0.0.1:9".to_string(),
            }))
            .await;
        assert!(!response.success);
        assert!(response.error.is_some());
        assert!(response.data.is_none());

        let response = broker
            .handle(BoundaryRequest::InferenceChat(ChatPayload {
                service_url: "http://127.0.0.1:9/".to_string(),
                request: ChatRequest::new("m", None, "hi", InferenceOptions::default()),
            }))
            .await;
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_services_outside_allow_list_are_refused() {
        let broker = InferenceBroker::new(Duration::from_secs(2))
            .unwrap()
            .with_allowed_services(&["http://127.0.0.1:9/".to_string()]);

        let err = broker.tags("http://169.254.169.254").await.unwrap_err();
        assert!(matches!(err, BrokerError::NotAllowed(_)));

        let response = broker
            .handle(BoundaryRequest::InferenceChat(ChatPayload {
                service_url: "http://internal.example:8080".to_string(),
                request: ChatRequest::new("m", None, "hi", InferenceOptions::default()),
            }))
            .await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("not in the allowed list"));

        // Listed service is attempted (and fails at transport level)
        let err = broker.tags("HTTP://127.0.0.1:9").await.unwrap_err();
        assert!(matches!(err, BrokerError::Transport(_)));
    }
}
