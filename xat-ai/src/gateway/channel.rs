//! Boundary transports
//!
//! `LocalChannel` hands requests to an in-process broker task over an mpsc
//! queue with a oneshot reply per request. `HttpChannel` posts the envelope
//! to a running `xat-ai` mediator service.

use super::broker::InferenceBroker;
use super::protocol::{BoundaryRequest, BoundaryResponse};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Boundary channel closed")]
    Closed,

    #[error("Boundary peer dropped the request without responding")]
    NoResponse,

    #[error("Boundary transport error: {0}")]
    Transport(String),

    #[error("Boundary peer returned HTTP {0}")]
    Status(u16),

    #[error("Inference service error: {0}")]
    Remote(String),

    #[error("Unexpected response shape: {0}")]
    InvalidResponse(String),
}

/// One request in, exactly one response out
#[async_trait]
pub trait BoundaryChannel: Send + Sync {
    async fn send(&self, request: BoundaryRequest) -> Result<BoundaryResponse, ChannelError>;
}

type Envelope = (BoundaryRequest, oneshot::Sender<BoundaryResponse>);

/// In-process transport to a broker task
#[derive(Debug, Clone)]
pub struct LocalChannel {
    tx: mpsc::Sender<Envelope>,
}

impl LocalChannel {
    /// Start the broker task; each request is served on its own task so a
    /// slow inference never holds up the queue
    pub fn spawn(broker: Arc<InferenceBroker>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Envelope>(capacity.max(1));

        tokio::spawn(async move {
            while let Some((request, reply)) = rx.recv().await {
                let broker = Arc::clone(&broker);
                tokio::spawn(async move {
                    let response = broker.handle(request).await;
                    if reply.send(response).is_err() {
                        debug!("Boundary caller went away before the response arrived");
                    }
                });
            }
            debug!("Local boundary channel closed");
        });

        Self { tx }
    }
}

#[async_trait]
impl BoundaryChannel for LocalChannel {
    async fn send(&self, request: BoundaryRequest) -> Result<BoundaryResponse, ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| ChannelError::Closed)?;
        reply_rx.await.map_err(|_| ChannelError::NoResponse)
    }
}

/// Transport to the mediator service (`POST /message`)
#[derive(Debug, Clone)]
pub struct HttpChannel {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpChannel {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChannelError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl BoundaryChannel for HttpChannel {
    async fn send(&self, request: BoundaryRequest) -> Result<BoundaryResponse, ChannelError> {
        let url = format!("{}/message", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Status(status.as_u16()));
        }

        response
            .json::<BoundaryResponse>()
            .await
            .map_err(|e| ChannelError::InvalidResponse(e.to_string()))
    }
}
