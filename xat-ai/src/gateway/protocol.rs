//! Wire types: the inference service API and the boundary envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sampling temperature used for every analysis
pub const TEMPERATURE: f64 = 0.3;

/// Output length cap used for every analysis
pub const MAX_OUTPUT_TOKENS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Generation options (`num_predict` is the service's output cap)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceOptions {
    pub temperature: f64,
    #[serde(rename = "num_predict", alias = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

/// POST /api/chat body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub options: InferenceOptions,
}

impl ChatRequest {
    /// Optional system message followed by exactly one user message
    pub fn new(model: &str, system_prompt: Option<&str>, user_prompt: &str, options: InferenceOptions) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(user_prompt));
        Self {
            model: model.to_string(),
            messages,
            stream: false,
            options,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: String,
}

/// /api/chat reply (non-streaming); only `message.content` is relied on
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatResponse {
    pub message: ChatResponseMessage,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub done: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelTag {
    pub name: String,
}

/// GET /api/tags reply
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsPayload {
    pub service_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub service_url: String,
    #[serde(flatten)]
    pub request: ChatRequest,
}

/// Request crossing the process boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "camelCase")]
pub enum BoundaryRequest {
    InferenceTags(TagsPayload),
    InferenceChat(ChatPayload),
}

impl BoundaryRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            BoundaryRequest::InferenceTags(_) => "inferenceTags",
            BoundaryRequest::InferenceChat(_) => "inferenceChat",
        }
    }
}

/// The single reply to a `BoundaryRequest`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BoundaryResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
