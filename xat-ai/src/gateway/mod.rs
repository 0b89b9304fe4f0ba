//! Inference gateway
//!
//! The pipeline never talks HTTP itself. It sends a `BoundaryRequest` over a
//! `BoundaryChannel` and awaits exactly one `BoundaryResponse`; the mediator
//! side (`InferenceBroker`) performs the request against the Ollama-compatible
//! service and buffers the whole reply.

pub mod broker;
pub mod channel;
pub mod client;
pub mod protocol;

pub use broker::{BrokerError, InferenceBroker};
pub use channel::{BoundaryChannel, ChannelError, HttpChannel, LocalChannel};
pub use client::InferenceGateway;
pub use protocol::{
    BoundaryRequest, BoundaryResponse, ChatMessage, ChatPayload, ChatRequest, ChatResponse,
    InferenceOptions, Role, TagsPayload, TagsResponse,
};
