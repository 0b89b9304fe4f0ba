//! HTTP API of the mediator service

pub mod health;
pub mod message;

pub use health::health_routes;
pub use message::message_routes;
