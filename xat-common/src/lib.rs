//! # XAT Common Library
//!
//! Shared code for the XAT pipeline and its services including:
//! - Error type and result alias
//! - Configuration (TOML file and the persisted settings blob)
//! - Event types (XatEvent enum) and the EventBus
//! - SQLite schema initialization
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use config::{AiConfig, FeatureFlags};
pub use error::{Error, Result};
