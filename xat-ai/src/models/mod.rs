//! Domain models shared by the pipeline components

pub mod judgment;
pub mod sentiment;
pub mod suggestion;

pub use judgment::{InteractionEvent, Judgment, TagRequest};
pub use sentiment::Sentiment;
pub use suggestion::{clamp_confidence, Hypothesis, Suggestion, SuggestionSource};
