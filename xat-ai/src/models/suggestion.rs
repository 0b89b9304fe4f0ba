//! Analyzer hypotheses and fused suggestions

use super::Sentiment;
use serde::{Deserialize, Serialize};

/// Clamp a confidence into `[0, 1]`; NaN becomes 0
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// One analyzer's sentiment guess, before fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hypothesis {
    pub sentiment: Sentiment,
    /// Always within `[0, 1]`
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub expertise: Option<String>,
    #[serde(default)]
    pub perspectives: Option<String>,
    #[serde(default)]
    pub key_quotes: Vec<String>,
}

impl Hypothesis {
    /// Hypothesis with only the core fields set; confidence is clamped
    pub fn new(sentiment: Sentiment, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            sentiment,
            confidence: clamp_confidence(confidence),
            reasoning: reasoning.into(),
            topics: Vec::new(),
            expertise: None,
            perspectives: None,
            key_quotes: Vec::new(),
        }
    }
}

/// Which analysis contributed to a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Content,
    Patterns,
}

impl SuggestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionSource::Content => "content",
            SuggestionSource::Patterns => "patterns",
        }
    }
}

/// Advisory sentiment proposal shown in the annotation menu
///
/// Produced fresh per request and never cached; persisted only as
/// `Judgment::last_ai_suggestion` when the user saves with it displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub sentiment: Sentiment,
    /// Always within `[0, 1]`
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub expertise: Option<String>,
    #[serde(default)]
    pub perspectives: Option<String>,
    #[serde(default)]
    pub key_quotes: Vec<String>,
    pub sources: Vec<SuggestionSource>,
}

impl Suggestion {
    /// Carry a hypothesis over unchanged, tagging its provenance
    pub fn from_hypothesis(hypothesis: Hypothesis, sources: Vec<SuggestionSource>) -> Self {
        Self {
            sentiment: hypothesis.sentiment,
            confidence: clamp_confidence(hypothesis.confidence),
            reasoning: hypothesis.reasoning,
            topics: hypothesis.topics,
            expertise: hypothesis.expertise,
            perspectives: hypothesis.perspectives,
            key_quotes: hypothesis.key_quotes,
            sources,
        }
    }

    /// Source names as plain strings (event payloads)
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.as_str().to_string()).collect()
    }
}
