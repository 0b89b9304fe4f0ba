//! Fusion of the two analyzer hypotheses into one suggestion
//!
//! Content analysis decides the sentiment whenever it is available; the
//! interaction pattern only moves the confidence. Agreement boosts it (capped
//! at 0.95), disagreement averages the two.

use crate::models::{clamp_confidence, Hypothesis, Suggestion, SuggestionSource};

/// Ceiling for a confidence raised by agreement
pub const AGREEMENT_CAP: f64 = 0.95;

/// Multiplier applied to the content confidence on agreement
pub const AGREEMENT_BOOST: f64 = 1.2;

/// Combine optional hypotheses; None only when both are absent
pub fn fuse(pattern: Option<Hypothesis>, content: Option<Hypothesis>) -> Option<Suggestion> {
    match (pattern, content) {
        (Some(pattern), Some(content)) => Some(fuse_both(pattern, content)),
        (None, Some(content)) => Some(Suggestion::from_hypothesis(content, vec![SuggestionSource::Content])),
        (Some(pattern), None) => Some(Suggestion::from_hypothesis(pattern, vec![SuggestionSource::Patterns])),
        (None, None) => None,
    }
}

fn fuse_both(pattern: Hypothesis, content: Hypothesis) -> Suggestion {
    let agree = pattern.sentiment == content.sentiment;
    let pattern_confidence = clamp_confidence(pattern.confidence);
    let content_confidence = clamp_confidence(content.confidence);

    let confidence = if agree {
        // An agreeing second source never lowers confidence
        AGREEMENT_CAP.min((content_confidence * AGREEMENT_BOOST).max(pattern_confidence))
    } else {
        (content_confidence + pattern_confidence) / 2.0
    };

    let reasoning = format!(
        "Content shows: {}. Your interactions {} {} sentiment.",
        content.reasoning,
        if agree { "confirm" } else { "show" },
        pattern.sentiment
    );

    Suggestion {
        sentiment: content.sentiment,
        confidence: clamp_confidence(confidence),
        reasoning,
        topics: content.topics,
        expertise: content.expertise,
        perspectives: content.perspectives,
        key_quotes: content.key_quotes,
        sources: vec![SuggestionSource::Content, SuggestionSource::Patterns],
    }
}
