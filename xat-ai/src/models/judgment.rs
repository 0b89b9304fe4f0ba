//! Judgment records and interaction events

use super::{Sentiment, Suggestion};
use crate::identity::IdentityHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known interaction kinds
pub mod kinds {
    pub const LIKE: &str = "like";
    pub const RETWEET: &str = "retweet";
    pub const REPLY: &str = "reply";
    pub const BOOKMARK: &str = "bookmark";
    pub const TAGGED: &str = "tagged";

    /// Interaction kind for a host engagement control (`data-testid` value)
    pub fn for_control(test_id: &str) -> Option<&'static str> {
        match test_id {
            "like" => Some(LIKE),
            "retweet" => Some(RETWEET),
            "reply" => Some(REPLY),
            "bookmark" => Some(BOOKMARK),
            _ => None,
        }
    }
}

/// The user's persisted verdict on one identity
///
/// Written wholesale on every save (put semantics). Field names follow the
/// exported JSON format (`suggestedByAI`, `lastAISuggestion`); `lastUpdated`
/// is Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Judgment {
    #[serde(alias = "username")]
    pub identity: IdentityHandle,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub topic_sentiments: BTreeMap<String, Sentiment>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub interaction_count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
    #[serde(default, rename = "suggestedByAI")]
    pub suggested_by_ai: bool,
    #[serde(default, rename = "lastAISuggestion")]
    pub last_ai_suggestion: Option<Suggestion>,
}

impl Judgment {
    /// Fresh judgment stamped now
    pub fn new(identity: IdentityHandle, sentiment: Sentiment) -> Self {
        Self {
            identity,
            sentiment,
            topic_sentiments: BTreeMap::new(),
            notes: String::new(),
            interaction_count: 0,
            last_updated: Utc::now(),
            suggested_by_ai: false,
            last_ai_suggestion: None,
        }
    }
}

/// What the annotation menu submits on save
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRequest {
    pub sentiment: Sentiment,
    #[serde(default)]
    pub topic_sentiments: BTreeMap<String, Sentiment>,
    #[serde(default)]
    pub notes: String,
    /// Suggestion displayed in the menu when the user saved, if any
    #[serde(default)]
    pub suggestion: Option<Suggestion>,
    /// The user applied the suggestion rather than picking by hand
    #[serde(default)]
    pub accepted_suggestion: bool,
}

impl TagRequest {
    /// Build the full record to put, given what is currently stored
    pub fn into_judgment(self, identity: IdentityHandle, previous: Option<&Judgment>) -> Judgment {
        let suggested_by_ai = self.accepted_suggestion
            && self
                .suggestion
                .as_ref()
                .map(|s| s.sentiment == self.sentiment)
                .unwrap_or(false);

        Judgment {
            identity,
            sentiment: self.sentiment,
            topic_sentiments: self.topic_sentiments,
            notes: self.notes,
            interaction_count: previous.map(|p| p.interaction_count).unwrap_or(0).saturating_add(1),
            last_updated: Utc::now(),
            suggested_by_ai,
            last_ai_suggestion: self
                .suggestion
                .or_else(|| previous.and_then(|p| p.last_ai_suggestion.clone())),
        }
    }
}

/// One recorded engagement of the viewer with an identity's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    /// Store-assigned, monotonic
    pub id: i64,
    #[serde(alias = "username")]
    pub identity: IdentityHandle,
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}
