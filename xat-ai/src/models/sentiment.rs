//! Sentiment enumeration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use xat_common::Error;

/// The user's (or a model's) verdict on an account
///
/// Serialized lowercase; `Neutral` is the default and the fallback for any
/// label outside the enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Agree,
    Disagree,
    Mixed,
    Expert,
    Biased,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Every member, in menu order
    pub const ALL: [Sentiment; 6] = [
        Sentiment::Agree,
        Sentiment::Disagree,
        Sentiment::Mixed,
        Sentiment::Expert,
        Sentiment::Biased,
        Sentiment::Neutral,
    ];

    /// Wire/storage label
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Agree => "agree",
            Sentiment::Disagree => "disagree",
            Sentiment::Mixed => "mixed",
            Sentiment::Expert => "expert",
            Sentiment::Biased => "biased",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Strict parse of a label (case-insensitive, surrounding whitespace ignored)
    pub fn parse_label(label: &str) -> Option<Sentiment> {
        let label = label.trim();
        Sentiment::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(label))
    }

    /// Lenient parse for model output: unknown labels become `Neutral`
    pub fn coerce(label: &str) -> Sentiment {
        match Sentiment::parse_label(label) {
            Some(sentiment) => sentiment,
            None => {
                tracing::debug!("Coercing out-of-enumeration sentiment '{}' to neutral", label);
                Sentiment::Neutral
            }
        }
    }

    /// Badge glyph
    pub fn icon(&self) -> &'static str {
        match self {
            Sentiment::Agree => "👍",
            Sentiment::Disagree => "👎",
            Sentiment::Mixed => "🤔",
            Sentiment::Expert => "🎓",
            Sentiment::Biased => "⚠️",
            Sentiment::Neutral => "😐",
        }
    }

    /// Badge background colour
    pub fn color(&self) -> &'static str {
        match self {
            Sentiment::Agree => "#10b981",
            Sentiment::Disagree => "#ef4444",
            Sentiment::Mixed => "#f59e0b",
            Sentiment::Expert => "#3b82f6",
            Sentiment::Biased => "#8b5cf6",
            Sentiment::Neutral => "#6b7280",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Agree => "Agree",
            Sentiment::Disagree => "Disagree",
            Sentiment::Mixed => "Mixed",
            Sentiment::Expert => "Expert",
            Sentiment::Biased => "Biased",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sentiment::parse_label(s).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unknown sentiment '{}' (expected one of: agree, disagree, mixed, expert, biased, neutral)",
                s
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for sentiment in Sentiment::ALL {
            assert_eq!(sentiment.as_str().parse::<Sentiment>().unwrap(), sentiment);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Sentiment::parse_label(" Agree "), Some(Sentiment::Agree));
        assert_eq!(Sentiment::parse_label("EXPERT"), Some(Sentiment::Expert));
    }

    #[test]
    fn test_unknown_label_coerces_to_neutral() {
        assert_eq!(Sentiment::coerce("agree|disagree"), Sentiment::Neutral);
        assert_eq!(Sentiment::coerce("supportive"), Sentiment::Neutral);
        assert_eq!(Sentiment::coerce("mixed"), Sentiment::Mixed);
        assert!("supportive".parse::<Sentiment>().is_err());
    }

    #[test]
    fn test_default_is_neutral() {
        assert_eq!(Sentiment::default(), Sentiment::Neutral);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Sentiment::Biased).unwrap(), "\"biased\"");
        let parsed: Sentiment = serde_json::from_str("\"disagree\"").unwrap();
        assert_eq!(parsed, Sentiment::Disagree);
    }
}
