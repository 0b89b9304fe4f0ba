//! Heuristic analyzers
//!
//! Each analyzer builds a prompt, asks the gateway once and reads the first
//! JSON object of the reply. Model output is read leniently: numbers may
//! arrive as strings, lists as single strings, labels in any case.

pub mod content;
pub mod pattern;

pub use content::ContentAnalyzer;
pub use pattern::PatternAnalyzer;

use crate::json_extract::parse_first_json_object;
use crate::models::{clamp_confidence, Sentiment};
use serde_json::{Map, Value};
use tracing::warn;

type Object = Map<String, Value>;

/// First JSON object of a model reply, with a warning when there is none
fn reply_object(reply: &str, analyzer: &str) -> Option<Object> {
    let object = parse_first_json_object::<Object>(reply);
    if object.is_none() {
        warn!("{} analysis reply contained no JSON object", analyzer);
    }
    object
}

fn sentiment_field(object: &Object, key: &str) -> Option<Sentiment> {
    object.get(key).and_then(Value::as_str).map(Sentiment::coerce)
}

/// Confidence as a fraction; "80%" and bare values in (1, 100] are percentages
fn confidence_field(object: &Object, key: &str) -> Option<f64> {
    let value = match object.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(percent) => return Some(clamp_confidence(percent.trim().parse::<f64>().ok()? / 100.0)),
                None => s.parse::<f64>().ok()?,
            }
        }
        _ => return None,
    };
    if value > 1.0 && value <= 100.0 {
        return Some(clamp_confidence(value / 100.0));
    }
    Some(clamp_confidence(value))
}

fn text_field(object: &Object, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// A string, or an array of strings joined with ", "
fn text_or_list_field(object: &Object, key: &str) -> Option<String> {
    let text = match object.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// An array of strings, or a single string as a one-element list
fn list_field(object: &Object, key: &str) -> Vec<String> {
    match object.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}
