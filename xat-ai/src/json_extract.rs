//! Locate a JSON object embedded in free-form model output
//!
//! Models asked for "JSON only" still wrap it in prose or code fences. The
//! extractor scans for the first `{` whose balanced counterpart closes a
//! text that parses as a JSON object; brace counting ignores braces inside
//! string literals.

use serde::de::DeserializeOwned;

/// First balanced `{...}` slice of `text` that is a valid JSON object
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        if let Some(close) = balanced_end(bytes, open) {
            let candidate = &text[open..=close];
            if serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(candidate).is_ok() {
                return Some(candidate);
            }
        }
        start = open + 1;
    }
    None
}

/// Index of the `}` closing the `{` at `open`, honoring string literals
fn balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Deserialize the first embedded JSON object as `T`
pub fn parse_first_json_object<T: DeserializeOwned>(text: &str) -> Option<T> {
    let object = extract_first_json_object(text)?;
    match serde_json::from_str(object) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Embedded JSON did not match the expected shape: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_object_surrounded_by_prose() {
        let reply = r#"Sure! Here is my analysis: {"suggestedSentiment": "agree", "confidence": 0.8, "reasoning": "frequent likes"} Hope that helps."#;
        let object = extract_first_json_object(reply).unwrap();
        let value: Value = serde_json::from_str(object).unwrap();
        assert_eq!(value["suggestedSentiment"], "agree");
    }

    #[test]
    fn test_code_fence() {
        let reply = "```json\n{\"a\": {\"b\": 1}}\n```";
        assert_eq!(extract_first_json_object(reply), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let reply = r#"{"reasoning": "uses } and { freely \"quoted\"", "confidence": 0.5}"#;
        assert_eq!(extract_first_json_object(reply), Some(reply));
    }

    #[test]
    fn test_skips_invalid_leading_braces() {
        let reply = r#"Format is {sentiment}. Answer: {"sentiment": "mixed"}"#;
        assert_eq!(extract_first_json_object(reply), Some(r#"{"sentiment": "mixed"}"#));
    }

    #[test]
    fn test_first_of_two_objects_wins() {
        let reply = r#"{"n": 1} and later {"n": 2}"#;
        let value: Value = parse_first_json_object(reply).unwrap();
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn test_plain_text_yields_none() {
        assert!(extract_first_json_object("I think they mostly agree with you.").is_none());
        assert!(extract_first_json_object("unbalanced { \"a\": 1").is_none());
        assert!(parse_first_json_object::<Value>("").is_none());
    }

    #[test]
    fn test_multibyte_text_around_object() {
        let reply = "Résumé 👍 {\"label\": \"été\"} fin";
        assert_eq!(extract_first_json_object(reply), Some("{\"label\": \"été\"}"));
    }
}
