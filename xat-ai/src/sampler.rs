//! Content sampler
//!
//! Collects the visible post texts attributed to one identity.

use crate::dom::{Document, Query};
use crate::identity::{extract_identity, IdentityHandle, CONTENT_ITEM_TAG, IDENTITY_REGION_TEST_ID, POST_TEXT_TEST_ID};

/// Posts sampled per analysis
pub const DEFAULT_LIMIT: usize = 5;

/// Shorter texts carry too little signal to analyze
pub const DEFAULT_MIN_LENGTH: usize = 10;

/// Sampling bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLimits {
    pub limit: usize,
    /// Texts with fewer characters are discarded
    pub min_length: usize,
}

impl Default for SampleLimits {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            min_length: DEFAULT_MIN_LENGTH,
        }
    }
}

/// Up to `limit` trimmed post texts by `identity`, in document order
///
/// Fewer results, including none, is the normal case on most pages.
pub fn sample(doc: &Document, identity: &IdentityHandle, limits: SampleLimits) -> Vec<String> {
    let region_query = Query::test_id(IDENTITY_REGION_TEST_ID);
    let text_query = Query::test_id(POST_TEXT_TEST_ID);
    let mut posts = Vec::new();

    if limits.limit == 0 {
        return posts;
    }

    for item in doc.find_all(doc.root(), &Query::tag(CONTENT_ITEM_TAG)) {
        let Some(region) = doc.find_first(item, &region_query) else {
            continue;
        };
        if extract_identity(doc, region).as_ref() != Some(identity) {
            continue;
        }
        let Some(text_node) = doc.find_first(item, &text_query) else {
            continue;
        };
        let text = doc.text_content(text_node).trim().to_string();
        if text.chars().count() < limits.min_length {
            continue;
        }
        posts.push(text);
        if posts.len() >= limits.limit {
            break;
        }
    }
    posts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(handle: &str, text: &str) -> String {
        format!(
            r#"<article><div data-testid="User-Name"><a href="/{handle}">{handle}</a></div>
               <div data-testid="tweetText">{text}</div></article>"#
        )
    }

    fn page(posts: &[String]) -> Document {
        Document::parse(&format!("<html><body>{}</body></html>", posts.join("")))
    }

    fn alice() -> IdentityHandle {
        IdentityHandle::parse("alice").unwrap()
    }

    #[test]
    fn test_only_matching_identity_in_document_order() {
        let doc = page(&[
            post("alice", "first post about trade policy"),
            post("bob", "bob talks about something else"),
            post("alice", "second post about tariffs"),
        ]);
        let posts = sample(&doc, &alice(), SampleLimits::default());
        assert_eq!(posts, vec!["first post about trade policy", "second post about tariffs"]);
    }

    #[test]
    fn test_short_texts_discarded_and_trimmed() {
        let doc = page(&[
            post("alice", "   lol   "),
            post("alice", "  exactly 10  "),
            post("alice", "   a long enough post   "),
        ]);
        let posts = sample(&doc, &alice(), SampleLimits::default());
        assert_eq!(posts, vec!["exactly 10", "a long enough post"]);
    }

    #[test]
    fn test_stops_at_limit() {
        let items: Vec<String> = (0..8).map(|i| post("alice", &format!("post number {i} here"))).collect();
        let doc = page(&items);
        let posts = sample(&doc, &alice(), SampleLimits::default());
        assert_eq!(posts.len(), 5);
        assert_eq!(posts[4], "post number 4 here");
    }

    #[test]
    fn test_no_posts_is_normal() {
        let doc = page(&[post("bob", "nothing from alice here")]);
        assert!(sample(&doc, &alice(), SampleLimits::default()).is_empty());
    }
}
