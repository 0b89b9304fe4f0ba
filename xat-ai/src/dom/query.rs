//! Element queries compiled to CSS selectors
//!
//! The builder covers the shapes the pipeline needs (tag name, attribute
//! presence, equality, prefix and class membership); `Query::css` accepts
//! any selector `scraper` can parse.

use super::{Document, NodeId};
use scraper::Selector;
use tracing::warn;

/// Compound element matcher (all conditions must hold)
#[derive(Debug, Clone)]
pub struct Query {
    css: String,
    selector: Option<Selector>,
}

impl Query {
    /// Match any element
    pub fn any() -> Self {
        Self::compile("*".to_string())
    }

    /// Match elements with the given tag name (case-insensitive)
    pub fn tag(tag: &str) -> Self {
        Self::compile(tag.to_ascii_lowercase())
    }

    /// Arbitrary CSS selector; an unparseable one matches nothing
    pub fn css(selector: &str) -> Self {
        Self::compile(selector.to_string())
    }

    /// `[data-testid="<value>"]`
    pub fn test_id(value: &str) -> Self {
        Self::any().attr_eq("data-testid", value)
    }

    pub fn has_attr(self, name: &str) -> Self {
        self.refine(format!("[{}]", name))
    }

    pub fn attr_eq(self, name: &str, value: &str) -> Self {
        self.refine(format!("[{}=\"{}\"]", name, quote(value)))
    }

    pub fn attr_prefix(self, name: &str, prefix: &str) -> Self {
        self.refine(format!("[{}^=\"{}\"]", name, quote(prefix)))
    }

    pub fn class(self, class: &str) -> Self {
        self.refine(format!("[class~=\"{}\"]", quote(class)))
    }

    /// The selector text this query evaluates
    pub fn as_css(&self) -> &str {
        &self.css
    }

    /// True when `node` is an element matching the selector
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match (&self.selector, doc.element(node)) {
            (Some(selector), Some(element)) => selector.matches(&element),
            _ => false,
        }
    }

    fn refine(self, condition: String) -> Self {
        Self::compile(self.css + &condition)
    }

    fn compile(css: String) -> Self {
        let selector = match Selector::parse(&css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Unusable selector {:?}: {}", css, e);
                None
            }
        };
        Self { css, selector }
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.css == other.css
    }
}

impl Eq for Query {}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
