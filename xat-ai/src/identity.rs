//! Identity extraction
//!
//! Maps an identity-name region of the host document to the account handle
//! it names. Pure and deterministic: the same markup always yields the same
//! handle, and unrecognized markup yields `None` without logging noise.

use crate::dom::{Document, NodeId, Query};
use serde::{Deserialize, Serialize};
use std::fmt;
use xat_common::{Error, Result};

/// `data-testid` of the identity-name region inside a content item
pub const IDENTITY_REGION_TEST_ID: &str = "User-Name";

/// Tag of one rendered content item
pub const CONTENT_ITEM_TAG: &str = "article";

/// `data-testid` of the post text inside a content item
pub const POST_TEXT_TEST_ID: &str = "tweetText";

/// First path segments that are host routes, never account handles
pub const RESERVED_SEGMENTS: &[&str] = &[
    "home",
    "explore",
    "notifications",
    "messages",
    "i",
    "settings",
    "search",
    "compose",
    "hashtag",
    "login",
    "logout",
    "signup",
    "tos",
    "privacy",
    "intent",
    "share",
    "account",
    "jobs",
    "lists",
    "bookmarks",
    "communities",
    "premium",
    "verified-choose",
];

const MAX_HANDLE_LEN: usize = 50;

/// Hosts whose absolute links are treated like inbound paths
const INBOUND_HOSTS: &[&str] = &["x.com", "www.x.com", "twitter.com", "www.twitter.com", "mobile.twitter.com"];

/// Account handle as it appears in links (without `@`, case preserved)
///
/// Deserialization goes through `parse`, so imported data is validated too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct IdentityHandle(String);

impl IdentityHandle {
    /// Validate a handle typed by a user or read from storage (`@` allowed)
    pub fn parse(raw: &str) -> Result<Self> {
        let handle = raw.trim().trim_start_matches('@');
        if is_valid_handle(handle) {
            Ok(Self(handle.to_string()))
        } else {
            Err(Error::InvalidInput(format!("'{}' is not a valid handle", raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdentityHandle {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<IdentityHandle> for String {
    fn from(handle: IdentityHandle) -> Self {
        handle.0
    }
}

impl fmt::Display for IdentityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdentityHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_valid_handle(handle: &str) -> bool {
    !handle.is_empty()
        && handle.len() <= MAX_HANDLE_LEN
        && handle.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn is_reserved(segment: &str) -> bool {
    RESERVED_SEGMENTS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(segment))
}

/// Handle named by a link target, if it names one
///
/// Accepts inbound paths (`/alice/status/1?s=20`) and absolute links to the
/// host (`https://x.com/alice`). Only the first path segment counts.
pub fn handle_from_href(href: &str) -> Option<IdentityHandle> {
    let href = href.trim();
    let path = if href.starts_with('/') {
        if href.starts_with("//") {
            strip_host(&href[2..])?
        } else {
            href
        }
    } else if let Some(rest) = href
        .strip_prefix("https://")
        .or_else(|| href.strip_prefix("http://"))
    {
        strip_host(rest)?
    } else {
        return None;
    };

    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segment = path.trim_start_matches('/').split('/').next().unwrap_or_default();
    let segment = segment.strip_prefix('@').unwrap_or(segment);

    if segment.is_empty() || is_reserved(segment) || !is_valid_handle(segment) {
        return None;
    }
    Some(IdentityHandle(segment.to_string()))
}

/// `host/path...` → `/path...` when host is the site itself
fn strip_host(rest: &str) -> Option<&str> {
    let split = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (host, path) = rest.split_at(split);
    let host = host.split(':').next().unwrap_or_default();
    INBOUND_HOSTS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(host))
        .then_some(path)
}

/// Handle for an identity-name region
///
/// Rules, in priority order; each rule looks only at its first anchor, and a
/// rule whose anchor yields nothing falls through to the next:
/// 1. the first inbound anchor (`a[href^="/"]`) inside the region
/// 2. the first `a[role="link"]` inside the region
/// 3. the first inbound anchor anywhere in the enclosing content item
pub fn extract_identity(doc: &Document, region: NodeId) -> Option<IdentityHandle> {
    let inbound = Query::tag("a").attr_prefix("href", "/");
    let role_link = Query::tag("a").attr_eq("role", "link");

    let from_anchor = |anchor: Option<NodeId>| {
        anchor
            .and_then(|a| doc.attr(a, "href"))
            .and_then(handle_from_href)
    };

    from_anchor(doc.find_first(region, &inbound))
        .or_else(|| from_anchor(doc.find_first(region, &role_link)))
        .or_else(|| {
            doc.closest(region, &Query::tag(CONTENT_ITEM_TAG))
                .and_then(|item| from_anchor(doc.find_first(item, &inbound)))
        })
}

/// Every identity-name region currently attached, in document order
pub fn identity_regions(doc: &Document) -> Vec<NodeId> {
    doc.find_all(doc.root(), &Query::test_id(IDENTITY_REGION_TEST_ID))
}
