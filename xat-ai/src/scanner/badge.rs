//! Badge and tag-button rendering

use crate::dom::{Document, MutationOrigin, NodeId, Query};
use crate::identity::IdentityHandle;
use crate::models::Judgment;

/// Marker attribute set on every identity region the scanner has claimed
pub const PROCESSED_ATTR: &str = "data-xat-processed";

pub const BADGE_CLASS: &str = "xat-badge";
pub const TAG_BUTTON_CLASS: &str = "xat-tag-button";

const TAG_BUTTON_ICON: &str = "🏷️";

pub fn is_processed(doc: &Document, region: NodeId) -> bool {
    doc.attr(region, PROCESSED_ATTR).is_some()
}

pub fn mark_processed(doc: &mut Document, region: NodeId) {
    doc.set_attr(region, PROCESSED_ATTR, "true", MutationOrigin::Annotation);
}

/// Release a claim so a later scan picks the region up again
pub fn unmark_processed(doc: &mut Document, region: NodeId) {
    doc.remove_attr(region, PROCESSED_ATTR, MutationOrigin::Annotation);
}

pub fn has_badge(doc: &Document, region: NodeId) -> bool {
    doc.find_first(region, &Query::tag("span").class(BADGE_CLASS)).is_some()
}

pub fn has_tag_button(doc: &Document, region: NodeId) -> bool {
    doc.find_first(region, &Query::tag("button").class(TAG_BUTTON_CLASS)).is_some()
}

/// Append a badge reflecting `judgment` to the region
pub fn insert_badge(doc: &mut Document, region: NodeId, judgment: &Judgment) -> NodeId {
    let sentiment = judgment.sentiment;
    let style = format!("background-color: {}", sentiment.color());
    let title = if judgment.suggested_by_ai {
        format!("{} (AI suggested)", sentiment.label())
    } else {
        sentiment.label().to_string()
    };

    let mut attrs = vec![
        ("class", BADGE_CLASS),
        ("data-sentiment", sentiment.as_str()),
        ("data-identity", judgment.identity.as_str()),
        ("style", style.as_str()),
        ("title", title.as_str()),
    ];
    if judgment.suggested_by_ai {
        attrs.push(("data-ai", "true"));
    }

    let badge = doc.create_element("span", &attrs);
    let icon = doc.create_text(sentiment.icon());
    doc.append_child(badge, icon, MutationOrigin::Annotation);
    doc.append_child(region, badge, MutationOrigin::Annotation);
    badge
}

/// Append the tag affordance to the region
pub fn insert_tag_button(doc: &mut Document, region: NodeId, identity: &IdentityHandle) -> NodeId {
    let button = doc.create_element(
        "button",
        &[
            ("class", TAG_BUTTON_CLASS),
            ("data-identity", identity.as_str()),
            ("title", "Tag this account"),
            ("type", "button"),
        ],
    );
    let icon = doc.create_text(TAG_BUTTON_ICON);
    doc.append_child(button, icon, MutationOrigin::Annotation);
    doc.append_child(region, button, MutationOrigin::Annotation);
    button
}

/// Remove every badge inside the region; returns how many were removed
pub fn remove_badges(doc: &mut Document, region: NodeId) -> usize {
    let badges = doc.find_all(region, &Query::tag("span").class(BADGE_CLASS));
    for &badge in &badges {
        doc.remove(badge, MutationOrigin::Annotation);
    }
    badges.len()
}
