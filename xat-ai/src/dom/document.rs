//! Mutable document over a `scraper` tree

use super::Query;
use ego_tree::NodeRef;
use html5ever::tendril::StrTendril as ParserTendril;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{CaseSensitivity, ElementRef, Html, Node, StrTendril};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Document shared between the scanner, the sampler and the observer task
pub type SharedDocument = Arc<Mutex<Document>>;

/// Stable handle to a node; ids are never reused, even after removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(ego_tree::NodeId);

/// Who caused a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOrigin {
    /// The page itself (rendering, navigation, scrolling)
    Host,
    /// The annotation scanner writing markers, badges or buttons
    Annotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes { name: String },
}

/// One change notification delivered to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
    pub origin: MutationOrigin,
}

/// Mutable HTML document
///
/// Nodes live in the parsed `Html` tree. Removed or replaced nodes become
/// orphans of that tree, so their ids stay valid but unattached.
#[derive(Debug)]
pub struct Document {
    html: Html,
    observers: Vec<mpsc::UnboundedSender<MutationRecord>>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            html: Html::new_document(),
            observers: Vec::new(),
        }
    }
}

impl Document {
    /// Parse a full HTML document (missing html/head/body are synthesized)
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            observers: Vec::new(),
        }
    }

    /// Wrap the document for sharing across tasks
    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> NodeId {
        NodeId(self.html.tree.root().id())
    }

    /// Number of nodes ever allocated
    pub fn len(&self) -> usize {
        self.html.tree.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        !self.html.tree.root().has_children()
    }

    /// Register an observer; it receives every mutation from now on
    pub fn observe(&mut self) -> mpsc::UnboundedReceiver<MutationRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    fn notify(&mut self, record: MutationRecord) {
        self.observers.retain(|tx| tx.send(record.clone()).is_ok());
    }

    fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id.0)
    }

    pub(crate) fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.node(id).and_then(ElementRef::wrap)
    }

    /// Deep-copy `source` into this tree as a new orphan
    fn graft(&mut self, source: NodeRef<'_, Node>) -> ego_tree::NodeId {
        let top = self.html.tree.orphan(source.value().clone()).id();
        let mut pending = vec![(source, top)];
        while let Some((from, into)) = pending.pop() {
            for child in from.children() {
                let Some(mut parent) = self.html.tree.get_mut(into) else {
                    continue;
                };
                let copied = parent.append(child.value().clone()).id();
                pending.push((child, copied));
            }
        }
        top
    }

    /// Parse a fragment and graft its top-level elements and text as orphans.
    /// Comments are dropped.
    fn graft_fragment(&mut self, html: &str) -> Vec<NodeId> {
        let parsed = Html::parse_fragment(html);
        let container = *parsed.root_element();
        container
            .children()
            .filter(|child| child.value().is_element() || child.value().is_text())
            .map(|child| NodeId(self.graft(child)))
            .collect()
    }

    /// Lowercase tag name, None for text and the root
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.node(id)?.value().as_element().map(Element::name)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag(id).is_some()
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)?
            .value()
            .as_element()?
            .attr(&name.to_ascii_lowercase())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.node(id)
            .and_then(|node| node.value().as_element())
            .map(|el| el.has_class(class, CaseSensitivity::CaseSensitive))
            .unwrap_or(false)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|node| node.children().map(|c| NodeId(c.id())).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent().map(|p| NodeId(p.id()))
    }

    /// True when the node is still reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let root = self.html.tree.root().id();
        match self.node(id) {
            Some(node) => node.id() == root || node.ancestors().any(|a| a.id() == root),
            None => false,
        }
    }

    /// All descendants in document (pre-)order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|node| node.descendants().skip(1).map(|d| NodeId(d.id())).collect())
            .unwrap_or_default()
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.node(id) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|d| d.value().as_text())
            .map(|text| &**text)
            .collect()
    }

    /// First descendant of `scope` matching `query`, in document order
    pub fn find_first(&self, scope: NodeId, query: &Query) -> Option<NodeId> {
        self.node(scope)?
            .descendants()
            .skip(1)
            .map(|d| NodeId(d.id()))
            .find(|&node| query.matches(self, node))
    }

    /// Every descendant of `scope` matching `query`, in document order
    pub fn find_all(&self, scope: NodeId, query: &Query) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&node| query.matches(self, node))
            .collect()
    }

    /// Nearest inclusive ancestor matching `query`
    pub fn closest(&self, id: NodeId, query: &Query) -> Option<NodeId> {
        let node = self.node(id)?;
        std::iter::once(node)
            .chain(node.ancestors())
            .map(|n| NodeId(n.id()))
            .find(|&n| query.matches(self, n))
    }

    /// New detached element
    pub fn create_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let name = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from(tag.to_ascii_lowercase()),
        );
        let attrs = attrs.iter().map(|(k, v)| attribute(k, v)).collect();
        NodeId(self.html.tree.orphan(Node::Element(Element::new(name, attrs))).id())
    }

    /// New detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let text = Text {
            text: StrTendril::from_slice(text),
        };
        NodeId(self.html.tree.orphan(Node::Text(text)).id())
    }

    /// Move `child` (detaching it first if needed) to the end of `parent`
    ///
    /// Ignored when it would make `child` its own ancestor.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId, origin: MutationOrigin) {
        let (Some(parent_node), Some(_)) = (self.node(parent), self.node(child)) else {
            return;
        };
        if child == self.root() || child == parent || parent_node.ancestors().any(|a| a.id() == child.0) {
            return;
        }

        let old_parent = self.parent(child);
        if let Some(mut node) = self.html.tree.get_mut(parent.0) {
            node.append_id(child.0);
        }
        if let Some(old_parent) = old_parent.filter(|&p| p != parent) {
            self.notify(MutationRecord {
                target: old_parent,
                kind: MutationKind::ChildList,
                origin,
            });
        }
        self.notify(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList,
            origin,
        });
    }

    /// Set (or overwrite) an attribute on an element
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str, origin: MutationOrigin) {
        let name = name.to_ascii_lowercase();
        let Some(mut node) = self.html.tree.get_mut(id.0) else {
            return;
        };
        let Node::Element(element) = node.value() else {
            return;
        };

        // Rebuilt rather than patched so the element's id/class caches reset
        let mut replaced = false;
        let mut attrs: Vec<Attribute> = element
            .attrs
            .iter()
            .map(|(key, current)| {
                if *key.local == *name {
                    replaced = true;
                    attribute(&name, value)
                } else {
                    Attribute {
                        name: key.clone(),
                        value: ParserTendril::from_slice(current),
                    }
                }
            })
            .collect();
        if !replaced {
            attrs.push(attribute(&name, value));
        }
        *element = Element::new(element.name.clone(), attrs);

        self.notify(MutationRecord {
            target: id,
            kind: MutationKind::Attributes { name },
            origin,
        });
    }

    /// Drop an attribute; no notification when it was not set
    pub fn remove_attr(&mut self, id: NodeId, name: &str, origin: MutationOrigin) {
        let name = name.to_ascii_lowercase();
        let Some(mut node) = self.html.tree.get_mut(id.0) else {
            return;
        };
        let Node::Element(element) = node.value() else {
            return;
        };
        if element.attr(&name).is_none() {
            return;
        }

        let attrs: Vec<Attribute> = element
            .attrs
            .iter()
            .filter(|(key, _)| *key.local != *name)
            .map(|(key, current)| Attribute {
                name: key.clone(),
                value: ParserTendril::from_slice(current),
            })
            .collect();
        *element = Element::new(element.name.clone(), attrs);

        self.notify(MutationRecord {
            target: id,
            kind: MutationKind::Attributes { name },
            origin,
        });
    }

    /// Detach a node (and its subtree) from the tree
    pub fn remove(&mut self, id: NodeId, origin: MutationOrigin) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(mut node) = self.html.tree.get_mut(id.0) {
            node.detach();
        }
        self.notify(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList,
            origin,
        });
    }

    /// Parse `html` as a fragment and append it to `parent`
    pub fn append_html(&mut self, parent: NodeId, html: &str, origin: MutationOrigin) -> Vec<NodeId> {
        if self.node(parent).is_none() {
            return Vec::new();
        }
        let inserted = self.graft_fragment(html);
        if let Some(mut node) = self.html.tree.get_mut(parent.0) {
            for id in &inserted {
                node.append_id(id.0);
            }
        }
        self.notify(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList,
            origin,
        });
        inserted
    }

    /// Replace `old` with freshly parsed nodes at the same position.
    /// The old subtree is detached; its ids stay valid but unattached.
    pub fn replace_with_html(&mut self, old: NodeId, html: &str, origin: MutationOrigin) -> Vec<NodeId> {
        let Some(parent) = self.parent(old) else {
            return Vec::new();
        };
        let inserted = self.graft_fragment(html);
        if let Some(mut node) = self.html.tree.get_mut(old.0) {
            for id in &inserted {
                node.insert_id_before(id.0);
            }
            node.detach();
        }
        self.notify(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList,
            origin,
        });
        inserted
    }

    /// Serialize a subtree back to HTML; text nodes come back unescaped
    pub fn to_html(&self, id: NodeId) -> String {
        if id == self.root() {
            return self.html.html();
        }
        let Some(node) = self.node(id) else {
            return String::new();
        };
        match node.value() {
            Node::Element(_) => ElementRef::wrap(node).map(|el| el.html()).unwrap_or_default(),
            Node::Text(text) => String::from(&**text),
            _ => String::new(),
        }
    }
}

fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, Namespace::from(""), LocalName::from(name.to_ascii_lowercase())),
        value: ParserTendril::from_slice(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <article id="one"><div data-testid="User-Name"><a href="/alice">Alice</a></div></article>
        <article id="two"><div data-testid="User-Name"><a href="/bob">Bob</a></div></article>
    </body></html>"#;

    #[test]
    fn test_parse_preserves_document_order() {
        let doc = Document::parse(PAGE);
        let articles = doc.find_all(doc.root(), &Query::tag("article"));
        assert_eq!(articles.len(), 2);
        assert_eq!(doc.attr(articles[0], "id"), Some("one"));
        assert_eq!(doc.attr(articles[1], "id"), Some("two"));
        assert!(doc.is_attached(articles[0]));
    }

    #[test]
    fn test_text_content_concatenates_subtree() {
        let doc = Document::parse("<p>Hello <b>big</b> world</p>");
        let p = doc.find_first(doc.root(), &Query::tag("p")).unwrap();
        assert_eq!(doc.text_content(p), "Hello big world");
    }

    #[test]
    fn test_closest_is_inclusive() {
        let doc = Document::parse(PAGE);
        let anchor = doc.find_first(doc.root(), &Query::tag("a")).unwrap();
        let article = doc.closest(anchor, &Query::tag("article")).unwrap();
        assert_eq!(doc.attr(article, "id"), Some("one"));
        assert_eq!(doc.closest(article, &Query::tag("article")), Some(article));
    }

    #[test]
    fn test_observers_receive_origin() {
        let mut doc = Document::parse(PAGE);
        let mut rx = doc.observe();
        let article = doc.find_first(doc.root(), &Query::tag("article")).unwrap();

        doc.set_attr(article, "data-x", "1", MutationOrigin::Annotation);
        let record = rx.try_recv().unwrap();
        assert_eq!(record.target, article);
        assert_eq!(record.origin, MutationOrigin::Annotation);
        assert_eq!(
            record.kind,
            MutationKind::Attributes {
                name: "data-x".to_string()
            }
        );

        let body = doc.find_first(doc.root(), &Query::tag("body")).unwrap();
        doc.append_html(body, "<article>three</article>", MutationOrigin::Host);
        assert_eq!(rx.try_recv().unwrap().origin, MutationOrigin::Host);
    }

    #[test]
    fn test_set_attr_overwrites_and_updates_class_matching() {
        let mut doc = Document::parse(r#"<div class="a" id="x"></div>"#);
        let div = doc.find_first(doc.root(), &Query::tag("div")).unwrap();
        assert!(doc.has_class(div, "a"));

        doc.set_attr(div, "class", "b", MutationOrigin::Host);
        assert!(!doc.has_class(div, "a"));
        assert!(doc.has_class(div, "b"));
        assert_eq!(doc.find_first(doc.root(), &Query::any().class("b")), Some(div));
        assert_eq!(doc.to_html(div), r#"<div class="b" id="x"></div>"#);

        let mut rx = doc.observe();
        doc.remove_attr(div, "id", MutationOrigin::Annotation);
        doc.remove_attr(div, "id", MutationOrigin::Annotation);
        assert_eq!(doc.attr(div, "id"), None);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_replace_with_html_keeps_position_and_detaches_old() {
        let mut doc = Document::parse(PAGE);
        let articles = doc.find_all(doc.root(), &Query::tag("article"));
        let inserted = doc.replace_with_html(
            articles[0],
            r#"<article id="fresh"><span>new</span></article>"#,
            MutationOrigin::Host,
        );
        assert_eq!(inserted.len(), 1);
        assert!(!doc.is_attached(articles[0]));

        let now = doc.find_all(doc.root(), &Query::tag("article"));
        assert_eq!(doc.attr(now[0], "id"), Some("fresh"));
        assert_eq!(doc.attr(now[1], "id"), Some("two"));
        assert_eq!(doc.text_content(now[0]), "new");
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let mut doc = Document::parse(PAGE);
        let article = doc.find_first(doc.root(), &Query::tag("article")).unwrap();
        let anchor = doc.find_first(article, &Query::tag("a")).unwrap();
        doc.remove(article, MutationOrigin::Host);
        assert!(!doc.is_attached(anchor));
        assert_eq!(doc.find_all(doc.root(), &Query::tag("article")).len(), 1);
        assert!(!doc.to_html(doc.root()).contains("alice"));
    }

    #[test]
    fn test_append_child_rejects_cycles() {
        let mut doc = Document::parse(PAGE);
        let article = doc.find_first(doc.root(), &Query::tag("article")).unwrap();
        let region = doc.find_first(article, &Query::test_id("User-Name")).unwrap();
        let anchor = doc.find_first(region, &Query::tag("a")).unwrap();
        let mut rx = doc.observe();

        doc.append_child(anchor, article, MutationOrigin::Host);
        doc.append_child(region, region, MutationOrigin::Host);

        assert!(rx.try_recv().is_err());
        assert!(doc.is_attached(article));
        assert_eq!(doc.parent(region), Some(article));
        assert_eq!(doc.closest(anchor, &Query::tag("article")), Some(article));
    }

    #[test]
    fn test_create_and_serialize() {
        let mut doc = Document::parse("<div id=\"host\"></div>");
        let host = doc.find_first(doc.root(), &Query::tag("div")).unwrap();
        let span = doc.create_element("span", &[("class", "badge"), ("title", "a \"q\"")]);
        let text = doc.create_text("<ok>");
        doc.append_child(span, text, MutationOrigin::Annotation);
        doc.append_child(host, span, MutationOrigin::Annotation);
        assert_eq!(
            doc.to_html(host),
            r#"<div id="host"><span class="badge" title="a &quot;q&quot;">&lt;ok&gt;</span></div>"#
        );
    }
}
