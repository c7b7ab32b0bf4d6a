//! Parsed report markup and the small set of tree helpers the stages share.

use kuchikikiki::traits::*;
use kuchikikiki::{ElementData, NodeDataRef, NodeRef};

/// A fetched clinical report parsed into a mutable tree.
///
/// Owned by a single pipeline run; stages mutate it in place. Not `Clone`: the tree is
/// reference-counted, so a clone would share nodes rather than copy them.
pub struct ReportDocument {
    root: NodeRef,
}

impl ReportDocument {
    /// Parse raw report bytes. Invalid UTF-8 is replaced rather than rejected; the upstream
    /// generator always emits UTF-8.
    pub fn parse(bytes: &[u8]) -> Self {
        let html = String::from_utf8_lossy(bytes);
        Self {
            root: kuchikikiki::parse_html().one(&*html),
        }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// Serialise the whole document back to markup.
    pub fn serialize(&self) -> String {
        self.root.to_string()
    }
}

impl std::fmt::Debug for ReportDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportDocument").finish_non_exhaustive()
    }
}

/// Collect every element under `node` matching `selector`.
///
/// Results are collected up front so callers can detach or rewrite matches while walking
/// them. The selectors used by the stages are constants, so a parse failure is a programming
/// error and is logged rather than propagated.
pub(crate) fn select_all(node: &NodeRef, selector: &str) -> Vec<NodeDataRef<ElementData>> {
    match node.select(selector) {
        Ok(matches) => matches.collect(),
        Err(()) => {
            tracing::error!("invalid CSS selector: {}", selector);
            Vec::new()
        }
    }
}

/// Text of an element with surrounding whitespace removed.
pub(crate) fn trimmed_text(element: &NodeDataRef<ElementData>) -> String {
    element.as_node().text_contents().trim().to_string()
}

/// Replace all children of `node` with a single text node.
pub(crate) fn replace_children_with_text(node: &NodeRef, text: &str) {
    let children: Vec<NodeRef> = node.children().collect();
    for child in children {
        child.detach();
    }
    node.append(NodeRef::new_text(text));
}

/// Remove an element but keep its children in its place.
pub(crate) fn unwrap_element(node: &NodeRef) {
    let children: Vec<NodeRef> = node.children().collect();
    for child in children {
        node.insert_before(child);
    }
    node.detach();
}

pub(crate) fn set_attribute(element: &NodeDataRef<ElementData>, name: &str, value: &str) {
    element
        .attributes
        .borrow_mut()
        .insert(name, value.to_string());
}

pub(crate) fn get_attribute(element: &NodeDataRef<ElementData>, name: &str) -> Option<String> {
    element.attributes.borrow().get(name).map(str::to_string)
}

pub(crate) fn remove_attribute(element: &NodeDataRef<ElementData>, name: &str) {
    element.attributes.borrow_mut().remove(name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize_keeps_content() {
        let doc = ReportDocument::parse(b"<html><body><p class=\"note\">Hello</p></body></html>");
        let out = doc.serialize();
        assert!(out.contains("<p class=\"note\">Hello</p>"));
    }

    #[test]
    fn test_unwrap_element_keeps_text() {
        let doc = ReportDocument::parse(b"<p>See <a href=\"https://x\">record <b>42</b></a>.</p>");
        for a in select_all(doc.root(), "a") {
            unwrap_element(a.as_node());
        }
        assert!(doc.serialize().contains("<p>See record <b>42</b>.</p>"));
    }

    #[test]
    fn test_replace_children_with_text() {
        let doc = ReportDocument::parse(b"<table><tr><td><i>old</i> cell</td></tr></table>");
        for td in select_all(doc.root(), "td") {
            replace_children_with_text(td.as_node(), "new");
        }
        assert!(doc.serialize().contains("<td>new</td>"));
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let doc = ReportDocument::parse(b"<p>x</p>");
        assert!(select_all(doc.root(), "p[").is_empty());
    }
}
