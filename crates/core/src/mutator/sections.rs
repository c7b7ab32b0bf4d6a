//! Stages that inspect or reshape whole report sections.

use super::document::{remove_attribute, select_all, trimmed_text, ReportDocument};
use super::{Capture, MutationStage};
use crate::constants::{
    COVERAGE_HEADING_TEXT, COVERAGE_SECTION_SELECTOR, COVERAGE_TOGGLE_TEXT, ERROR_MESSAGE_SELECTOR,
    ERROR_PANEL_SELECTOR,
};
use kuchikikiki::traits::*;
use kuchikikiki::{ElementData, NodeDataRef, NodeRef};

/// Attributes of the coverage toggle that only make sense on a clickable control.
const TOGGLE_ONLY_ATTRIBUTES: &[&str] = &["onclick", "style", "href"];

/// Collects the messages of the generator's embedded error panel. Reads only.
///
/// Each `p` or `li` in a panel is one message. A panel without such items is split on
/// line breaks instead.
pub struct ErrorCheck;

impl MutationStage for ErrorCheck {
    fn name(&self) -> &'static str {
        "error-check"
    }

    fn apply(&self, document: &ReportDocument) -> Option<Capture> {
        let messages: Vec<String> = select_all(document.root(), ERROR_PANEL_SELECTOR)
            .iter()
            .flat_map(panel_messages)
            .collect();

        if messages.is_empty() {
            None
        } else {
            Some(Capture::UpstreamErrors(messages))
        }
    }
}

fn panel_messages(panel: &NodeDataRef<ElementData>) -> Vec<String> {
    let items = select_all(panel.as_node(), ERROR_MESSAGE_SELECTOR);
    if items.is_empty() {
        return panel
            .as_node()
            .text_contents()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
    }

    items
        .iter()
        // An item wrapping further items is reported through its children.
        .filter(|item| select_all(item.as_node(), ERROR_MESSAGE_SELECTOR).len() == 1)
        .map(trimmed_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Opens the collapsed coverage section and turns its toggle into a heading.
pub struct CoverageExpansion;

impl MutationStage for CoverageExpansion {
    fn name(&self) -> &'static str {
        "coverage-expansion"
    }

    fn apply(&self, document: &ReportDocument) -> Option<Capture> {
        for section in select_all(document.root(), COVERAGE_SECTION_SELECTOR) {
            remove_attribute(&section, "hidden");
        }

        for link in select_all(document.root(), "a") {
            if !link.as_node().text_contents().contains(COVERAGE_TOGGLE_TEXT) {
                continue;
            }
            let Some(heading) = coverage_heading() else {
                continue;
            };
            if let Some(element) = heading.as_element() {
                let mut heading_attrs = element.attributes.borrow_mut();
                for (name, attr) in link.attributes.borrow().map.iter() {
                    if !TOGGLE_ONLY_ATTRIBUTES.contains(&&*name.local) {
                        heading_attrs.insert(name.local.clone(), attr.value.clone());
                    }
                }
            }
            link.as_node().insert_before(heading);
            link.as_node().detach();
        }
        None
    }
}

/// A detached `<h3>` carrying the coverage heading text.
fn coverage_heading() -> Option<NodeRef> {
    let fragment = kuchikikiki::parse_html().one(format!("<h3>{COVERAGE_HEADING_TEXT}</h3>"));
    let heading = fragment.select_first("h3").ok()?.as_node().clone();
    heading.detach();
    Some(heading)
}
