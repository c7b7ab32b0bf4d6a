//! Stages that rewrite or annotate report tables.

use super::document::{
    replace_children_with_text, select_all, set_attribute, trimmed_text, unwrap_element,
    ReportDocument,
};
use super::{Capture, MutationStage};
use crate::constants::{
    AVOID_PAGE_SPLIT_STYLE, CLINICAL_SUMMARY_LABEL, IDENTIFIER_TABLE_SELECTOR,
    PAGE_BREAK_BEFORE_STYLE, PROBAND_ID_LABEL, REFERENCED_DATABASES_HEADING,
    UNSPLITTABLE_TABLE_HEADER,
};

/// Relabels the clinical-summary row of the identifier table and drops its hyperlink.
///
/// The link points at a login-gated page, which is useless in a printed report, so the link
/// text is kept and the element discarded. The table's last row is captured as the anchor
/// after which the generation date is reinserted.
pub struct RowRelabel;

impl MutationStage for RowRelabel {
    fn name(&self) -> &'static str {
        "row-relabel"
    }

    fn apply(&self, document: &ReportDocument) -> Option<Capture> {
        let mut last_row = None;
        for table in select_all(document.root(), IDENTIFIER_TABLE_SELECTOR) {
            let rows = select_all(table.as_node(), "tr");
            for row in &rows {
                let mut relabelled = false;
                for cell in select_all(row.as_node(), "td") {
                    let text = cell.as_node().text_contents();
                    if text.contains(CLINICAL_SUMMARY_LABEL) {
                        let replaced = text.replace(CLINICAL_SUMMARY_LABEL, PROBAND_ID_LABEL);
                        replace_children_with_text(cell.as_node(), &replaced);
                        relabelled = true;
                    }
                }
                if relabelled {
                    for link in select_all(row.as_node(), "a") {
                        unwrap_element(link.as_node());
                    }
                }
            }
            if let Some(row) = rows.last() {
                last_row = Some(row.as_node().to_string());
            }
        }
        last_row.map(Capture::LastRow)
    }
}

/// Keeps annex tables on one page.
///
/// Any table whose header has a "Name" column is marked to avoid page splits, and the
/// "Referenced Databases" heading starts a new page so it stays with its table.
pub struct PaginationHints;

impl MutationStage for PaginationHints {
    fn name(&self) -> &'static str {
        "pagination-hints"
    }

    fn apply(&self, document: &ReportDocument) -> Option<Capture> {
        for heading in select_all(document.root(), "h3") {
            if trimmed_text(&heading) == REFERENCED_DATABASES_HEADING {
                set_attribute(&heading, "style", PAGE_BREAK_BEFORE_STYLE);
            }
        }

        for table in select_all(document.root(), "table") {
            let has_name_column = select_all(table.as_node(), "thead th")
                .iter()
                .any(|th| trimmed_text(th) == UNSPLITTABLE_TABLE_HEADER);
            if has_name_column {
                set_attribute(&table, "style", AVOID_PAGE_SPLIT_STYLE);
            }
        }
        None
    }
}
