//! Text-anchor splicing over the serialised report.
//!
//! Some insertions cannot be expressed as tree edits: the patient-info and clinician blocks
//! are externally authored markup fragments dropped in verbatim, and the banner colour lives
//! inside an inline stylesheet. This pass works on the serialised document line by line.
//!
//! Each insertion point is a [`Slot`] with a literal marker. The plan is built once from the
//! anchors captured by the mutator. Splice slots resolve against the first line that
//! contains their marker, and later lines repeating it are left alone. The banner colour is
//! replaced on every line it appears on, since the stylesheet may declare it more than once.
//! A line is patched by at most one slot; slots are checked in declaration order.

use crate::config::FragmentPaths;
use crate::constants::{
    BANNER_CSS_MARKER, BANNER_CSS_REPLACEMENT, COPIES_PLACEHOLDER, PARTICIPANT_INFO_MARKER,
};
use crate::metadata::PatientInfoMap;
use crate::mutator::AnchorMarkers;
use crate::{ReportError, ReportResult};
use std::path::Path;

/// A named insertion point in the serialised report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// "Participant Information" heading, replaced by the patient-info fragment.
    PatientInfo,
    /// Banner colour declaration, made transparent.
    BannerColour,
    /// Last row of the identifier table, preceded by a "Date Report Generated" row.
    GeneratedDate,
    /// Replacement logo, followed by the clinician fragment.
    Clinician,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Splice {
    /// Replace the whole line.
    ReplaceLine(String),
    /// Replace the first marker inside the line.
    ReplaceMarker(String),
    /// Replace every marker on every matching line. The slot stays open after it applies.
    ReplaceEveryMarker(String),
    /// Keep the line and add these lines after it.
    AppendLines(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SlotRule {
    slot: Slot,
    marker: String,
    splice: Splice,
}

impl SlotRule {
    fn repeats(&self) -> bool {
        matches!(self.splice, Splice::ReplaceEveryMarker(_))
    }
}

/// The two externally authored fragments, read verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateFragments {
    pub patient_info: String,
    pub clinician: String,
}

impl TemplateFragments {
    /// Read both fragments from disk.
    pub fn load(paths: &FragmentPaths) -> ReportResult<Self> {
        let fragments = Self {
            patient_info: read_fragment(&paths.patient_info)?,
            clinician: read_fragment(&paths.clinician)?,
        };
        if !fragments.patient_info.contains(PARTICIPANT_INFO_MARKER) {
            // The heading line is replaced, not appended to, so the fragment must restore it.
            tracing::warn!(
                "patient-info fragment {} does not contain the '{}' heading",
                paths.patient_info.display(),
                PARTICIPANT_INFO_MARKER
            );
        }
        Ok(fragments)
    }
}

fn read_fragment(path: &Path) -> ReportResult<String> {
    std::fs::read_to_string(path).map_err(|source| ReportError::FragmentRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Ordered slot rules for one report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotPlan {
    rules: Vec<SlotRule>,
}

/// Result of patching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchedDocument {
    pub html: String,
    /// Slots that found their line, in the order they were applied.
    pub applied: Vec<Slot>,
    /// Slots whose marker never appeared on a single line.
    pub unresolved: Vec<Slot>,
}

impl SlotPlan {
    /// Build the plan from the mutator's anchors.
    ///
    /// Slots without a usable marker are left out: an absent capture, or one spanning
    /// several lines, can never be matched line by line.
    pub fn build(
        anchors: &AnchorMarkers,
        fragments: &TemplateFragments,
        info: &PatientInfoMap,
        delabel: bool,
    ) -> Self {
        let mut rules = vec![SlotRule {
            slot: Slot::PatientInfo,
            marker: PARTICIPANT_INFO_MARKER.to_string(),
            splice: Splice::ReplaceLine(fragments.patient_info.clone()),
        }];

        if delabel {
            rules.push(SlotRule {
                slot: Slot::BannerColour,
                marker: BANNER_CSS_MARKER.to_string(),
                splice: Splice::ReplaceEveryMarker(BANNER_CSS_REPLACEMENT.to_string()),
            });

            match (&anchors.last_row, &anchors.generated_date) {
                (Some(row), Some(date)) => rules.push(SlotRule {
                    slot: Slot::GeneratedDate,
                    marker: row.clone(),
                    splice: Splice::ReplaceMarker(format!("{}{}", generated_date_row(date), row)),
                }),
                (Some(_), None) => {
                    tracing::warn!("no generation date captured; date row will not be added")
                }
                _ => {}
            }
        }

        if let Some(logo) = &anchors.logo_tag {
            rules.push(SlotRule {
                slot: Slot::Clinician,
                marker: logo.clone(),
                splice: Splice::AppendLines(clinician_lines(&fragments.clinician, info)),
            });
        }

        rules.retain(|rule| {
            let usable = !rule.marker.is_empty() && !rule.marker.contains('\n');
            if !usable {
                tracing::warn!("anchor for {:?} is not confined to one line; skipping", rule.slot);
            }
            usable
        });

        Self { rules }
    }

    pub fn slots(&self) -> Vec<Slot> {
        self.rules.iter().map(|r| r.slot).collect()
    }

    /// Apply the plan to serialised markup.
    pub fn apply(&self, html: &str) -> PatchedDocument {
        let mut pending: Vec<&SlotRule> = self.rules.iter().collect();
        let mut applied = Vec::new();
        let mut output = String::with_capacity(html.len());

        for line in html.split_inclusive('\n') {
            let Some(index) = pending.iter().position(|rule| line.contains(&rule.marker)) else {
                output.push_str(line);
                continue;
            };
            let rule = if pending[index].repeats() {
                pending[index]
            } else {
                pending.remove(index)
            };
            splice_line(&mut output, line, rule);
            if !applied.contains(&rule.slot) {
                applied.push(rule.slot);
            }

            if let Some(other) = pending
                .iter()
                .find(|r| r.slot != rule.slot && line.contains(&r.marker))
            {
                tracing::warn!(
                    "line matched both {:?} and {:?}; only {:?} was applied",
                    rule.slot,
                    other.slot,
                    rule.slot
                );
            }
        }

        let unresolved: Vec<Slot> = pending
            .iter()
            .map(|r| r.slot)
            .filter(|slot| !applied.contains(slot))
            .collect();
        for slot in &unresolved {
            tracing::warn!("anchor for {:?} not found in report", slot);
        }

        PatchedDocument {
            html: output,
            applied,
            unresolved,
        }
    }
}

fn splice_line(output: &mut String, line: &str, rule: &SlotRule) {
    let newline = if line.ends_with('\n') { "\n" } else { "" };
    match &rule.splice {
        Splice::ReplaceLine(replacement) => {
            output.push_str(replacement);
            if !replacement.ends_with('\n') {
                output.push_str(newline);
            }
        }
        Splice::ReplaceMarker(replacement) => {
            output.push_str(&line.replacen(&rule.marker, replacement, 1));
        }
        Splice::ReplaceEveryMarker(replacement) => {
            output.push_str(&line.replace(&rule.marker, replacement));
        }
        Splice::AppendLines(lines) => {
            output.push_str(line);
            if newline.is_empty() {
                output.push('\n');
            }
            for extra in lines {
                output.push_str(extra);
            }
        }
    }
}

fn generated_date_row(date: &str) -> String {
    format!(
        "<tr><td>Date Report Generated:</td><td><em>{}</em></td></tr>",
        handlebars::html_escape(date)
    )
}

/// Clinician fragment lines, without the copies row when nobody is copied in.
fn clinician_lines(fragment: &str, info: &PatientInfoMap) -> Vec<String> {
    let drop_copies = info.copies().is_none();
    let mut lines: Vec<String> = fragment
        .split_inclusive('\n')
        .filter(|line| !(drop_copies && is_copies_row(line)))
        .map(str::to_string)
        .collect();
    if let Some(last) = lines.last_mut() {
        if !last.ends_with('\n') {
            last.push('\n');
        }
    }
    lines
}

/// A single table row whose only placeholder is `copies`, however it is spelled.
fn is_copies_row(line: &str) -> bool {
    let row = line.trim();
    if !row.starts_with("<tr") || !row.ends_with("</tr>") || row.matches("<tr").count() != 1 {
        return false;
    }
    let names = placeholder_names(row);
    !names.is_empty() && names.iter().all(|name| *name == COPIES_PLACEHOLDER)
}

/// Names inside `{{ }}` / `{{{ }}}` placeholders, trimmed.
fn placeholder_names(text: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        names.push(after[..end].trim_start_matches('{').trim());
        rest = after[end + 2..].trim_start_matches('}');
    }
    names
}

/// Build the plan and apply it in one step.
pub fn patch_document(
    html: &str,
    anchors: &AnchorMarkers,
    fragments: &TemplateFragments,
    info: &PatientInfoMap,
    delabel: bool,
) -> PatchedDocument {
    SlotPlan::build(anchors, fragments, info, delabel).apply(html)
}
