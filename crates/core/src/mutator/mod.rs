//! Structural edits to the fetched report.
//!
//! The mutator runs a fixed, ordered list of named stages over a [`ReportDocument`]. Each
//! stage:
//! - is idempotent (running it on its own output changes nothing)
//! - is a no-op when the element it targets is absent
//! - may hand back one [`Capture`] for the anchor patcher
//!
//! The order matters. The generated date must be read from the over-header before it is
//! removed, the identifier table must be relabelled before its last row is captured, and
//! the logo must carry its final attributes before it is serialised as an anchor.
//!
//! Branding stages (address, over-header, banner text, row relabelling) only run when the
//! report is being delabelled.

mod branding;
mod document;
mod sections;
mod tables;

pub use branding::{AddressRedaction, BannerTextRemoval, HeaderStrip, LogoSubstitution};
pub use document::ReportDocument;
pub use sections::{CoverageExpansion, ErrorCheck};
pub use tables::{PaginationHints, RowRelabel};

/// Something a stage read from the document for later use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Capture {
    /// Messages from the generator's embedded error panel.
    UpstreamErrors(Vec<String>),
    /// The "Generated on" date taken from the over-header.
    GeneratedDate(String),
    /// Serialised last row of the identifier table.
    LastRow(String),
    /// Serialised replacement logo tag.
    LogoTag(String),
}

/// A single named structural edit.
pub trait MutationStage {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Apply the edit to `document`.
    fn apply(&self, document: &ReportDocument) -> Option<Capture>;
}

/// Literal markers captured during mutation, resolved later against the serialised text.
///
/// A marker that was not found is `None`, never an empty string: an empty marker would match
/// every line of the document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnchorMarkers {
    pub last_row: Option<String>,
    pub logo_tag: Option<String>,
    pub generated_date: Option<String>,
}

/// Result of running every stage over a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    pub anchors: AnchorMarkers,
    pub upstream_errors: Vec<String>,
}

impl MutationOutcome {
    fn record(&mut self, capture: Capture) {
        match capture {
            Capture::UpstreamErrors(messages) => self.upstream_errors.extend(messages),
            Capture::GeneratedDate(date) => self.anchors.generated_date = Some(date),
            Capture::LastRow(row) => self.anchors.last_row = Some(row),
            Capture::LogoTag(tag) => self.anchors.logo_tag = Some(tag),
        }
    }
}

/// Options controlling which stages run and how.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationOptions {
    /// Strip the originating lab's branding.
    pub delabel: bool,
    /// `src` of the receiving lab's logo.
    pub new_logo: String,
}

/// Runs the ordered stage list.
#[derive(Clone, Debug)]
pub struct DocumentMutator {
    options: MutationOptions,
}

impl DocumentMutator {
    pub fn new(options: MutationOptions) -> Self {
        Self { options }
    }

    /// The stages that will run, in order.
    pub fn stages(&self) -> Vec<Box<dyn MutationStage>> {
        let mut stages: Vec<Box<dyn MutationStage>> = vec![Box::new(ErrorCheck)];
        if self.options.delabel {
            stages.push(Box::new(AddressRedaction));
            stages.push(Box::new(HeaderStrip));
            stages.push(Box::new(BannerTextRemoval));
            stages.push(Box::new(RowRelabel));
        }
        stages.push(Box::new(LogoSubstitution::new(
            self.options.delabel,
            self.options.new_logo.clone(),
        )));
        stages.push(Box::new(PaginationHints));
        stages.push(Box::new(CoverageExpansion));
        stages
    }

    /// Apply every stage to `document` in order.
    ///
    /// Upstream error messages are logged as warnings here and also returned, so the caller
    /// can decide whether they stop the run.
    pub fn mutate(&self, document: &ReportDocument) -> MutationOutcome {
        let mut outcome = MutationOutcome::default();
        for stage in self.stages() {
            tracing::debug!("applying mutation stage '{}'", stage.name());
            if let Some(capture) = stage.apply(document) {
                outcome.record(capture);
            }
        }

        for message in &outcome.upstream_errors {
            tracing::warn!("report contains upstream error: {}", message);
        }

        outcome
    }
}

/// A trimmed-down report in the shape the upstream generator produces.
#[cfg(test)]
pub(crate) const SAMPLE_REPORT: &str = r##"<!DOCTYPE html>
<html>
<head>
<style>
.banner {
    background-color: #007C83; /*#27b7cc;*/
}
</style>
</head>
<body>
<div class="over-header content-div"><span class="left">GeL Participant ID: 112000123</span><span class="right">Generated on: 2017-06-02 10:15</span></div>
<div class="banner"><img class="logo" src="gel_logo.png"><div class="banner-text">Whole Genome Analysis Rare Disease Primary Findings</div></div>
<p class="note">Genomics England, Queen Mary University of London, Dawson Hall, Charterhouse Square, London EC1M 6BQ</p>
<p class="note">This report was produced by the 100,000 Genomes Project.</p>
<table class="form-table" cellpadding="0">
<tr><td>GeL Participant ID:</td><td>112000123</td></tr>
<tr><td>Link to clinical summary:</td><td><a href="https://cipapi.example/summary/112000123">112000123</a></td></tr>
<tr><td>Interpretation Request ID:</td><td>1234-2</td></tr>
</table>
<h3>Participant Information</h3>
<table class="form-table"><tr><td>Sex:</td><td>Female</td></tr></table>
<h3>Referenced Databases</h3>
<table class="annex"><thead><tr><th>Name</th><th>Version</th></tr></thead><tbody><tr><td>Ensembl</td><td>75</td></tr></tbody></table>
<table class="annex"><thead><tr><th>Gene</th></tr></thead><tbody><tr><td>BRCA1</td></tr></tbody></table>
<p><a onclick="toggle('coverage')" style="cursor: pointer;" class="toggle">Coverage Metrics</a></p>
<div id="coverage" hidden=""><p>Coverage summary</p></div>
</body>
</html>
"##;

#[cfg(test)]
pub(crate) fn assert_stage_idempotent(stage: &dyn MutationStage, html: &str) {
    let document = ReportDocument::parse(html.as_bytes());
    stage.apply(&document);
    let once = document.serialize();
    stage.apply(&document);
    let twice = document.serialize();
    assert_eq!(once, twice, "stage '{}' is not idempotent", stage.name());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mutator(delabel: bool) -> DocumentMutator {
        DocumentMutator::new(MutationOptions {
            delabel,
            new_logo: "/images/lab_logo.png".into(),
        })
    }

    #[test]
    fn test_stage_order_when_delabelling() {
        let names: Vec<&str> = mutator(true).stages().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "error-check",
                "address-redaction",
                "header-strip",
                "banner-text-removal",
                "row-relabel",
                "logo-substitution",
                "pagination-hints",
                "coverage-expansion",
            ]
        );
    }

    #[test]
    fn test_stage_order_without_delabel_skips_branding() {
        let names: Vec<&str> = mutator(false).stages().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "error-check",
                "logo-substitution",
                "pagination-hints",
                "coverage-expansion"
            ]
        );
    }

    #[test]
    fn test_full_sequence_is_idempotent() {
        for delabel in [true, false] {
            let document = ReportDocument::parse(SAMPLE_REPORT.as_bytes());
            let mutator = mutator(delabel);
            mutator.mutate(&document);
            let once = document.serialize();
            mutator.mutate(&document);
            assert_eq!(once, document.serialize(), "delabel={delabel}");
        }
    }

    #[test]
    fn test_mutate_captures_anchors_when_delabelling() {
        let document = ReportDocument::parse(SAMPLE_REPORT.as_bytes());
        let outcome = mutator(true).mutate(&document);

        assert_eq!(
            outcome.anchors.generated_date.as_deref(),
            Some("2017-06-02 10:15")
        );
        let last_row = outcome.anchors.last_row.unwrap();
        assert!(last_row.starts_with("<tr>"));
        assert!(last_row.contains("1234-2"));
        let logo = outcome.anchors.logo_tag.unwrap();
        assert!(logo.contains("/images/lab_logo.png"));
        assert!(document.serialize().contains(&logo));
        assert!(outcome.upstream_errors.is_empty());
    }

    #[test]
    fn test_mutate_without_delabel_keeps_branding() {
        let document = ReportDocument::parse(SAMPLE_REPORT.as_bytes());
        let outcome = mutator(false).mutate(&document);
        let html = document.serialize();

        assert_eq!(outcome.anchors, AnchorMarkers::default());
        assert!(html.contains("Genomics England, Queen Mary University of London,"));
        assert!(html.contains("over-header content-div"));
        assert!(html.contains("banner-text"));
        assert!(html.contains("gel_logo.png"));
        assert!(html.contains("Link to clinical summary"));
    }

    #[test]
    fn test_mutate_surfaces_upstream_errors() {
        let html = SAMPLE_REPORT.replace(
            "<body>",
            "<body><div class=\"alert alert-danger\"><p>Tier 1 variants missing</p></div>",
        );
        let document = ReportDocument::parse(html.as_bytes());
        let outcome = mutator(true).mutate(&document);
        assert_eq!(outcome.upstream_errors, vec!["Tier 1 variants missing".to_string()]);
    }
}
