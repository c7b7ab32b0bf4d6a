//! Stages that remove or replace the originating lab's identity.

use super::document::{get_attribute, select_all, set_attribute, trimmed_text, ReportDocument};
use super::{Capture, MutationStage};
use crate::constants::{
    ADDRESS_NOTE_SELECTOR, BANNER_TEXT_SELECTOR, GENERATED_ON_PREFIX, GENERATED_ON_SELECTOR,
    LOGO_DISPLAY_SIZE_STYLE, LOGO_SELECTOR, ORIGINATING_ADDRESS_TEXT, OVER_HEADER_SELECTOR,
    REPLACEMENT_LOGO_STYLE,
};

/// Removes the notes paragraph carrying the originating lab's postal address.
pub struct AddressRedaction;

impl MutationStage for AddressRedaction {
    fn name(&self) -> &'static str {
        "address-redaction"
    }

    fn apply(&self, document: &ReportDocument) -> Option<Capture> {
        for note in select_all(document.root(), ADDRESS_NOTE_SELECTOR) {
            if note.as_node().text_contents().contains(ORIGINATING_ADDRESS_TEXT) {
                note.as_node().detach();
            }
        }
        None
    }
}

/// Reads the "Generated on" date from the grey over-header, then removes the over-header.
pub struct HeaderStrip;

impl MutationStage for HeaderStrip {
    fn name(&self) -> &'static str {
        "header-strip"
    }

    fn apply(&self, document: &ReportDocument) -> Option<Capture> {
        let mut generated = None;
        for header in select_all(document.root(), OVER_HEADER_SELECTOR) {
            for span in select_all(header.as_node(), GENERATED_ON_SELECTOR) {
                let date = trimmed_text(&span)
                    .replace(GENERATED_ON_PREFIX, "")
                    .trim()
                    .to_string();
                if !date.is_empty() {
                    generated = Some(date);
                }
            }
            header.as_node().detach();
        }
        generated.map(Capture::GeneratedDate)
    }
}

/// Removes the report title from the coloured banner; the banner itself stays so the patcher
/// can recolour it.
pub struct BannerTextRemoval;

impl MutationStage for BannerTextRemoval {
    fn name(&self) -> &'static str {
        "banner-text-removal"
    }

    fn apply(&self, document: &ReportDocument) -> Option<Capture> {
        for text in select_all(document.root(), BANNER_TEXT_SELECTOR) {
            text.as_node().detach();
        }
        None
    }
}

/// Swaps the logo for the receiving lab's, or only sizes it when branding is kept.
pub struct LogoSubstitution {
    delabel: bool,
    new_logo: String,
}

impl LogoSubstitution {
    pub fn new(delabel: bool, new_logo: impl Into<String>) -> Self {
        Self {
            delabel,
            new_logo: new_logo.into(),
        }
    }
}

impl MutationStage for LogoSubstitution {
    fn name(&self) -> &'static str {
        "logo-substitution"
    }

    fn apply(&self, document: &ReportDocument) -> Option<Capture> {
        let mut tag = None;
        for logo in select_all(document.root(), LOGO_SELECTOR) {
            if self.delabel {
                set_attribute(&logo, "src", &self.new_logo);
                set_attribute(&logo, "style", REPLACEMENT_LOGO_STYLE);
                tag = Some(logo.as_node().to_string());
            } else {
                let style = get_attribute(&logo, "style").unwrap_or_default();
                if !style.contains(LOGO_DISPLAY_SIZE_STYLE) {
                    let sized = if style.trim().is_empty() {
                        LOGO_DISPLAY_SIZE_STYLE.to_string()
                    } else {
                        format!("{} {}", style.trim_end(), LOGO_DISPLAY_SIZE_STYLE)
                    };
                    set_attribute(&logo, "style", &sized);
                }
            }
        }
        tag.map(Capture::LogoTag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutator::{assert_stage_idempotent, SAMPLE_REPORT};

    fn apply(stage: &dyn MutationStage) -> (String, Option<Capture>) {
        let document = ReportDocument::parse(SAMPLE_REPORT.as_bytes());
        let capture = stage.apply(&document);
        (document.serialize(), capture)
    }

    #[test]
    fn test_address_redaction_removes_only_address_note() {
        let (html, capture) = apply(&AddressRedaction);
        assert!(capture.is_none());
        assert!(!html.contains(ORIGINATING_ADDRESS_TEXT));
        assert!(html.contains("This report was produced by the 100,000 Genomes Project."));
        assert_stage_idempotent(&AddressRedaction, SAMPLE_REPORT);
    }

    #[test]
    fn test_header_strip_captures_date_and_removes_header() {
        let (html, capture) = apply(&HeaderStrip);
        assert_eq!(
            capture,
            Some(Capture::GeneratedDate("2017-06-02 10:15".into()))
        );
        assert!(!html.contains("over-header"));
        assert!(!html.contains("Generated on:"));
        assert_stage_idempotent(&HeaderStrip, SAMPLE_REPORT);
    }

    #[test]
    fn test_header_strip_absent_header_is_noop() {
        let html = "<html><body><p>nothing here</p></body></html>";
        let document = ReportDocument::parse(html.as_bytes());
        let before = document.serialize();
        assert!(HeaderStrip.apply(&document).is_none());
        assert_eq!(before, document.serialize());
    }

    #[test]
    fn test_banner_text_removal_keeps_banner() {
        let (html, _) = apply(&BannerTextRemoval);
        assert!(!html.contains("Whole Genome Analysis"));
        assert!(html.contains("<div class=\"banner\">"));
        assert_stage_idempotent(&BannerTextRemoval, SAMPLE_REPORT);
    }

    #[test]
    fn test_logo_substitution_delabel_swaps_source() {
        let stage = LogoSubstitution::new(true, "/images/lab_logo.png");
        let (html, capture) = apply(&stage);
        let Some(Capture::LogoTag(tag)) = capture else {
            panic!("expected a logo tag capture");
        };
        assert!(tag.contains("src=\"/images/lab_logo.png\""));
        assert!(tag.contains(REPLACEMENT_LOGO_STYLE));
        assert!(html.contains(&tag));
        assert!(!html.contains("gel_logo.png"));
        assert_stage_idempotent(&stage, SAMPLE_REPORT);
    }

    #[test]
    fn test_logo_substitution_without_delabel_only_sizes() {
        let stage = LogoSubstitution::new(false, "/images/lab_logo.png");
        let (html, capture) = apply(&stage);
        assert!(capture.is_none());
        assert!(html.contains("src=\"gel_logo.png\""));
        assert!(html.contains(&format!("style=\"{LOGO_DISPLAY_SIZE_STYLE}\"")));
        assert!(!html.contains("/images/lab_logo.png"));
        assert_stage_idempotent(&stage, SAMPLE_REPORT);
    }

    #[test]
    fn test_logo_sizing_appends_to_existing_style() {
        let html = "<img class=\"logo\" src=\"a.png\" style=\"border: 0;\">";
        let document = ReportDocument::parse(html.as_bytes());
        LogoSubstitution::new(false, "b.png").apply(&document);
        assert!(document
            .serialize()
            .contains(&format!("style=\"border: 0; {LOGO_DISPLAY_SIZE_STYLE}\"")));
    }
}
