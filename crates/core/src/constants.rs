//! Constants used throughout the report core crate.
//!
//! The upstream report generator emits one fixed document shape. Every selector and literal
//! marker the pipeline depends on lives here so a change in the upstream template only needs
//! editing in one place.

/// Default CIP-API root.
pub const DEFAULT_CIPAPI_URL: &str = "https://cipapi.genomicsengland.nhs.uk/api";

/// Default workflow statuses for which a report may be produced.
pub const DEFAULT_WORKFLOW_STATUSES: &[&str] = &["sent_to_gmcs", "report_generated", "report_sent"];

/// Default report title placed in the patient-info fragment.
pub const DEFAULT_REPORT_TITLE: &str = "100,000 Genomes Project Rare Disease Primary Findings";

/// Default wkhtmltopdf executable, resolved through `PATH`.
pub const DEFAULT_WKHTMLTOPDF: &str = "wkhtmltopdf";

/// Default timeout for upstream HTTP calls, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Document mutation
// ============================================================================

/// Panel the report generator uses to embed its own error messages.
pub const ERROR_PANEL_SELECTOR: &str = "div.alert-danger";

/// Elements inside an error panel that each carry one message.
pub const ERROR_MESSAGE_SELECTOR: &str = "p, li";

/// Notes paragraphs, one of which carries the originating lab's address.
pub const ADDRESS_NOTE_SELECTOR: &str = "p.note";

/// Fixed text identifying the originating lab's address paragraph.
pub const ORIGINATING_ADDRESS_TEXT: &str = "Genomics England, Queen Mary University of London,";

/// Grey bar above the banner carrying the participant id and the generation date.
pub const OVER_HEADER_SELECTOR: &str = "div.over-header.content-div";

/// Element inside the over-header holding the generation date.
pub const GENERATED_ON_SELECTOR: &str = "span.right";

pub const GENERATED_ON_PREFIX: &str = "Generated on:";

/// Title text inside the coloured banner.
pub const BANNER_TEXT_SELECTOR: &str = "div.banner-text";

/// The identifying table directly under the address notes.
pub const IDENTIFIER_TABLE_SELECTOR: &str = "table.form-table[cellpadding=\"0\"]";

pub const CLINICAL_SUMMARY_LABEL: &str = "Link to clinical summary";

pub const PROBAND_ID_LABEL: &str = "GeL Proband ID";

pub const LOGO_SELECTOR: &str = "img.logo";

/// Style applied to the replacement logo so it floats clear of the clinician block.
pub const REPLACEMENT_LOGO_STYLE: &str = "float:right; margin: 2%;";

/// Display size added to the original logo when the report keeps its branding.
pub const LOGO_DISPLAY_SIZE_STYLE: &str = "height: 80px;";

/// Table header text marking annex tables that must not split across pages.
pub const UNSPLITTABLE_TABLE_HEADER: &str = "Name";

pub const AVOID_PAGE_SPLIT_STYLE: &str = " page-break-inside: avoid !important";

pub const REFERENCED_DATABASES_HEADING: &str = "Referenced Databases";

pub const PAGE_BREAK_BEFORE_STYLE: &str = "page-break-before: always;";

pub const COVERAGE_SECTION_SELECTOR: &str = "div#coverage";

pub const COVERAGE_TOGGLE_TEXT: &str = "Coverage Metrics";

pub const COVERAGE_HEADING_TEXT: &str = "Coverage Report";

// ============================================================================
// Anchor patching
// ============================================================================

/// Heading replaced by the patient-info fragment.
pub const PARTICIPANT_INFO_MARKER: &str = "<h3>Participant Information</h3>";

/// Banner colour declaration in the report's inline CSS.
pub const BANNER_CSS_MARKER: &str = "#007C83; /*#27b7cc;*/";

/// Transparent banner so the replacement logo is visible.
pub const BANNER_CSS_REPLACEMENT: &str = "transparent;\n    height: 100px;";

/// Clinician-fragment row dropped when there is nobody to copy the report to.
pub const COPIES_PLACEHOLDER_ROW: &str = "<tr><td>Copies to:</td><td>{{copies}}</td></tr>";

/// Handlebars key of the copies placeholder in the clinician fragment.
pub const COPIES_PLACEHOLDER: &str = "copies";
