//! # Report Core
//!
//! Core logic for relabelling GeL clinical reports.
//!
//! This crate takes an interpretation request listing and turns the chosen clinical report
//! into a locally branded PDF:
//! - Record selection and newest-version resolution
//! - Structural edits to the report document
//! - Anchor patching of externally authored fragments
//! - Patient metadata from the local store
//! - Atomic output and PDF rendering
//!
//! **No transport concerns**: HTTP, tokens and wire formats belong in `cipapi`.

pub mod config;
pub mod constants;
mod error;
pub mod lims;
pub mod metadata;
pub mod mutator;
pub mod patcher;
pub mod pipeline;
pub mod render;
pub mod selector;

pub use config::{FragmentPaths, ReportConfig, UpstreamErrorPolicy};
pub use error::{ReportError, ReportResult};
pub use lims::SqlitePatientStore;
pub use metadata::{LocalPatientRecord, MetadataAssembler, PatientInfoMap, PatientStore};
pub use pipeline::{ReportOutcome, ReportPipeline, UpstreamClient};
pub use render::{Renderer, WkhtmltopdfRenderer};
pub use selector::{select_record, Selection, SelectionError};
