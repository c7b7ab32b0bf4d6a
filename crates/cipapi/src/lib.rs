//! CIP-API wire/boundary support.
//!
//! This crate provides **wire models**, **translation helpers** and a blocking HTTP client for
//! the Genomics England interpretation API:
//! - interpretation request listings (JSON)
//! - clinical report retrieval (raw HTML bytes)
//! - JWT token acquisition from on-disk credentials
//!
//! Nothing in here knows about report relabelling. The `report-core` crate consumes the
//! domain-level types re-exported below.

pub mod auth;
pub mod client;
pub mod interpretation;

pub use auth::{ApiToken, Credentials};
pub use client::{CipApiClient, ClientSettings, ListingQuery};
pub use interpretation::{
    AnalysisPayload, InterpretationListing, ParticipantRecord, ReportArtifact, BLOCKED_STATUS,
};

/// Errors returned by the `cipapi` boundary crate.
///
/// Transport failures are classified so callers can tell a flaky network from bad
/// credentials from a report that no longer exists.
#[derive(Debug, thiserror::Error)]
pub enum CipApiError {
    #[error("network failure contacting {url}: {message}")]
    Network { url: String, message: String },

    #[error("authentication rejected by {url} (status {status})")]
    Authentication { url: String, status: u16 },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to parse response from {url}: {message}")]
    ResponseParsing { url: String, message: String },

    #[error("translation error: {0}")]
    Translation(String),

    #[error("failed to read credentials from {path}: {source}")]
    Credentials {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid client configuration: {0}")]
    InvalidConfiguration(String),
}

/// Type alias for Results that can fail with a [`CipApiError`].
pub type CipApiResult<T> = Result<T, CipApiError>;
