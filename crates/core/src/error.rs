use crate::selector::SelectionError;
use cipapi::CipApiError;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("last status = blocked for proband {participant}; no report will be generated")]
    BlockedRecord { participant: String },
    #[error("report for proband {participant} contains upstream errors: {}", messages.join("; "))]
    UpstreamReported {
        participant: String,
        messages: Vec<String>,
    },
    #[error("patient information not found for proband {participant} (missing: {})", missing.join(", "))]
    MetadataNotFound {
        participant: String,
        missing: Vec<&'static str>,
    },

    #[error("upstream API error: {0}")]
    Upstream(#[from] CipApiError),
    #[error("local patient store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("failed to read template fragment {path}: {source}", path = path.display())]
    FragmentRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create output directory: {0}")]
    OutputDirCreation(std::io::Error),
    #[error("failed to write report file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to fill report placeholders: {0}")]
    Template(String),
    #[error("failed to launch PDF renderer: {0}")]
    RendererLaunch(std::io::Error),
    #[error("PDF renderer exited with status {status}: {stderr}")]
    RendererFailed { status: i32, stderr: String },
}

pub type ReportResult<T> = std::result::Result<T, ReportError>;

impl ReportError {
    /// Stable machine-readable identifier for structured error output.
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::InvalidInput(_) => "invalid_input",
            ReportError::InvalidConfig(_) => "invalid_config",
            ReportError::Selection(SelectionError::NoMatchingRecord { .. }) => "no_matching_record",
            ReportError::Selection(SelectionError::AmbiguousRecord { .. }) => "ambiguous_record",
            ReportError::Selection(_) => "selection",
            ReportError::BlockedRecord { .. } => "blocked_record",
            ReportError::UpstreamReported { .. } => "upstream_reported_error",
            ReportError::MetadataNotFound { .. } => "metadata_not_found",
            ReportError::Upstream(CipApiError::Network { .. }) => "transport_network",
            ReportError::Upstream(CipApiError::Authentication { .. }) => "transport_authentication",
            ReportError::Upstream(CipApiError::NotFound { .. }) => "transport_not_found",
            ReportError::Upstream(_) => "transport",
            ReportError::Store(_) => "store",
            ReportError::FragmentRead { .. } => "fragment_read",
            ReportError::OutputDirCreation(_) | ReportError::FileWrite(_) => "file_write",
            ReportError::Template(_) => "template",
            ReportError::RendererLaunch(_) | ReportError::RendererFailed { .. } => "render",
        }
    }

    /// Process exit code for this failure. `0` and `1` are never returned, and `2` is left
    /// to argument parsing.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReportError::InvalidInput(_) | ReportError::InvalidConfig(_) => 64,
            ReportError::Selection(_) => 3,
            ReportError::BlockedRecord { .. } => 4,
            ReportError::UpstreamReported { .. } => 5,
            ReportError::MetadataNotFound { .. } => 6,
            ReportError::Upstream(CipApiError::Network { .. }) => 7,
            ReportError::Upstream(CipApiError::Authentication { .. }) => 8,
            ReportError::Upstream(CipApiError::NotFound { .. }) => 9,
            ReportError::Upstream(_) => 10,
            ReportError::Store(_) => 11,
            ReportError::FragmentRead { .. }
            | ReportError::OutputDirCreation(_)
            | ReportError::FileWrite(_) => 12,
            ReportError::Template(_)
            | ReportError::RendererLaunch(_)
            | ReportError::RendererFailed { .. } => 13,
        }
    }
}
