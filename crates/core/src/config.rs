//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the pipeline. Nothing in the pipeline reads environment variables itself; the
//! binary resolves them and builds a [`ReportConfig`].

use crate::constants::DEFAULT_REPORT_TITLE;
use crate::{ReportError, ReportResult};
use report_types::{NonEmptyText, ParticipantId};
use std::path::PathBuf;
use std::str::FromStr;

/// What to do when the fetched report carries its own error panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpstreamErrorPolicy {
    /// Log each message and carry on producing the report.
    #[default]
    Warn,
    /// Refuse to produce a report.
    Fail,
}

impl FromStr for UpstreamErrorPolicy {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            other => Err(ReportError::InvalidConfig(format!(
                "unknown upstream error policy '{other}' (expected 'warn' or 'fail')"
            ))),
        }
    }
}

/// Paths to the two externally authored markup fragments.
#[derive(Clone, Debug)]
pub struct FragmentPaths {
    pub patient_info: PathBuf,
    pub clinician: PathBuf,
}

/// Report configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    provider_id: NonEmptyText,
    workflow_statuses: Vec<String>,
    report_title: NonEmptyText,
    new_logo: String,
    fragments: FragmentPaths,
    html_dir: PathBuf,
    pdf_dir: PathBuf,
    upstream_error_policy: UpstreamErrorPolicy,
}

impl ReportConfig {
    /// Create a new `ReportConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidConfig`] if the provider id or the logo source is blank,
    /// or if no workflow status is allowed.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider_id: &str,
        workflow_statuses: Vec<String>,
        report_title: Option<&str>,
        new_logo: &str,
        fragments: FragmentPaths,
        html_dir: PathBuf,
        pdf_dir: PathBuf,
        upstream_error_policy: UpstreamErrorPolicy,
    ) -> ReportResult<Self> {
        let provider_id = NonEmptyText::new(provider_id)
            .map_err(|_| ReportError::InvalidConfig("provider id cannot be empty".into()))?;

        let workflow_statuses: Vec<String> = workflow_statuses
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if workflow_statuses.is_empty() {
            return Err(ReportError::InvalidConfig(
                "at least one workflow status must be allowed".into(),
            ));
        }

        let report_title = NonEmptyText::from_optional(report_title)
            .map_or_else(|| NonEmptyText::new(DEFAULT_REPORT_TITLE), Ok)
            .map_err(|_| ReportError::InvalidConfig("report title cannot be empty".into()))?;

        if new_logo.trim().is_empty() {
            return Err(ReportError::InvalidConfig(
                "replacement logo source cannot be empty".into(),
            ));
        }

        Ok(Self {
            provider_id,
            workflow_statuses,
            report_title,
            new_logo: new_logo.trim().to_string(),
            fragments,
            html_dir,
            pdf_dir,
            upstream_error_policy,
        })
    }

    pub fn provider_id(&self) -> &str {
        self.provider_id.as_str()
    }

    pub fn workflow_statuses(&self) -> &[String] {
        &self.workflow_statuses
    }

    pub fn report_title(&self) -> &NonEmptyText {
        &self.report_title
    }

    pub fn new_logo(&self) -> &str {
        &self.new_logo
    }

    pub fn fragments(&self) -> &FragmentPaths {
        &self.fragments
    }

    pub fn upstream_error_policy(&self) -> UpstreamErrorPolicy {
        self.upstream_error_policy
    }

    /// Intermediate HTML path for a participant.
    pub fn html_report_path(&self, participant: &ParticipantId) -> PathBuf {
        self.html_dir.join(format!("{participant}.html"))
    }

    /// Final PDF path for a participant.
    pub fn pdf_report_path(&self, participant: &ParticipantId) -> PathBuf {
        self.pdf_dir.join(format!("{participant}.pdf"))
    }
}

/// Split a comma-separated status list, falling back to `defaults` when unset or blank.
pub fn workflow_statuses_from_env_value(value: Option<String>, defaults: &[&str]) -> Vec<String> {
    let parsed: Vec<String> = value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if parsed.is_empty() {
        defaults.iter().map(|s| s.to_string()).collect()
    } else {
        parsed
    }
}
