//! End-to-end report production for one participant.
//!
//! Nothing is written to disk until the document has been fetched, mutated and patched
//! successfully. The intermediate HTML is written atomically, then handed to the renderer.

use crate::config::{ReportConfig, UpstreamErrorPolicy};
use crate::metadata::{MetadataAssembler, PatientStore};
use crate::mutator::{DocumentMutator, MutationOptions, ReportDocument};
use crate::patcher::{patch_document, Slot, TemplateFragments};
use crate::render::Renderer;
use crate::selector::select_record;
use crate::{ReportError, ReportResult};
use cipapi::{CipApiClient, InterpretationListing, ListingQuery, ParticipantRecord, BLOCKED_STATUS};
use report_types::ParticipantId;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The upstream interpretation service as the pipeline sees it.
pub trait UpstreamClient {
    fn list_candidates(&self, query: &ListingQuery) -> ReportResult<InterpretationListing>;
    fn fetch_report(&self, url: &str) -> ReportResult<Vec<u8>>;
}

impl UpstreamClient for CipApiClient {
    fn list_candidates(&self, query: &ListingQuery) -> ReportResult<InterpretationListing> {
        Ok(self.list_interpretation_requests(query)?)
    }

    fn fetch_report(&self, url: &str) -> ReportResult<Vec<u8>> {
        Ok(CipApiClient::fetch_report(self, url)?)
    }
}

/// What a successful run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportOutcome {
    pub participant: ParticipantId,
    pub interpretation_request_id: String,
    pub artifact_version: u32,
    pub payload_version: Option<u32>,
    pub html_path: PathBuf,
    pub pdf_path: PathBuf,
    /// Messages from the report's own error panel, when the policy let them through.
    pub upstream_errors: Vec<String>,
    /// Anchors that could not be placed.
    pub unresolved_slots: Vec<Slot>,
}

pub struct ReportPipeline<'a> {
    cfg: Arc<ReportConfig>,
    upstream: &'a dyn UpstreamClient,
    store: &'a dyn PatientStore,
    renderer: &'a dyn Renderer,
}

impl<'a> ReportPipeline<'a> {
    pub fn new(
        cfg: Arc<ReportConfig>,
        upstream: &'a dyn UpstreamClient,
        store: &'a dyn PatientStore,
        renderer: &'a dyn Renderer,
    ) -> Self {
        Self {
            cfg,
            upstream,
            store,
            renderer,
        }
    }

    /// Produce the relabelled report for `participant`.
    pub fn run(&self, participant: &ParticipantId, delabel: bool) -> ReportResult<ReportOutcome> {
        let query = ListingQuery {
            provider_id: self.cfg.provider_id().to_string(),
            statuses: listing_statuses(self.cfg.workflow_statuses()),
            participant_id: participant.to_string(),
        };
        let listing = self.upstream.list_candidates(&query)?;
        if listing.count != listing.records.len() {
            tracing::warn!(
                "listing reported {} records but returned {}",
                listing.count,
                listing.records.len()
            );
        }

        let (blocked, active): (Vec<ParticipantRecord>, Vec<ParticipantRecord>) =
            listing.records.into_iter().partition(ParticipantRecord::is_blocked);
        if active.is_empty() && !blocked.is_empty() {
            return Err(ReportError::BlockedRecord {
                participant: participant.to_string(),
            });
        }
        if !blocked.is_empty() {
            tracing::info!(
                "ignoring {} blocked record(s) for proband {}",
                blocked.len(),
                participant
            );
        }

        let selection = select_record(&active, participant.as_str(), self.cfg.provider_id())?;
        tracing::info!(
            "selected interpretation request {} report v{} for proband {}",
            selection.record.interpretation_request_id,
            selection.artifact.version,
            participant
        );

        let info = MetadataAssembler::new(self.store, self.cfg.report_title().clone())
            .assemble(&selection)?;

        let raw = self.upstream.fetch_report(selection.artifact_url())?;
        let document = ReportDocument::parse(&raw);
        let outcome = DocumentMutator::new(MutationOptions {
            delabel,
            new_logo: self.cfg.new_logo().to_string(),
        })
        .mutate(&document);

        if !outcome.upstream_errors.is_empty()
            && self.cfg.upstream_error_policy() == UpstreamErrorPolicy::Fail
        {
            return Err(ReportError::UpstreamReported {
                participant: participant.to_string(),
                messages: outcome.upstream_errors,
            });
        }

        let fragments = TemplateFragments::load(self.cfg.fragments())?;
        let patched = patch_document(
            &document.serialize(),
            &outcome.anchors,
            &fragments,
            &info,
            delabel,
        );

        let html_path = self.cfg.html_report_path(participant);
        write_atomically(&html_path, patched.html.as_bytes())?;
        tracing::info!("wrote HTML report {}", html_path.display());

        let pdf_path = self.cfg.pdf_report_path(participant);
        if let Some(dir) = pdf_path.parent() {
            std::fs::create_dir_all(dir).map_err(ReportError::OutputDirCreation)?;
        }
        self.renderer.render(&patched.html, &info, &pdf_path)?;

        Ok(ReportOutcome {
            participant: participant.clone(),
            interpretation_request_id: selection.record.interpretation_request_id,
            artifact_version: selection.artifact.version,
            payload_version: selection.payload_version,
            html_path,
            pdf_path,
            upstream_errors: outcome.upstream_errors,
            unresolved_slots: patched.unresolved,
        })
    }
}

/// Configured statuses plus the blocked status, so blocked cases are seen and refused.
fn listing_statuses(configured: &[String]) -> Vec<String> {
    let mut statuses = configured.to_vec();
    if !statuses.iter().any(|s| s == BLOCKED_STATUS) {
        statuses.push(BLOCKED_STATUS.to_string());
    }
    statuses
}

/// Write through a sibling temporary file so a failed write never leaves a partial report.
fn write_atomically(path: &Path, contents: &[u8]) -> ReportResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(ReportError::OutputDirCreation)?;

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(ReportError::FileWrite)?;
    file.write_all(contents).map_err(ReportError::FileWrite)?;
    file.as_file().sync_all().map_err(ReportError::FileWrite)?;
    file.persist(path)
        .map_err(|e| ReportError::FileWrite(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomically_creates_directory_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("html").join("112000123.html");
        write_atomically(&path, b"first").unwrap();
        write_atomically(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_listing_statuses_always_include_blocked() {
        let configured = vec!["sent_to_gmcs".to_string()];
        assert_eq!(
            listing_statuses(&configured),
            vec!["sent_to_gmcs".to_string(), BLOCKED_STATUS.to_string()]
        );
        let already = vec![BLOCKED_STATUS.to_string(), "report_sent".to_string()];
        assert_eq!(listing_statuses(&already), already);
    }
}
