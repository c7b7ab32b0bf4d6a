//! Record selection.
//!
//! Given the interpretation requests returned for a participant, pick the single applicable
//! record, its newest clinical report and its newest analysis payload. The two version
//! counters are unrelated and are tracked separately.
//!
//! Zero or several candidate records are both errors: the selector never guesses which case
//! a report should come from.

use cipapi::{ParticipantRecord, ReportArtifact};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no matching record found for proband {participant}")]
    NoMatchingRecord { participant: String },
    #[error(
        "{count} records found for proband {participant} with provider {provider}; manual intervention required"
    )]
    AmbiguousRecord {
        participant: String,
        provider: String,
        count: usize,
    },
    #[error(
        "record {interpretation_request_id} belongs to proband {found_participant} / provider {found_provider}, expected {participant} / {provider}"
    )]
    RecordMismatch {
        interpretation_request_id: String,
        participant: String,
        provider: String,
        found_participant: String,
        found_provider: String,
    },
    #[error("record for proband {participant} has no clinical report")]
    NoReportArtifact { participant: String },
}

/// The record chosen for a participant and the report to fetch from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub record: ParticipantRecord,
    pub artifact: ReportArtifact,
    /// Newest analysis payload version; recorded for audit, not used to pick the artifact.
    pub payload_version: Option<u32>,
}

impl Selection {
    pub fn artifact_url(&self) -> &str {
        &self.artifact.url
    }
}

/// Select the applicable record for `participant` from pre-filtered candidates.
///
/// # Errors
///
/// - [`SelectionError::NoMatchingRecord`] when `candidates` is empty
/// - [`SelectionError::AmbiguousRecord`] when there is more than one candidate
/// - [`SelectionError::RecordMismatch`] when the single candidate is for another participant
///   or provider
/// - [`SelectionError::NoReportArtifact`] when the record has no clinical report yet
pub fn select_record(
    candidates: &[ParticipantRecord],
    participant: &str,
    provider: &str,
) -> Result<Selection, SelectionError> {
    let record = match candidates {
        [] => {
            return Err(SelectionError::NoMatchingRecord {
                participant: participant.to_string(),
            })
        }
        [record] => record,
        _ => {
            return Err(SelectionError::AmbiguousRecord {
                participant: participant.to_string(),
                provider: provider.to_string(),
                count: candidates.len(),
            })
        }
    };

    if record.participant_id != participant || record.provider_id != provider {
        return Err(SelectionError::RecordMismatch {
            interpretation_request_id: record.interpretation_request_id.clone(),
            participant: participant.to_string(),
            provider: provider.to_string(),
            found_participant: record.participant_id.clone(),
            found_provider: record.provider_id.clone(),
        });
    }

    let artifact = latest_artifact(&record.artifacts)
        .cloned()
        .ok_or_else(|| SelectionError::NoReportArtifact {
            participant: participant.to_string(),
        })?;
    let payload_version = record.payloads.iter().map(|p| p.version).max();

    Ok(Selection {
        record: record.clone(),
        artifact,
        payload_version,
    })
}

/// Highest-versioned artifact; on a tie the first one seen wins.
pub fn latest_artifact(artifacts: &[ReportArtifact]) -> Option<&ReportArtifact> {
    artifacts.iter().fold(None, |best, candidate| match best {
        Some(current) if current.version >= candidate.version => Some(current),
        _ => Some(candidate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipapi::AnalysisPayload;

    fn artifact(version: u32, tag: &str) -> ReportArtifact {
        ReportArtifact {
            url: format!("https://cipapi.example/api/ClinicalReport/1/{tag}/{version}/"),
            version,
        }
    }

    fn record(participant: &str, artifacts: Vec<ReportArtifact>, payloads: &[u32]) -> ParticipantRecord {
        ParticipantRecord {
            interpretation_request_id: "1234-1".into(),
            participant_id: participant.into(),
            provider_id: "omicia".into(),
            last_status: "sent_to_gmcs".into(),
            sites: vec!["RJ1".into()],
            payloads: payloads
                .iter()
                .map(|v| AnalysisPayload { version: *v })
                .collect(),
            artifacts,
        }
    }

    #[test]
    fn test_select_picks_highest_report_version() {
        let candidates = vec![record(
            "P1",
            vec![artifact(1, "a"), artifact(2, "a"), artifact(3, "a")],
            &[1],
        )];
        let selection = select_record(&candidates, "P1", "omicia").unwrap();
        assert_eq!(selection.artifact.version, 3);
    }

    #[test]
    fn test_select_out_of_order_versions() {
        let candidates = vec![record(
            "P1",
            vec![artifact(2, "a"), artifact(7, "a"), artifact(4, "a")],
            &[],
        )];
        let selection = select_record(&candidates, "P1", "omicia").unwrap();
        assert_eq!(selection.artifact.version, 7);
        assert_eq!(selection.payload_version, None);
    }

    #[test]
    fn test_latest_artifact_first_seen_wins_on_tie() {
        let artifacts = vec![artifact(1, "a"), artifact(5, "first"), artifact(5, "second")];
        let best = latest_artifact(&artifacts).unwrap();
        assert!(best.url.contains("/first/"));
    }

    #[test]
    fn test_latest_artifact_matches_true_maximum() {
        let sets: [&[u32]; 4] = [&[0], &[3, 1, 2], &[9, 9, 1], &[1, 2, 3, 10, 4]];
        for versions in sets {
            let artifacts: Vec<ReportArtifact> =
                versions.iter().map(|v| artifact(*v, "x")).collect();
            let expected = versions.iter().max().copied();
            assert_eq!(latest_artifact(&artifacts).map(|a| a.version), expected);
        }
        assert!(latest_artifact(&[]).is_none());
    }

    #[test]
    fn test_payload_version_tracked_independently() {
        let candidates = vec![record("P1", vec![artifact(1, "a")], &[4, 2, 6])];
        let selection = select_record(&candidates, "P1", "omicia").unwrap();
        assert_eq!(selection.payload_version, Some(6));
        assert_eq!(selection.artifact.version, 1);
    }

    #[test]
    fn test_select_no_candidates() {
        let err = select_record(&[], "P2", "omicia").unwrap_err();
        assert_eq!(
            err,
            SelectionError::NoMatchingRecord {
                participant: "P2".into()
            }
        );
        assert!(err.to_string().contains("P2"));
    }

    #[test]
    fn test_select_multiple_candidates_is_ambiguous() {
        let candidates = vec![
            record("P1", vec![artifact(1, "a")], &[1]),
            record("P1", vec![artifact(2, "b")], &[1]),
        ];
        let err = select_record(&candidates, "P1", "omicia").unwrap_err();
        assert!(matches!(err, SelectionError::AmbiguousRecord { count: 2, .. }));
        assert!(err.to_string().contains("omicia"));
    }

    #[test]
    fn test_select_rejects_other_participant() {
        let candidates = vec![record("P9", vec![artifact(1, "a")], &[1])];
        assert!(matches!(
            select_record(&candidates, "P1", "omicia"),
            Err(SelectionError::RecordMismatch { .. })
        ));
    }

    #[test]
    fn test_select_rejects_other_provider() {
        let candidates = vec![record("P1", vec![artifact(1, "a")], &[1])];
        assert!(matches!(
            select_record(&candidates, "P1", "congenica"),
            Err(SelectionError::RecordMismatch { .. })
        ));
    }

    #[test]
    fn test_select_record_without_reports() {
        let candidates = vec![record("P1", vec![], &[1])];
        assert!(matches!(
            select_record(&candidates, "P1", "omicia"),
            Err(SelectionError::NoReportArtifact { .. })
        ));
    }
}
