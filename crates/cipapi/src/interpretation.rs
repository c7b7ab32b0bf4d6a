//! Interpretation request listing: wire models and translation helpers.
//!
//! Responsibilities:
//! - Define the strict wire model of the `interpretationRequestsList` endpoint
//! - Define public domain-level types (`ParticipantRecord` and friends)
//! - Translate wire records into domain records, extracting the report version that the
//!   API only exposes inside each clinical report URL
//!
//! Notes:
//! - Analysis payload versions (`cip_version`) and report versions are unrelated counters
//!   and are kept in separate collections

use crate::{CipApiError, CipApiResult};
use serde::Deserialize;

/// Workflow status the API uses for cases that have been administratively blocked.
pub const BLOCKED_STATUS: &str = "blocked";

// ============================================================================
// Public domain-level types
// ============================================================================

/// A generated clinical report and the version embedded in its retrieval address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportArtifact {
    pub url: String,
    pub version: u32,
}

/// A versioned upstream analysis attached to an interpretation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisPayload {
    pub version: u32,
}

/// One upstream interpretation request for a participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantRecord {
    pub interpretation_request_id: String,
    pub participant_id: String,
    /// Analysis provider (CIP) that produced the interpretation.
    pub provider_id: String,
    pub last_status: String,
    /// Site / location codes used to look the patient up in the local LIMS.
    pub sites: Vec<String>,
    pub payloads: Vec<AnalysisPayload>,
    /// Every clinical report across every interpreted genome, in API order.
    pub artifacts: Vec<ReportArtifact>,
}

impl ParticipantRecord {
    pub fn is_blocked(&self) -> bool {
        self.last_status == BLOCKED_STATUS
    }
}

/// A translated listing response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterpretationListing {
    /// Count reported by the API, which may disagree with `records.len()`.
    pub count: usize,
    pub records: Vec<ParticipantRecord>,
}

// ============================================================================
// Wire model
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct ListingWire {
    count: usize,
    #[serde(default)]
    results: Vec<InterpretationRequestWire>,
}

#[derive(Debug, Deserialize)]
struct InterpretationRequestWire {
    #[serde(default)]
    interpretation_request_id: String,
    proband: String,
    cip: String,
    last_status: String,
    #[serde(default)]
    sites: Vec<String>,
    #[serde(default)]
    interpreted_genomes: Vec<InterpretedGenomeWire>,
}

#[derive(Debug, Deserialize)]
struct InterpretedGenomeWire {
    cip_version: u32,
    #[serde(default)]
    clinical_reports: Vec<ClinicalReportWire>,
}

#[derive(Debug, Deserialize)]
struct ClinicalReportWire {
    url: String,
}

// ============================================================================
// Translation
// ============================================================================

impl InterpretationListing {
    /// Parse a listing response body.
    pub fn parse(json: &str) -> CipApiResult<Self> {
        let wire: ListingWire = serde_json::from_str(json)
            .map_err(|e| CipApiError::Translation(format!("invalid listing JSON: {e}")))?;
        Self::from_wire(wire)
    }

    pub(crate) fn from_wire(wire: ListingWire) -> CipApiResult<Self> {
        let records = wire
            .results
            .into_iter()
            .map(ParticipantRecord::from_wire)
            .collect::<CipApiResult<Vec<_>>>()?;

        Ok(Self {
            count: wire.count,
            records,
        })
    }
}

impl ParticipantRecord {
    fn from_wire(wire: InterpretationRequestWire) -> CipApiResult<Self> {
        let payloads = wire
            .interpreted_genomes
            .iter()
            .map(|g| AnalysisPayload {
                version: g.cip_version,
            })
            .collect();

        let artifacts = wire
            .interpreted_genomes
            .iter()
            .flat_map(|g| g.clinical_reports.iter())
            .map(|r| {
                report_version_from_url(&r.url).map(|version| ReportArtifact {
                    url: r.url.clone(),
                    version,
                })
            })
            .collect::<CipApiResult<Vec<_>>>()?;

        Ok(Self {
            interpretation_request_id: wire.interpretation_request_id,
            participant_id: wire.proband,
            provider_id: wire.cip,
            last_status: wire.last_status,
            sites: wire.sites,
            payloads,
            artifacts,
        })
    }
}

/// Extract the report version from a clinical report address.
///
/// Addresses look like `https://host/api/ClinicalReport/123/1/2/3/`; the last path segment
/// is the report version.
pub fn report_version_from_url(url: &str) -> CipApiResult<u32> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CipApiError::Translation(format!("report URL has no path: {url}")))?;

    segment.parse::<u32>().map_err(|_| {
        CipApiError::Translation(format!(
            "report URL does not end in a numeric version: {url}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "count": 1,
        "results": [{
            "interpretation_request_id": "1234-2",
            "proband": "112000123",
            "cip": "omicia",
            "last_status": "sent_to_gmcs",
            "sites": ["RJ1"],
            "interpreted_genomes": [
                {"cip_version": 1, "clinical_reports": [
                    {"url": "https://cipapi.example/api/ClinicalReport/1234/2/1/1/"}
                ]},
                {"cip_version": 2, "clinical_reports": [
                    {"url": "https://cipapi.example/api/ClinicalReport/1234/2/2/2/"},
                    {"url": "https://cipapi.example/api/ClinicalReport/1234/2/2/3/"}
                ]}
            ]
        }]
    }"#;

    #[test]
    fn test_report_version_from_url_reads_last_segment() {
        assert_eq!(
            report_version_from_url("https://h/api/ClinicalReport/123/1/2/3/").unwrap(),
            3
        );
        assert_eq!(
            report_version_from_url("https://h/api/ClinicalReport/123/1/2/14?format=html")
                .unwrap(),
            14
        );
    }

    #[test]
    fn test_report_version_from_url_rejects_non_numeric() {
        assert!(report_version_from_url("https://h/api/ClinicalReport/latest/").is_err());
        assert!(report_version_from_url("").is_err());
    }

    #[test]
    fn test_parse_listing_flattens_artifacts_in_order() {
        let listing = InterpretationListing::parse(LISTING).unwrap();
        assert_eq!(listing.count, 1);
        let record = &listing.records[0];
        assert_eq!(record.participant_id, "112000123");
        assert_eq!(record.provider_id, "omicia");
        assert_eq!(record.sites, vec!["RJ1".to_string()]);
        assert_eq!(
            record.payloads,
            vec![AnalysisPayload { version: 1 }, AnalysisPayload { version: 2 }]
        );
        let versions: Vec<u32> = record.artifacts.iter().map(|a| a.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
        assert!(!record.is_blocked());
    }

    #[test]
    fn test_parse_listing_without_results() {
        let listing = InterpretationListing::parse(r#"{"count": 0}"#).unwrap();
        assert!(listing.records.is_empty());
    }

    #[test]
    fn test_parse_listing_bad_report_url_fails() {
        let json = r#"{"count": 1, "results": [{
            "proband": "P1", "cip": "omicia", "last_status": "blocked",
            "interpreted_genomes": [{"cip_version": 1, "clinical_reports": [{"url": "nope"}]}]
        }]}"#;
        assert!(matches!(
            InterpretationListing::parse(json),
            Err(CipApiError::Translation(_))
        ));
    }
}
