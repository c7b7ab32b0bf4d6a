//! Patient metadata for the fragments and placeholders.
//!
//! The upstream report carries no demographics. These come from the local patient store,
//! keyed by participant id and narrowed by the sites attached to the selected record. A
//! report is only produced when every required field resolves.

use crate::selector::Selection;
use crate::{ReportError, ReportResult};
use report_types::NonEmptyText;
use serde::{Serialize, Serializer};

/// One row from the local patient store. Every field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalPatientRecord {
    pub nhs_number: Option<String>,
    pub pru: Option<String>,
    pub date_of_birth: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub clinician: Option<String>,
    pub clinician_address: Option<String>,
    pub copies: Option<String>,
}

/// Lookup against the local patient store.
pub trait PatientStore {
    /// The single record for `participant`, restricted to `sites` when any are given.
    ///
    /// `Ok(None)` means no unique record exists.
    fn find_patient(
        &self,
        participant: &str,
        sites: &[String],
    ) -> ReportResult<Option<LocalPatientRecord>>;
}

/// Complete metadata for one report.
///
/// Serialises to the placeholder names used by the fragments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatientInfoMap {
    #[serde(rename = "NHS")]
    nhs_number: NonEmptyText,
    #[serde(rename = "PRU")]
    pru: NonEmptyText,
    #[serde(rename = "dob")]
    date_of_birth: NonEmptyText,
    #[serde(rename = "firstname")]
    first_name: NonEmptyText,
    #[serde(rename = "lastname")]
    last_name: NonEmptyText,
    gender: NonEmptyText,
    clinician: NonEmptyText,
    #[serde(rename = "clinician_add")]
    clinician_address: NonEmptyText,
    report_title: NonEmptyText,
    #[serde(serialize_with = "empty_when_absent")]
    copies: Option<NonEmptyText>,
}

fn empty_when_absent<S: Serializer>(
    value: &Option<NonEmptyText>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_ref().map_or("", NonEmptyText::as_str))
}

impl PatientInfoMap {
    /// Validate a store record, returning the placeholder names of any missing fields.
    pub fn from_record(
        record: &LocalPatientRecord,
        report_title: &NonEmptyText,
    ) -> Result<Self, Vec<&'static str>> {
        let mut missing = Vec::new();
        let mut require = |key: &'static str, value: &Option<String>| {
            let text = NonEmptyText::from_optional(value.as_deref());
            if text.is_none() {
                missing.push(key);
            }
            text
        };

        let nhs_number = require("NHS", &record.nhs_number);
        let pru = require("PRU", &record.pru);
        let date_of_birth = require("dob", &record.date_of_birth);
        let first_name = require("firstname", &record.first_name);
        let last_name = require("lastname", &record.last_name);
        let gender = require("gender", &record.gender);
        let clinician = require("clinician", &record.clinician);
        let clinician_address = require("clinician_add", &record.clinician_address);

        match (
            nhs_number,
            pru,
            date_of_birth,
            first_name,
            last_name,
            gender,
            clinician,
            clinician_address,
        ) {
            (
                Some(nhs_number),
                Some(pru),
                Some(date_of_birth),
                Some(first_name),
                Some(last_name),
                Some(gender),
                Some(clinician),
                Some(clinician_address),
            ) => Ok(Self {
                nhs_number,
                pru,
                date_of_birth,
                first_name,
                last_name,
                gender,
                clinician,
                clinician_address,
                report_title: report_title.clone(),
                copies: NonEmptyText::from_optional(record.copies.as_deref()),
            }),
            _ => Err(missing),
        }
    }

    pub fn nhs_number(&self) -> &str {
        self.nhs_number.as_str()
    }

    pub fn pru(&self) -> &str {
        self.pru.as_str()
    }

    pub fn date_of_birth(&self) -> &str {
        self.date_of_birth.as_str()
    }

    pub fn first_name(&self) -> &str {
        self.first_name.as_str()
    }

    pub fn last_name(&self) -> &str {
        self.last_name.as_str()
    }

    pub fn gender(&self) -> &str {
        self.gender.as_str()
    }

    pub fn clinician(&self) -> &str {
        self.clinician.as_str()
    }

    pub fn clinician_address(&self) -> &str {
        self.clinician_address.as_str()
    }

    pub fn report_title(&self) -> &str {
        self.report_title.as_str()
    }

    /// Who else receives the report, if anyone.
    pub fn copies(&self) -> Option<&str> {
        self.copies.as_ref().map(NonEmptyText::as_str)
    }
}

/// Resolves a [`PatientInfoMap`] for a selected record.
pub struct MetadataAssembler<'a> {
    store: &'a dyn PatientStore,
    report_title: NonEmptyText,
}

impl<'a> MetadataAssembler<'a> {
    pub fn new(store: &'a dyn PatientStore, report_title: NonEmptyText) -> Self {
        Self {
            store,
            report_title,
        }
    }

    /// Look up and validate the patient behind `selection`.
    ///
    /// # Errors
    ///
    /// [`ReportError::MetadataNotFound`] when no unique record exists or a required field
    /// is blank; store failures are passed through.
    pub fn assemble(&self, selection: &Selection) -> ReportResult<PatientInfoMap> {
        let participant = &selection.record.participant_id;
        let sites = &selection.record.sites;

        let Some(record) = self.store.find_patient(participant, sites)? else {
            tracing::warn!("no local patient record for proband {}", participant);
            return Err(ReportError::MetadataNotFound {
                participant: participant.clone(),
                missing: vec!["record"],
            });
        };

        PatientInfoMap::from_record(&record, &self.report_title).map_err(|missing| {
            tracing::warn!(
                "local patient record for proband {} is incomplete: {}",
                participant,
                missing.join(", ")
            );
            ReportError::MetadataNotFound {
                participant: participant.clone(),
                missing,
            }
        })
    }
}
