//! SQLite-backed local patient store.
//!
//! The laboratory information system exports a single patient table keyed by GeL participant
//! id. A participant may appear once per recruiting site; the sites attached to the
//! interpretation request narrow the match.

use crate::metadata::{LocalPatientRecord, PatientStore};
use crate::ReportResult;
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

/// Schema of the exported patient table.
pub const PATIENT_TABLE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS gel_patients (
    participant_id TEXT NOT NULL,
    site TEXT,
    nhs_number TEXT,
    pru TEXT,
    date_of_birth TEXT,
    first_name TEXT,
    last_name TEXT,
    gender TEXT,
    clinician TEXT,
    clinician_address TEXT,
    copies TEXT
)";

pub struct SqlitePatientStore {
    conn: Connection,
}

impl SqlitePatientStore {
    /// Open an existing export read-only.
    pub fn open(path: &Path) -> ReportResult<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        tracing::debug!("opened local patient store {}", path.display());
        Ok(Self { conn })
    }

    /// Wrap an already open connection, creating the table if needed.
    pub fn with_connection(conn: Connection) -> ReportResult<Self> {
        conn.execute_batch(PATIENT_TABLE_SCHEMA)?;
        Ok(Self { conn })
    }
}

struct SiteRow {
    site: Option<String>,
    record: LocalPatientRecord,
}

impl PatientStore for SqlitePatientStore {
    fn find_patient(
        &self,
        participant: &str,
        sites: &[String],
    ) -> ReportResult<Option<LocalPatientRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT site, nhs_number, pru, date_of_birth, first_name, last_name, gender,
                    clinician, clinician_address, copies
             FROM gel_patients WHERE participant_id = ?1",
        )?;
        let rows = stmt.query_map(params![participant], |row| {
            Ok(SiteRow {
                site: row.get(0)?,
                record: LocalPatientRecord {
                    nhs_number: row.get(1)?,
                    pru: row.get(2)?,
                    date_of_birth: row.get(3)?,
                    first_name: row.get(4)?,
                    last_name: row.get(5)?,
                    gender: row.get(6)?,
                    clinician: row.get(7)?,
                    clinician_address: row.get(8)?,
                    copies: row.get(9)?,
                },
            })
        })?;

        let mut matches = Vec::new();
        for row in rows {
            let row = row?;
            // Rows without a site, or lookups without sites, are not narrowed.
            let site_matches = match (&row.site, sites.is_empty()) {
                (_, true) | (None, _) => true,
                (Some(site), false) => sites.iter().any(|s| s.eq_ignore_ascii_case(site)),
            };
            if site_matches {
                matches.push(row.record);
            }
        }

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => {
                tracing::warn!(
                    "{} local patient records match proband {} at sites {:?}",
                    n,
                    participant,
                    sites
                );
                Ok(None)
            }
        }
    }
}
