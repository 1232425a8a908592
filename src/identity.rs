//! Patient identity: salted digests and upsert/lookup over the repository.
//!
//! Raw name and phone are stored on the patient row but lookups only ever
//! compare digests, so the lookup indexes carry no readable PII.

use rusqlite::Connection;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::repository::{self, PatientHashFilter};
use crate::db::DatabaseError;
use crate::models::{Patient, PatientFilter, PatientInfo};

/// Separates fields inside a digest input so ("ab","c") ≠ ("a","bc").
const FIELD_SEPARATOR: char = '\u{1f}';

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Patient lookup needs at least one of patient_id, name or phone")]
    EmptyFilter,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Digests for one identity, all hex-encoded SHA-256 with the salt prefixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDigests {
    pub identity_hash: String,
    pub name_hash: String,
    pub phone_hash: String,
}

impl IdentityDigests {
    pub fn compute(salt: &str, info: &PatientInfo) -> Self {
        let name = normalize_name(&info.name);
        let phone = normalize_phone(&info.phone);
        Self {
            identity_hash: salted_digest(salt, &[info.patient_id.trim(), &name, &phone]),
            name_hash: salted_digest(salt, &["name", &name]),
            phone_hash: salted_digest(salt, &["phone", &phone]),
        }
    }
}

pub fn salted_digest(salt: &str, fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    for field in fields {
        hasher.update([FIELD_SEPARATOR as u8]);
        hasher.update(field.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Insert or update the patient keyed on `patient_id`. Returns the stored row.
pub fn upsert_patient(
    conn: &Connection,
    salt: &str,
    info: &PatientInfo,
) -> Result<Patient, IdentityError> {
    let patient_id = info.patient_id.trim();
    if patient_id.is_empty() {
        return Err(IdentityError::MissingField("patient_id"));
    }
    if info.name.trim().is_empty() {
        return Err(IdentityError::MissingField("name"));
    }

    let digests = IdentityDigests::compute(salt, info);
    let now = chrono::Local::now().naive_local();
    let patient = Patient {
        patient_id: patient_id.to_string(),
        name: info.name.trim().to_string(),
        phone: normalize_phone(&info.phone),
        identity_hash: digests.identity_hash,
        name_hash: digests.name_hash,
        phone_hash: digests.phone_hash,
        created_at: now,
        updated_at: now,
    };
    repository::upsert_patient(conn, &patient)?;

    let stored = repository::get_patient(conn, patient_id)?.ok_or_else(|| {
        DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: patient_id.to_string(),
        }
    })?;
    tracing::debug!(patient_count = repository::count_patients(conn)?, "Patient upserted");
    Ok(stored)
}

/// Look a patient up by any subset of id, name and phone.
pub fn find_patient(
    conn: &Connection,
    salt: &str,
    filter: &PatientFilter,
) -> Result<Option<Patient>, IdentityError> {
    if filter.is_empty() {
        return Err(IdentityError::EmptyFilter);
    }
    let hash_filter = PatientHashFilter {
        patient_id: non_blank(&filter.patient_id).map(str::to_string),
        name_hash: non_blank(&filter.name)
            .map(|n| salted_digest(salt, &["name", &normalize_name(n)])),
        phone_hash: non_blank(&filter.phone)
            .map(|p| salted_digest(salt, &["phone", &normalize_phone(p)])),
    };
    Ok(repository::find_patient(conn, &hash_filter)?)
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Case and surrounding whitespace do not distinguish names.
fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keep digits and a leading `+`; drop spaces, dashes and brackets.
fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    let mut out = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        if c.is_ascii_digit() || (i == 0 && c == '+') {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    const SALT: &str = "test-salt";

    fn info(id: &str, name: &str, phone: &str) -> PatientInfo {
        PatientInfo {
            patient_id: id.into(),
            name: name.into(),
            phone: phone.into(),
        }
    }

    #[test]
    fn digest_is_deterministic_and_salted() {
        let a = IdentityDigests::compute(SALT, &info("P001", "Zhang San", "13800138000"));
        let b = IdentityDigests::compute(SALT, &info("P001", "Zhang San", "13800138000"));
        let c = IdentityDigests::compute("other", &info("P001", "Zhang San", "13800138000"));
        assert_eq!(a, b);
        assert_ne!(a.identity_hash, c.identity_hash);
        assert_eq!(a.identity_hash.len(), 64);
    }

    #[test]
    fn field_boundaries_matter() {
        assert_ne!(salted_digest(SALT, &["ab", "c"]), salted_digest(SALT, &["a", "bc"]));
    }

    #[test]
    fn upsert_twice_keeps_one_row_with_new_phone() {
        let conn = open_memory_database().unwrap();
        let first = upsert_patient(&conn, SALT, &info("P001", "Zhang San", "111")).unwrap();
        let second = upsert_patient(&conn, SALT, &info("P001", "Zhang San", "222")).unwrap();

        assert_eq!(repository::count_patients(&conn).unwrap(), 1);
        assert_eq!(second.phone, "222");
        assert_ne!(first.identity_hash, second.identity_hash);
        assert_eq!(second.created_at, first.created_at);
    }

    #[test]
    fn upsert_requires_id_and_name() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            upsert_patient(&conn, SALT, &info("  ", "A", "1")),
            Err(IdentityError::MissingField("patient_id"))
        ));
        assert!(matches!(
            upsert_patient(&conn, SALT, &info("P1", "", "1")),
            Err(IdentityError::MissingField("name"))
        ));
    }

    #[test]
    fn find_by_name_or_phone_normalizes_input() {
        let conn = open_memory_database().unwrap();
        upsert_patient(&conn, SALT, &info("P001", "Zhang San", "138-0013-8000")).unwrap();
        upsert_patient(&conn, SALT, &info("P002", "Li Si", "139 0000 0000")).unwrap();

        let by_name = PatientFilter {
            name: Some("  zhang   SAN ".into()),
            ..PatientFilter::default()
        };
        let found = find_patient(&conn, SALT, &by_name).unwrap().unwrap();
        assert_eq!(found.patient_id, "P001");

        let by_phone = PatientFilter {
            phone: Some("13900000000".into()),
            ..PatientFilter::default()
        };
        let found = find_patient(&conn, SALT, &by_phone).unwrap().unwrap();
        assert_eq!(found.patient_id, "P002");
    }

    #[test]
    fn partial_filter_combines_fields() {
        let conn = open_memory_database().unwrap();
        upsert_patient(&conn, SALT, &info("P001", "Zhang San", "111")).unwrap();
        let mismatch = PatientFilter {
            patient_id: Some("P001".into()),
            phone: Some("999".into()),
            ..PatientFilter::default()
        };
        assert!(find_patient(&conn, SALT, &mismatch).unwrap().is_none());
        assert!(find_patient(&conn, SALT, &PatientFilter::by_id("P001"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn empty_filter_is_rejected() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            find_patient(&conn, SALT, &PatientFilter::default()),
            Err(IdentityError::EmptyFilter)
        ));
    }
}
