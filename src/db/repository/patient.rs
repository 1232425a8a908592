use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::Patient;

use super::parse_timestamp;

/// Digest-level lookup. `None` fields are not constrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientHashFilter {
    pub patient_id: Option<String>,
    pub name_hash: Option<String>,
    pub phone_hash: Option<String>,
}

/// Insert or update keyed on `patient_id`. `created_at` survives updates.
pub fn upsert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (patient_id, name, phone, identity_hash, name_hash, phone_hash,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(patient_id) DO UPDATE SET
            name = excluded.name,
            phone = excluded.phone,
            identity_hash = excluded.identity_hash,
            name_hash = excluded.name_hash,
            phone_hash = excluded.phone_hash,
            updated_at = excluded.updated_at",
        params![
            patient.patient_id,
            patient.name,
            patient.phone,
            patient.identity_hash,
            patient.name_hash,
            patient.phone_hash,
            patient.created_at.to_string(),
            patient.updated_at.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, patient_id: &str) -> Result<Option<Patient>, DatabaseError> {
    find_patient(
        conn,
        &PatientHashFilter {
            patient_id: Some(patient_id.to_string()),
            ..PatientHashFilter::default()
        },
    )
}

/// Most recently updated patient matching every set field of the filter.
pub fn find_patient(
    conn: &Connection,
    filter: &PatientHashFilter,
) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT patient_id, name, phone, identity_hash, name_hash, phone_hash,
             created_at, updated_at
             FROM patients
             WHERE (?1 IS NULL OR patient_id = ?1)
               AND (?2 IS NULL OR name_hash = ?2)
               AND (?3 IS NULL OR phone_hash = ?3)
             ORDER BY updated_at DESC
             LIMIT 1",
            params![filter.patient_id, filter.name_hash, filter.phone_hash],
            patient_row_from_rusqlite,
        )
        .optional()?;

    row.map(patient_from_row).transpose()
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
    Ok(count)
}

// Internal row type for Patient mapping
struct PatientRow {
    patient_id: String,
    name: String,
    phone: String,
    identity_hash: String,
    name_hash: String,
    phone_hash: String,
    created_at: String,
    updated_at: String,
}

fn patient_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        patient_id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        identity_hash: row.get(3)?,
        name_hash: row.get(4)?,
        phone_hash: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let created_at: NaiveDateTime = parse_timestamp(&row.created_at)?;
    let updated_at: NaiveDateTime = parse_timestamp(&row.updated_at)?;
    Ok(Patient {
        patient_id: row.patient_id,
        name: row.name,
        phone: row.phone,
        identity_hash: row.identity_hash,
        name_hash: row.name_hash,
        phone_hash: row.phone_hash,
        created_at,
        updated_at,
    })
}
