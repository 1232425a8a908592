//! Repository layer: entity-scoped database operations.
//!
//! Two record families: `patients` (unique `patient_id`) and `reports`
//! (unique `report_id`, ordered per patient by date, newest first).

mod patient;
mod report;

use chrono::NaiveDateTime;

use super::DatabaseError;

pub use patient::*;
pub use report::*;

/// Parse a timestamp written with `NaiveDateTime::to_string()`.
pub(crate) fn parse_timestamp(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("timestamp '{s}': {e}")))
}
