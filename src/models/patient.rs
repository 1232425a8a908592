use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Stored patient identity.
///
/// `identity_hash` covers all three fields; `name_hash` and `phone_hash`
/// back the partial lookups so the indexes never hold raw PII.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub name: String,
    pub phone: String,
    pub identity_hash: String,
    #[serde(skip_serializing, default)]
    pub name_hash: String,
    #[serde(skip_serializing, default)]
    pub phone_hash: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Identity as submitted alongside a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub patient_id: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

/// Partial lookup filter. Any subset of the fields may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientFilter {
    pub patient_id: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl PatientFilter {
    pub fn by_id(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            ..Self::default()
        }
    }

    /// True when no field carries a non-blank value.
    pub fn is_empty(&self) -> bool {
        [&self.patient_id, &self.name, &self.phone]
            .iter()
            .all(|f| f.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}
