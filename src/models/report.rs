use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::IndicatorStatus;
use super::indicator::{IndicatorRecord, TrendAnalysis};

/// One processed report image. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalReport {
    pub report_id: Uuid,
    pub patient_id: String,
    pub report_date: NaiveDate,
    pub indicators: BTreeMap<String, IndicatorRecord>,
    pub abnormal_conditions: Vec<String>,
    pub overall_assessment: String,
    pub recommendations: Vec<String>,
    pub confidence: f64,
    pub created_at: NaiveDateTime,
}

impl MedicalReport {
    pub fn abnormal_count(&self) -> usize {
        self.indicators
            .values()
            .filter(|r| r.status.is_abnormal())
            .count()
    }
}

/// Per-indicator view across a patient's stored reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorHistorySummary {
    pub name: String,
    pub latest_value: f64,
    pub unit: String,
    pub latest_status: IndicatorStatus,
    pub points: usize,
    pub abnormal_reports: usize,
    pub trend: Option<TrendAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub patient_id: String,
    pub report_count: usize,
    pub first_report_date: Option<NaiveDate>,
    pub latest_report_date: Option<NaiveDate>,
    pub indicators: Vec<IndicatorHistorySummary>,
}
