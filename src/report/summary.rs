use std::collections::BTreeMap;

use crate::intelligence::trend::analyze_trend;
use crate::models::{IndicatorHistorySummary, IndicatorRecord, MedicalReport, PatientSummary};

/// Patient-level view over stored reports (newest first, as listed by the
/// repository). Indicators are ordered by name.
pub fn build_patient_summary(patient_id: &str, reports_newest_first: &[MedicalReport]) -> PatientSummary {
    // name → records oldest → newest
    let mut by_name: BTreeMap<&str, Vec<&IndicatorRecord>> = BTreeMap::new();
    for report in reports_newest_first.iter().rev() {
        for (name, record) in &report.indicators {
            by_name.entry(name.as_str()).or_default().push(record);
        }
    }

    let indicators = by_name
        .into_iter()
        .filter_map(|(name, records)| indicator_summary(name, &records))
        .collect();

    PatientSummary {
        patient_id: patient_id.to_string(),
        report_count: reports_newest_first.len(),
        first_report_date: reports_newest_first.iter().map(|r| r.report_date).min(),
        latest_report_date: reports_newest_first.iter().map(|r| r.report_date).max(),
        indicators,
    }
}

fn indicator_summary(name: &str, records: &[&IndicatorRecord]) -> Option<IndicatorHistorySummary> {
    let (latest, earlier) = records.split_last()?;
    let prior: Vec<f64> = earlier.iter().map(|r| r.value).collect();

    Some(IndicatorHistorySummary {
        name: name.to_string(),
        latest_value: latest.value,
        unit: latest.unit.clone(),
        latest_status: latest.status,
        points: records.len(),
        abnormal_reports: records.iter().filter(|r| r.status.is_abnormal()).count(),
        trend: analyze_trend(&prior, latest.value),
    })
}
