//! Parsed, annotated indicators → the stored report aggregate.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::intelligence::reference::{
    known_indicator, recommendation_for, ALL_NORMAL_ASSESSMENT, FOLLOW_UP_RECOMMENDATION,
    WELLNESS_RECOMMENDATIONS,
};
use crate::intelligence::MessageTemplates;
use crate::models::enums::IndicatorCategory;
use crate::models::{IndicatorRecord, MedicalReport};

/// Inputs for a new report. Everything else is derived.
#[derive(Debug, Clone)]
pub struct ReportDraft {
    pub patient_id: String,
    pub report_date: NaiveDate,
    pub indicators: BTreeMap<String, IndicatorRecord>,
    pub confidence: f64,
}

pub fn assemble_report(draft: ReportDraft) -> MedicalReport {
    assemble_report_at(draft, Uuid::new_v4(), chrono::Local::now().naive_local())
}

/// Deterministic variant of [`assemble_report`].
pub fn assemble_report_at(
    draft: ReportDraft,
    report_id: Uuid,
    created_at: NaiveDateTime,
) -> MedicalReport {
    let mut indicators = draft.indicators;
    apply_health_implications(&mut indicators);

    MedicalReport {
        report_id,
        patient_id: draft.patient_id,
        report_date: draft.report_date,
        abnormal_conditions: abnormal_conditions(&indicators),
        overall_assessment: overall_assessment(&indicators),
        recommendations: recommendations(&indicators),
        confidence: draft.confidence.clamp(0.0, 1.0),
        created_at,
        indicators,
    }
}

pub fn apply_health_implications(indicators: &mut BTreeMap<String, IndicatorRecord>) {
    for record in indicators.values_mut() {
        record.health_implication = MessageTemplates::health_implication(
            &record.name,
            known_indicator(&record.name),
            record.status,
        );
    }
}

/// One line per high/low indicator, in name order.
pub fn abnormal_conditions(indicators: &BTreeMap<String, IndicatorRecord>) -> Vec<String> {
    abnormal(indicators)
        .map(|r| {
            MessageTemplates::abnormal_condition(
                &r.name,
                r.value,
                &r.unit,
                r.status,
                &r.reference_range,
            )
        })
        .collect()
}

/// Distinct categories of the abnormal indicators, first-seen order.
pub fn abnormal_categories(
    indicators: &BTreeMap<String, IndicatorRecord>,
) -> Vec<IndicatorCategory> {
    let mut categories = Vec::new();
    for record in abnormal(indicators) {
        if !categories.contains(&record.category) {
            categories.push(record.category);
        }
    }
    categories
}

pub fn overall_assessment(indicators: &BTreeMap<String, IndicatorRecord>) -> String {
    let count = abnormal(indicators).count();
    if count == 0 {
        return ALL_NORMAL_ASSESSMENT.to_string();
    }
    MessageTemplates::abnormal_assessment(count, &abnormal_categories(indicators))
}

pub fn recommendations(indicators: &BTreeMap<String, IndicatorRecord>) -> Vec<String> {
    let categories = abnormal_categories(indicators);
    if categories.is_empty() {
        return WELLNESS_RECOMMENDATIONS
            .iter()
            .map(|s| s.to_string())
            .collect();
    }

    let mut out: Vec<String> = categories
        .into_iter()
        .filter_map(recommendation_for)
        .map(str::to_string)
        .collect();
    out.push(FOLLOW_UP_RECOMMENDATION.to_string());
    out
}

fn abnormal(
    indicators: &BTreeMap<String, IndicatorRecord>,
) -> impl Iterator<Item = &IndicatorRecord> {
    indicators.values().filter(|r| r.status.is_abnormal())
}
