use crate::models::enums::{ChangeDirection, IndicatorCategory, IndicatorStatus, TrendDirection};
use crate::models::ReferenceRange;

use super::reference::KnownIndicator;

/// Message template builder for alert and report text.
/// Plain wording; every message names the indicator it is about.
pub struct MessageTemplates;

impl MessageTemplates {
    /// THRESHOLD: value outside its reference range.
    pub fn threshold(
        name: &str,
        value: f64,
        unit: &str,
        range: &ReferenceRange,
        status: IndicatorStatus,
    ) -> String {
        format!(
            "{} is {} at {} (reference {}).",
            name,
            status_word(status),
            with_unit(value, unit),
            range,
        )
    }

    /// TREND: sustained movement across the patient's history.
    pub fn trend(name: &str, slope: f64, direction: TrendDirection) -> String {
        format!(
            "{} has been {} across recent reports ({:+.2} per report).",
            name,
            direction.as_str(),
            slope,
        )
    }

    /// SUDDEN_CHANGE: large jump since the previous report.
    pub fn sudden_change(name: &str, percentage: f64, direction: ChangeDirection) -> String {
        let verb = match direction {
            ChangeDirection::Increase => "rose",
            ChangeDirection::Decrease => "fell",
            ChangeDirection::Unchanged => "changed",
        };
        format!(
            "{} {} by {:.1}% since the previous report.",
            name, verb, percentage,
        )
    }

    /// One line of the report's abnormal-conditions list.
    pub fn abnormal_condition(
        name: &str,
        value: f64,
        unit: &str,
        status: IndicatorStatus,
        range: &ReferenceRange,
    ) -> String {
        format!(
            "{}: {} ({}, reference {})",
            name,
            with_unit(value, unit),
            status.as_str(),
            range,
        )
    }

    /// Assessment when at least one indicator is abnormal.
    pub fn abnormal_assessment(count: usize, categories: &[IndicatorCategory]) -> String {
        let systems = categories
            .iter()
            .map(IndicatorCategory::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Detected {} abnormal indicator{}, mainly involving the {} system{}. \
             Further examination and follow-up are recommended.",
            count,
            if count == 1 { "" } else { "s" },
            systems,
            if categories.len() == 1 { "" } else { "s" },
        )
    }

    /// Per-indicator health implication.
    pub fn health_implication(
        name: &str,
        known: Option<KnownIndicator>,
        status: IndicatorStatus,
    ) -> String {
        match (known, status) {
            (_, IndicatorStatus::Normal) => "Within the normal range".to_string(),
            (_, IndicatorStatus::Unknown) => {
                "No numeric reference range; interpret with your clinician".to_string()
            }
            (Some(KnownIndicator::Haemoglobin), IndicatorStatus::High) => {
                "High haemoglobin may indicate polycythaemia; further examination is advised"
                    .to_string()
            }
            (Some(KnownIndicator::Haemoglobin), IndicatorStatus::Low) => {
                "Low haemoglobin may indicate anaemia; iron and nutritional support are advised"
                    .to_string()
            }
            (Some(KnownIndicator::Glucose), IndicatorStatus::High) => {
                "High blood glucose suggests impaired glucose metabolism; \
                 manage diet and exercise"
                    .to_string()
            }
            (Some(KnownIndicator::Glucose), IndicatorStatus::Low) => {
                "Low blood glucose needs prompt sugar intake; keep regular meals".to_string()
            }
            (None, status) => format!("{} is {}; consult a doctor", name, status_word(status)),
        }
    }
}

fn status_word(status: IndicatorStatus) -> &'static str {
    match status {
        IndicatorStatus::High => "above range",
        IndicatorStatus::Low => "below range",
        IndicatorStatus::Normal => "within range",
        IndicatorStatus::Unknown => "unclassified",
    }
}

fn with_unit(value: f64, unit: &str) -> String {
    if unit.is_empty() {
        value.to_string()
    } else {
        format!("{value} {unit}")
    }
}
