//! Alert rules. Output order is always threshold, trend, sudden change.

use crate::models::enums::{AlertKind, AlertSeverity, IndicatorStatus};
use crate::models::{AlertCondition, IndicatorChange, IndicatorRecord, ReferenceRange, TrendAnalysis};

use super::messages::MessageTemplates;

pub const TREND_ALERT_SLOPE: f64 = 0.5;
pub const TREND_HIGH_SLOPE: f64 = 1.0;
pub const SUDDEN_CHANGE_PERCENT: f64 = 20.0;
pub const SUDDEN_CHANGE_HIGH_PERCENT: f64 = 50.0;

/// Relative distance past the violated bound.
const THRESHOLD_HIGH_RATIO: f64 = 0.5;
const THRESHOLD_MEDIUM_RATIO: f64 = 0.2;

/// All alerts for a record whose status, change and trend are already set.
pub fn evaluate_alerts(record: &IndicatorRecord) -> Vec<AlertCondition> {
    let mut alerts = Vec::new();
    alerts.extend(threshold_alert(record));
    if let Some(trend) = &record.trend {
        alerts.extend(trend_alert(&record.name, trend));
    }
    if let Some(change) = &record.change {
        alerts.extend(sudden_change_alert(&record.name, change));
    }
    alerts
}

pub fn threshold_alert(record: &IndicatorRecord) -> Option<AlertCondition> {
    if !record.status.is_abnormal() {
        return None;
    }
    Some(AlertCondition {
        kind: AlertKind::Threshold,
        severity: threshold_severity(record.value, &record.reference_range, record.status),
        message: MessageTemplates::threshold(
            &record.name,
            record.value,
            &record.unit,
            &record.reference_range,
            record.status,
        ),
    })
}

/// Severity from how far the value sits past the bound it violates. A flag
/// with no matching numeric bound, or a bound of 0, is `Medium`.
pub fn threshold_severity(
    value: f64,
    range: &ReferenceRange,
    status: IndicatorStatus,
) -> AlertSeverity {
    let bound = match (range, status) {
        (ReferenceRange::Numeric { max: Some(max), .. }, IndicatorStatus::High) if value > *max => {
            *max
        }
        (ReferenceRange::Numeric { min: Some(min), .. }, IndicatorStatus::Low) if value < *min => {
            *min
        }
        _ => return AlertSeverity::Medium,
    };

    if bound == 0.0 {
        return AlertSeverity::Medium;
    }
    let ratio = ((value - bound) / bound).abs();
    if ratio > THRESHOLD_HIGH_RATIO {
        AlertSeverity::High
    } else if ratio > THRESHOLD_MEDIUM_RATIO {
        AlertSeverity::Medium
    } else {
        AlertSeverity::Low
    }
}

pub fn trend_alert(name: &str, trend: &TrendAnalysis) -> Option<AlertCondition> {
    let magnitude = trend.slope.abs();
    if magnitude <= TREND_ALERT_SLOPE {
        return None;
    }
    let severity = if magnitude > TREND_HIGH_SLOPE {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    };
    Some(AlertCondition {
        kind: AlertKind::Trend,
        severity,
        message: MessageTemplates::trend(name, trend.slope, trend.trend),
    })
}

pub fn sudden_change_alert(name: &str, change: &IndicatorChange) -> Option<AlertCondition> {
    let percentage = change.percentage?;
    if percentage <= SUDDEN_CHANGE_PERCENT {
        return None;
    }
    let severity = if percentage > SUDDEN_CHANGE_HIGH_PERCENT {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    };
    Some(AlertCondition {
        kind: AlertKind::SuddenChange,
        severity,
        message: MessageTemplates::sudden_change(name, percentage, change.direction),
    })
}
