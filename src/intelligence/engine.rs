use std::collections::{BTreeMap, HashMap};

use crate::models::{IndicatorRecord, MedicalReport};

use super::alerts::evaluate_alerts;
use super::trend::{analyze_trend, compute_change};

/// Prior values per indicator name, oldest → newest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorHistory {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorHistory {
    /// Build from stored reports listed newest first (the order the
    /// repository returns them in).
    pub fn from_reports(reports_newest_first: &[MedicalReport]) -> Self {
        let mut series: HashMap<String, Vec<f64>> = HashMap::new();
        for report in reports_newest_first.iter().rev() {
            for (name, record) in &report.indicators {
                series.entry(name.clone()).or_default().push(record.value);
            }
        }
        Self { series }
    }

    pub fn prior(&self, name: &str) -> &[f64] {
        self.series.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Fill change, trend and alerts on one record from its prior values.
pub fn annotate_indicator(record: &mut IndicatorRecord, prior: &[f64]) {
    record.change = prior
        .last()
        .map(|&latest| compute_change(latest, record.value));
    record.trend = analyze_trend(prior, record.value);
    record.alerts = evaluate_alerts(record);
}

/// Annotate every record of a freshly parsed report. Returns the number of
/// alerts raised.
pub fn annotate_indicators(
    indicators: &mut BTreeMap<String, IndicatorRecord>,
    history: &IndicatorHistory,
) -> usize {
    let mut alert_count = 0;
    for (name, record) in indicators.iter_mut() {
        annotate_indicator(record, history.prior(name));
        alert_count += record.alerts.len();
    }
    tracing::debug!(
        indicators = indicators.len(),
        with_history = indicators.keys().filter(|n| !history.prior(n).is_empty()).count(),
        alerts = alert_count,
        "Indicator trends evaluated"
    );
    alert_count
}
