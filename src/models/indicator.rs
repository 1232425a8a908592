use serde::{Deserialize, Serialize};

use super::enums::{
    AlertKind, AlertSeverity, ChangeDirection, IndicatorCategory, IndicatorStatus,
    TrendDirection,
};

/// Reference bounds for an indicator.
///
/// A numeric range may carry only one bound (`<5.0`, `>40`). A special range
/// is free text printed on the report in place of bounds ("negative",
/// "adult-only") and never classifies a value by itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceRange {
    Numeric { min: Option<f64>, max: Option<f64> },
    Special { text: String },
}

impl ReferenceRange {
    pub fn numeric(min: f64, max: f64) -> Self {
        Self::Numeric {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn special(text: impl Into<String>) -> Self {
        Self::Special { text: text.into() }
    }

    pub fn is_special(&self) -> bool {
        matches!(self, Self::Special { .. })
    }
}

impl std::fmt::Display for ReferenceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric {
                min: Some(min),
                max: Some(max),
            } => write!(f, "{min}-{max}"),
            Self::Numeric {
                min: None,
                max: Some(max),
            } => write!(f, "<={max}"),
            Self::Numeric {
                min: Some(min),
                max: None,
            } => write!(f, ">={min}"),
            Self::Numeric {
                min: None,
                max: None,
            } => f.write_str("unbounded"),
            Self::Special { text } => f.write_str(text),
        }
    }
}

/// Change against the most recent prior value of the same indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorChange {
    pub value: f64,
    /// `None` when the prior value was zero.
    pub percentage: Option<f64>,
    pub direction: ChangeDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub slope: f64,
    pub trend: TrendDirection,
    pub confidence: f64,
    pub predicted_next: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCondition {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

/// One lab measurement within a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub name: String,
    pub value: f64,
    /// The value line exactly as extracted, e.g. `5.5 10^9/L`.
    pub original_value: String,
    pub unit: String,
    pub reference_range: ReferenceRange,
    pub status: IndicatorStatus,
    pub category: IndicatorCategory,
    #[serde(default)]
    pub health_implication: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<IndicatorChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendAnalysis>,
    #[serde(default)]
    pub alerts: Vec<AlertCondition>,
}
