//! Longitudinal analysis: change, trend and alert rules, plus the static
//! reference tables the report text draws on.

pub mod alerts;
pub mod engine;
pub mod messages;
pub mod reference;
pub mod trend;

pub use alerts::evaluate_alerts;
pub use engine::{annotate_indicator, annotate_indicators, IndicatorHistory};
pub use messages::MessageTemplates;
pub use reference::{category_for, known_indicator, KnownIndicator};
pub use trend::{analyze_trend, compute_change, linear_regression, SeriesPoint};
