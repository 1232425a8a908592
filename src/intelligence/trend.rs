//! Change and least-squares trend over an indicator's history.

use crate::models::enums::{ChangeDirection, TrendDirection};
use crate::models::{IndicatorChange, TrendAnalysis};

/// |slope| at or below this is `stable`.
pub const STABLE_SLOPE: f64 = 0.1;

/// Prior values required before a trend is fitted.
pub const MIN_PRIOR_POINTS: usize = 2;

/// Reported trend confidence.
// TODO: derive from the fit residuals (r²) instead of a constant.
pub const TREND_CONFIDENCE: f64 = 0.8;

/// A point of the regression input. `index` is the position in the series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub index: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Ordinary least squares. `None` with fewer than two points or when every
/// point shares the same index.
pub fn linear_regression(points: &[SeriesPoint]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.index).sum();
    let sum_y: f64 = points.iter().map(|p| p.value).sum();
    let sum_xy: f64 = points.iter().map(|p| p.index * p.value).sum();
    let sum_xx: f64 = points.iter().map(|p| p.index * p.index).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Some(LinearFit { slope, intercept })
}

/// Number the series 0..n in order.
pub fn indexed(values: &[f64]) -> Vec<SeriesPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| SeriesPoint {
            index: i as f64,
            value,
        })
        .collect()
}

pub fn classify_slope(slope: f64) -> TrendDirection {
    if slope.abs() <= STABLE_SLOPE {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    }
}

/// Trend over `prior ++ [current]`, prior ordered oldest → newest.
pub fn analyze_trend(prior: &[f64], current: f64) -> Option<TrendAnalysis> {
    if prior.len() < MIN_PRIOR_POINTS {
        return None;
    }
    let mut series = prior.to_vec();
    series.push(current);

    let points = indexed(&series);
    let fit = linear_regression(&points)?;
    let next_index = points.len() as f64;

    Some(TrendAnalysis {
        slope: fit.slope,
        trend: classify_slope(fit.slope),
        confidence: TREND_CONFIDENCE,
        predicted_next: Some(fit.intercept + fit.slope * next_index),
    })
}

/// Change from the most recent prior value.
pub fn compute_change(latest_prior: f64, current: f64) -> IndicatorChange {
    let value = current - latest_prior;
    let percentage = if latest_prior == 0.0 {
        None
    } else {
        Some((value / latest_prior).abs() * 100.0)
    };
    let direction = if value > 0.0 {
        ChangeDirection::Increase
    } else if value < 0.0 {
        ChangeDirection::Decrease
    } else {
        ChangeDirection::Unchanged
    };
    IndicatorChange {
        value,
        percentage,
        direction,
    }
}
