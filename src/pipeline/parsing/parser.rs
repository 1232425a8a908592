//! Three-line indicator text → typed indicator records.
//!
//! The extraction prompt asks for one indicator per three lines:
//!
//! ```text
//! WBC
//! 5.5 10^9/L
//! 4.0-10.0
//! ```
//!
//! Each group is attempted independently; a malformed group is recorded as
//! a fault and the rest of the report still parses.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::range::{parse_range_line, resolve_status};
use super::{ParseError, ParseFault};
use crate::intelligence::reference::category_for;
use crate::models::IndicatorRecord;

const GROUP_SIZE: usize = 3;

/// `<number>` optionally followed by a unit, either separated by whitespace
/// (`5.5 10^9/L`) or glued on (`120g/L`). A glued unit may not start with a
/// digit, dot or comma, which is what rejects `5.5.5` and `5,5`.
static VALUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([-+]?\d+(?:\.\d+)?)(?:\s+(\S.*)|([^\d\s.,].*))?$").unwrap()
});

/// Result of one three-line group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupOutcome {
    Parsed(IndicatorRecord),
    Rejected(ParseFault),
}

/// Aggregate over every group of a text blob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub indicators: BTreeMap<String, IndicatorRecord>,
    pub faults: Vec<ParseFault>,
    /// Lines of a trailing partial group.
    pub discarded_lines: usize,
}

impl ParseOutcome {
    /// Number of complete groups that were attempted.
    pub fn attempted_groups(&self) -> usize {
        self.indicators.len() + self.faults.len()
    }

    /// Fail when nothing usable came out of the text.
    pub fn into_result(self) -> Result<Self, ParseError> {
        if self.indicators.is_empty() {
            return Err(ParseError::NoIndicators {
                faults: self.faults,
                discarded_lines: self.discarded_lines,
            });
        }
        Ok(self)
    }
}

/// Parse an extracted text blob. Never fails; see [`ParseOutcome::into_result`].
pub fn parse_indicators(text: &str) -> ParseOutcome {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let groups = lines.chunks_exact(GROUP_SIZE);
    let discarded_lines = groups.remainder().len();

    let mut outcome = ParseOutcome {
        discarded_lines,
        ..ParseOutcome::default()
    };

    for group in groups {
        match parse_group(group[0], group[1], group[2]) {
            GroupOutcome::Parsed(record) => {
                if outcome.indicators.contains_key(&record.name) {
                    outcome
                        .faults
                        .push(ParseFault::DuplicateIndicator { name: record.name });
                } else {
                    outcome.indicators.insert(record.name.clone(), record);
                }
            }
            GroupOutcome::Rejected(fault) => outcome.faults.push(fault),
        }
    }

    if discarded_lines > 0 {
        tracing::warn!(discarded_lines, "Trailing partial indicator group discarded");
    }
    if !outcome.faults.is_empty() {
        tracing::warn!(
            rejected = outcome.faults.len(),
            parsed = outcome.indicators.len(),
            "Some indicator groups were rejected"
        );
    }

    outcome
}

/// Parse one name/value/range triple.
pub fn parse_group(name_line: &str, value_line: &str, range_line: &str) -> GroupOutcome {
    let name = name_line.trim().to_string();

    let Some((value, unit)) = parse_value_line(value_line) else {
        let token = value_line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        return GroupOutcome::Rejected(ParseFault::MalformedValue { name, token });
    };

    let parsed = match parse_range_line(range_line) {
        Ok(parsed) => parsed,
        Err(err) => {
            return GroupOutcome::Rejected(ParseFault::MalformedRange {
                name,
                token: err.token,
            })
        }
    };

    let status = resolve_status(value, &parsed.range, parsed.flag);
    GroupOutcome::Parsed(IndicatorRecord {
        category: category_for(&name),
        name,
        value,
        original_value: value_line.trim().to_string(),
        unit,
        reference_range: parsed.range,
        status,
        health_implication: String::new(),
        change: None,
        trend: None,
        alerts: Vec::new(),
    })
}

fn parse_value_line(line: &str) -> Option<(f64, String)> {
    let caps = VALUE_LINE.captures(line.trim())?;
    let value: f64 = caps[1].parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let unit = caps
        .get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    Some((value, unit))
}
