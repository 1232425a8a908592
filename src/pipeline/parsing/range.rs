//! Reference range parsing and evaluation.
//!
//! `evaluate_status` is the only place a value is compared against its
//! bounds; the parser and the summary builder both go through it.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::enums::IndicatorStatus;
use crate::models::ReferenceRange;

/// Range text printed instead of numeric bounds.
const SPECIAL_SENTINELS: &[&str] = &[
    "-", "--", "—", "/", "n/a", "na", "none", "nil", "negative", "positive", "neg", "pos",
    "阴性", "阳性", "无", "未见",
];

/// Separators accepted between min and max.
const RANGE_SEPARATORS: &[char] = &['-', '–', '~', '～'];

static INTERVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?\d+(?:\.\d+)?)\s*[-–~～]\s*(-?\d+(?:\.\d+)?)$").unwrap()
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\d+(?:\.\d+)?$").unwrap());

/// Abnormal marker printed after the range by the upstream extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFlag {
    High,
    Low,
}

impl RangeFlag {
    pub fn status(self) -> IndicatorStatus {
        match self {
            Self::High => IndicatorStatus::High,
            Self::Low => IndicatorStatus::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRange {
    pub range: ReferenceRange,
    pub flag: Option<RangeFlag>,
}

/// Offending text of a range line that looks numeric but is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSyntaxError {
    pub token: String,
}

/// Parse the third line of an indicator group.
pub fn parse_range_line(line: &str) -> Result<ParsedRange, RangeSyntaxError> {
    let (body, flag) = split_flag(line.trim());

    if is_sentinel(body) {
        return Ok(ParsedRange {
            range: ReferenceRange::special(body),
            flag,
        });
    }

    if let Some(range) = parse_one_sided(body)? {
        return Ok(ParsedRange { range, flag });
    }

    let has_separator = body.contains(RANGE_SEPARATORS);
    let has_digit = body.chars().any(|c| c.is_ascii_digit());
    if !has_separator || !has_digit {
        return Ok(ParsedRange {
            range: ReferenceRange::special(body),
            flag,
        });
    }

    let caps = INTERVAL.captures(body).ok_or_else(|| RangeSyntaxError {
        token: body.to_string(),
    })?;
    let min = parse_bound(&caps[1], body)?;
    let max = parse_bound(&caps[2], body)?;
    if min > max {
        return Err(RangeSyntaxError {
            token: body.to_string(),
        });
    }

    Ok(ParsedRange {
        range: ReferenceRange::numeric(min, max),
        flag,
    })
}

/// Classify a value against its range. Bounds are inclusive (normal).
pub fn evaluate_status(value: f64, range: &ReferenceRange) -> IndicatorStatus {
    match range {
        ReferenceRange::Numeric { min: None, max: None } | ReferenceRange::Special { .. } => {
            IndicatorStatus::Unknown
        }
        ReferenceRange::Numeric { min, max } => {
            if min.is_some_and(|m| value < m) {
                IndicatorStatus::Low
            } else if max.is_some_and(|m| value > m) {
                IndicatorStatus::High
            } else {
                IndicatorStatus::Normal
            }
        }
    }
}

/// An explicit flag from the report always wins over the numeric comparison.
pub fn resolve_status(value: f64, range: &ReferenceRange, flag: Option<RangeFlag>) -> IndicatorStatus {
    match flag {
        Some(flag) => flag.status(),
        None => evaluate_status(value, range),
    }
}

fn split_flag(line: &str) -> (&str, Option<RangeFlag>) {
    if let Some(rest) = line.strip_suffix('↑') {
        return (rest.trim_end(), Some(RangeFlag::High));
    }
    if let Some(rest) = line.strip_suffix('↓') {
        return (rest.trim_end(), Some(RangeFlag::Low));
    }

    let flag = match line.chars().last() {
        Some('H') | Some('h') => RangeFlag::High,
        Some('L') | Some('l') => RangeFlag::Low,
        _ => return (line, None),
    };
    let rest = &line[..line.len() - 1];
    // "HDL" or "normal" must not lose their last letter.
    let separated = rest
        .chars()
        .last()
        .is_some_and(|c| c.is_whitespace() || c.is_ascii_digit());
    let rest = rest.trim_end();
    if separated && !rest.is_empty() {
        (rest, Some(flag))
    } else {
        (line, None)
    }
}

fn is_sentinel(body: &str) -> bool {
    body.is_empty()
        || SPECIAL_SENTINELS
            .iter()
            .any(|s| s.eq_ignore_ascii_case(body))
}

fn parse_one_sided(body: &str) -> Result<Option<ReferenceRange>, RangeSyntaxError> {
    const UPPER: &[&str] = &["<=", "≤", "<"];
    const LOWER: &[&str] = &[">=", "≥", ">"];

    let (rest, is_upper) = if let Some(rest) = UPPER.iter().find_map(|p| body.strip_prefix(p)) {
        (rest, true)
    } else if let Some(rest) = LOWER.iter().find_map(|p| body.strip_prefix(p)) {
        (rest, false)
    } else {
        return Ok(None);
    };

    let bound = parse_bound(rest.trim(), body)?;
    Ok(Some(if is_upper {
        ReferenceRange::Numeric {
            min: None,
            max: Some(bound),
        }
    } else {
        ReferenceRange::Numeric {
            min: Some(bound),
            max: None,
        }
    }))
}

fn parse_bound(text: &str, body: &str) -> Result<f64, RangeSyntaxError> {
    if !NUMBER.is_match(text) {
        return Err(RangeSyntaxError {
            token: body.to_string(),
        });
    }
    text.parse::<f64>().map_err(|_| RangeSyntaxError {
        token: body.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(min: Option<f64>, max: Option<f64>) -> ReferenceRange {
        ReferenceRange::Numeric { min, max }
    }

    // ── evaluate_status ──

    #[test]
    fn strictly_inside_is_normal() {
        let range = ReferenceRange::numeric(4.0, 10.0);
        assert_eq!(evaluate_status(5.5, &range), IndicatorStatus::Normal);
    }

    #[test]
    fn outside_bounds_are_low_and_high() {
        let range = ReferenceRange::numeric(4.0, 10.0);
        assert_eq!(evaluate_status(3.9, &range), IndicatorStatus::Low);
        assert_eq!(evaluate_status(10.1, &range), IndicatorStatus::High);
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = ReferenceRange::numeric(4.0, 10.0);
        assert_eq!(evaluate_status(4.0, &range), IndicatorStatus::Normal);
        assert_eq!(evaluate_status(10.0, &range), IndicatorStatus::Normal);
    }

    #[test]
    fn one_sided_ranges() {
        let upper = numeric(None, Some(5.2));
        assert_eq!(evaluate_status(-100.0, &upper), IndicatorStatus::Normal);
        assert_eq!(evaluate_status(6.0, &upper), IndicatorStatus::High);

        let lower = numeric(Some(1.0), None);
        assert_eq!(evaluate_status(1000.0, &lower), IndicatorStatus::Normal);
        assert_eq!(evaluate_status(0.5, &lower), IndicatorStatus::Low);
    }

    #[test]
    fn special_and_unbounded_are_unknown() {
        assert_eq!(
            evaluate_status(1.0, &ReferenceRange::special("adult-only")),
            IndicatorStatus::Unknown
        );
        assert_eq!(evaluate_status(1.0, &numeric(None, None)), IndicatorStatus::Unknown);
    }

    #[test]
    fn flag_overrides_numeric_status() {
        let range = ReferenceRange::numeric(4.0, 10.0);
        assert_eq!(resolve_status(5.0, &range, Some(RangeFlag::High)), IndicatorStatus::High);
        assert_eq!(resolve_status(50.0, &range, Some(RangeFlag::Low)), IndicatorStatus::Low);
        assert_eq!(
            resolve_status(1.0, &ReferenceRange::special("negative"), Some(RangeFlag::High)),
            IndicatorStatus::High
        );
    }

    // ── parse_range_line ──

    #[test]
    fn parses_interval() {
        let parsed = parse_range_line("4.0-10.0").unwrap();
        assert_eq!(parsed.range, ReferenceRange::numeric(4.0, 10.0));
        assert_eq!(parsed.flag, None);
    }

    #[test]
    fn parses_interval_with_spaces_and_flag() {
        let parsed = parse_range_line("3.5 - 5.5 H").unwrap();
        assert_eq!(parsed.range, ReferenceRange::numeric(3.5, 5.5));
        assert_eq!(parsed.flag, Some(RangeFlag::High));

        let glued = parse_range_line("130-175L").unwrap();
        assert_eq!(glued.range, ReferenceRange::numeric(130.0, 175.0));
        assert_eq!(glued.flag, Some(RangeFlag::Low));
    }

    #[test]
    fn parses_arrow_flags() {
        let parsed = parse_range_line("3.9-6.1 ↑").unwrap();
        assert_eq!(parsed.flag, Some(RangeFlag::High));
        let parsed = parse_range_line("3.9-6.1↓").unwrap();
        assert_eq!(parsed.flag, Some(RangeFlag::Low));
    }

    #[test]
    fn parses_negative_lower_bound() {
        let parsed = parse_range_line("-3-3").unwrap();
        assert_eq!(parsed.range, ReferenceRange::numeric(-3.0, 3.0));
    }

    #[test]
    fn parses_one_sided_bounds() {
        assert_eq!(parse_range_line("<5.2").unwrap().range, numeric(None, Some(5.2)));
        assert_eq!(parse_range_line("≤ 40").unwrap().range, numeric(None, Some(40.0)));
        assert_eq!(parse_range_line(">1.04").unwrap().range, numeric(Some(1.04), None));
    }

    #[test]
    fn sentinels_are_special() {
        for text in ["-", "N/A", "negative", "阴性"] {
            let parsed = parse_range_line(text).unwrap();
            assert!(parsed.range.is_special(), "{text} should be special");
        }
    }

    #[test]
    fn text_without_separator_or_digits_is_special() {
        let parsed = parse_range_line("adult-only").unwrap();
        assert_eq!(parsed.range, ReferenceRange::special("adult-only"));
        let parsed = parse_range_line("see note 3").unwrap();
        assert!(parsed.range.is_special());
    }

    #[test]
    fn special_range_keeps_flag() {
        let parsed = parse_range_line("negative H").unwrap();
        assert_eq!(parsed.range, ReferenceRange::special("negative"));
        assert_eq!(parsed.flag, Some(RangeFlag::High));
    }

    #[test]
    fn trailing_letter_of_word_is_not_a_flag() {
        let parsed = parse_range_line("HDL").unwrap();
        assert_eq!(parsed.range, ReferenceRange::special("HDL"));
        assert_eq!(parsed.flag, None);
    }

    #[test]
    fn malformed_interval_reports_token() {
        let err = parse_range_line("4.0-1x0").unwrap_err();
        assert_eq!(err.token, "4.0-1x0");
        let err = parse_range_line("4.0.1-10").unwrap_err();
        assert_eq!(err.token, "4.0.1-10");
    }

    #[test]
    fn inverted_interval_rejected() {
        assert!(parse_range_line("10-4").is_err());
    }

    #[test]
    fn malformed_one_sided_rejected() {
        assert_eq!(parse_range_line("<abc").unwrap_err().token, "<abc");
    }
}
