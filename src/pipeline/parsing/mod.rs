pub mod parser;
pub mod range;

pub use parser::*;
pub use range::{evaluate_status, parse_range_line, resolve_status, ParsedRange, RangeFlag};

use serde::Serialize;
use thiserror::Error;

/// Why a single three-line group was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseFault {
    #[error("Indicator '{name}': malformed value '{token}'")]
    MalformedValue { name: String, token: String },

    #[error("Indicator '{name}': malformed reference range '{token}'")]
    MalformedRange { name: String, token: String },

    #[error("Indicator '{name}' appears more than once")]
    DuplicateIndicator { name: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("No indicators could be parsed ({} group(s) rejected, {discarded_lines} trailing line(s))", faults.len())]
    NoIndicators {
        faults: Vec<ParseFault>,
        discarded_lines: usize,
    },
}
