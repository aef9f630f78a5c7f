//! Shared utilities for the cleaning pipeline.
//!
//! Type sniffing lives here so the advisory analyzer, the imputer and the
//! loader all agree on what "numeric", "boolean", "date" and "text" mean.

use crate::types::{Cell, Dataset};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// =============================================================================
// Type Sniffing
// =============================================================================

/// Plain decimal numbers as written in CSV files: `42`, `-3.5`.
static NUMERIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("Invalid regex: numeric"));

// Cheap prefilter before trying the chrono formats
static DATE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}|[A-Za-z]{3,9},? \d{1,2}|\d{1,2} [A-Za-z]{3,9})")
        .expect("Invalid regex: date hint")
});

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Estimated type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Boolean,
    Date,
    Text,
    Unknown,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Text => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Check if a string matches the plain decimal number pattern.
#[inline]
pub fn is_numeric_string(value: &str) -> bool {
    NUMERIC_PATTERN.is_match(value)
}

/// Check if a string parses as one of the supported date or datetime formats.
pub fn looks_like_date(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || is_numeric_string(value) {
        return false;
    }

    if DateTime::parse_from_rfc3339(value).is_ok() || DateTime::parse_from_rfc2822(value).is_ok() {
        return true;
    }

    if !DATE_HINT.is_match(value) {
        return false;
    }

    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
}

/// Kind of a single cell, or `None` for null.
pub fn cell_kind(cell: &Cell) -> Option<ColumnKind> {
    match cell {
        Cell::Null => None,
        Cell::Number(_) => Some(ColumnKind::Numeric),
        Cell::Bool(_) => Some(ColumnKind::Boolean),
        Cell::Text(s) if looks_like_date(s) => Some(ColumnKind::Date),
        Cell::Text(_) => Some(ColumnKind::Text),
    }
}

/// Classify a column by its first non-null value.
pub fn classify<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> ColumnKind {
    cells
        .into_iter()
        .find_map(cell_kind)
        .unwrap_or(ColumnKind::Unknown)
}

/// A column takes part in outlier handling if any cell is a number.
pub fn is_numeric_column(dataset: &Dataset, column: &str) -> bool {
    dataset.column(column).any(|c| matches!(c, Cell::Number(_)))
}

/// A column takes part in contextual correction if any cell is a string.
pub fn is_text_column(dataset: &Dataset, column: &str) -> bool {
    dataset.column(column).any(|c| matches!(c, Cell::Text(_)))
}

/// Sniff a raw CSV field into a cell.
///
/// Empty → null, `true`/`false` → boolean, plain decimals → number, else text.
pub fn sniff_field(raw: &str) -> Cell {
    let value = raw.trim();
    if value.is_empty() {
        return Cell::Null;
    }
    match value {
        "true" => return Cell::Bool(true),
        "false" => return Cell::Bool(false),
        _ => {}
    }
    if is_numeric_string(value)
        && let Ok(n) = value.parse::<f64>()
    {
        return Cell::Number(n);
    }
    Cell::Text(value.to_string())
}

// =============================================================================
// Statistics
// =============================================================================

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation around a known mean.
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Most frequent value; ties go to the value seen first.
pub fn mode<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_string() {
        assert!(is_numeric_string("42"));
        assert!(is_numeric_string("-3.25"));
        assert!(!is_numeric_string("1e5"));
        assert!(!is_numeric_string("3."));
        assert!(!is_numeric_string("$10"));
    }

    #[test]
    fn test_looks_like_date() {
        assert!(looks_like_date("2024-01-15"));
        assert!(looks_like_date("01/15/2024"));
        assert!(looks_like_date("2024-01-15T10:30:00Z"));
        assert!(looks_like_date("2024-01-15 10:30:00"));
        assert!(looks_like_date("Jan 15, 2024"));
        assert!(!looks_like_date("2024"));
        assert!(!looks_like_date("hello world"));
        assert!(!looks_like_date("2024-13-45"));
    }

    #[test]
    fn test_classify_uses_first_non_null() {
        let cells = [Cell::Null, Cell::Bool(true), Cell::Number(1.0)];
        assert_eq!(classify(&cells), ColumnKind::Boolean);

        let cells = [Cell::from("2024-02-01"), Cell::from("x")];
        assert_eq!(classify(&cells), ColumnKind::Date);

        let cells = [Cell::Null, Cell::Null];
        assert_eq!(classify(&cells), ColumnKind::Unknown);
    }

    #[test]
    fn test_sniff_field() {
        assert_eq!(sniff_field(""), Cell::Null);
        assert_eq!(sniff_field("  "), Cell::Null);
        assert_eq!(sniff_field("true"), Cell::Bool(true));
        assert_eq!(sniff_field("TRUE"), Cell::from("TRUE"));
        assert_eq!(sniff_field("-12.5"), Cell::Number(-12.5));
        assert_eq!(sniff_field(" Paris "), Cell::from("Paris"));
    }

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values).unwrap();
        assert_eq!(m, 5.0);
        assert!((population_std_dev(&values, m) - 2.0).abs() < 1e-12);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_mode_breaks_ties_by_first_occurrence() {
        assert_eq!(mode(["b", "a", "a", "b", "c"]), Some("b"));
        assert_eq!(mode(["x", "y", "y"]), Some("y"));
        assert_eq!(mode(Vec::<&str>::new()), None);
    }
}
