//! Column name standardization.
//!
//! `"  First Name "` becomes `"first_name"`. Renames that would produce a
//! duplicate column name are skipped.

use crate::types::Row;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Normalize a column name: trim, lowercase, whitespace runs become `_`.
pub fn standardize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Renames columns (headers and row keys) to their standardized form.
pub struct ColumnStandardizer;

impl ColumnStandardizer {
    /// Returns the new headers, the re-keyed rows and the number of renamed columns.
    ///
    /// Headers keep their positions, so `output[i]` is the new name of `headers[i]`.
    pub fn resolve(headers: &[String], rows: &[Row], enabled: bool) -> (Vec<String>, Vec<Row>, usize) {
        if !enabled {
            return (headers.to_vec(), rows.to_vec(), 0);
        }

        let candidates: Vec<String> = headers.iter().map(|h| standardize_name(h)).collect();

        // Names already in standard form are never displaced
        let mut used: HashSet<&str> = headers
            .iter()
            .zip(&candidates)
            .filter(|(original, candidate)| original == candidate)
            .map(|(original, _)| original.as_str())
            .collect();

        let mut renames: HashMap<&str, &str> = HashMap::new();
        let mut output = Vec::with_capacity(headers.len());

        for (original, candidate) in headers.iter().zip(&candidates) {
            if original == candidate {
                output.push(original.clone());
                continue;
            }

            if used.insert(candidate.as_str()) {
                debug!("Column '{}' renamed to '{}'", original, candidate);
                renames.insert(original.as_str(), candidate.as_str());
                output.push(candidate.clone());
            } else {
                warn!(
                    "Column '{}' keeps its name: '{}' is already taken",
                    original, candidate
                );
                output.push(original.clone());
            }
        }

        if renames.is_empty() {
            return (output, rows.to_vec(), 0);
        }

        let renamed_rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(key, cell)| {
                        let name = renames.get(key.as_str()).copied().unwrap_or(key.as_str());
                        (name.to_string(), cell.clone())
                    })
                    .collect()
            })
            .collect();

        (output, renamed_rows, renames.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;
    use pretty_assertions::assert_eq;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn row_for(names: &[&str]) -> Row {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), Cell::Number(i as f64)))
            .collect()
    }

    #[test]
    fn test_standardize_name() {
        assert_eq!(standardize_name("  First   Name "), "first_name");
        assert_eq!(standardize_name("Email\tAddress"), "email_address");
        assert_eq!(standardize_name("id"), "id");
    }

    #[test]
    fn test_standardize_name_is_idempotent() {
        for name in ["Order ID", " a  B c ", "ÉTAT Civil", "x"] {
            let once = standardize_name(name);
            assert_eq!(standardize_name(&once), once);
        }
    }

    #[test]
    fn test_resolve_renames_headers_and_row_keys() {
        let names = ["Customer Name", "age", "Signup Date"];
        let (out, rows, renamed) = ColumnStandardizer::resolve(&headers(&names), &[row_for(&names)], true);

        assert_eq!(out, headers(&["customer_name", "age", "signup_date"]));
        assert_eq!(renamed, 2);
        assert_eq!(rows[0].keys().cloned().collect::<Vec<_>>(), out);
        assert_eq!(rows[0]["signup_date"], Cell::Number(2.0));
    }

    #[test]
    fn test_resolve_keeps_original_on_collision() {
        let names = ["first_name", "First Name", "FIRST  NAME"];
        let (out, rows, renamed) = ColumnStandardizer::resolve(&headers(&names), &[row_for(&names)], true);

        assert_eq!(out, headers(&names));
        assert_eq!(renamed, 0);
        assert_eq!(rows[0]["First Name"], Cell::Number(1.0));
    }

    #[test]
    fn test_resolve_first_rename_wins() {
        let names = ["Total Sales", "total  sales"];
        let (out, _, renamed) = ColumnStandardizer::resolve(&headers(&names), &[], true);

        assert_eq!(out, headers(&["total_sales", "total  sales"]));
        assert_eq!(renamed, 1);
    }

    #[test]
    fn test_resolve_disabled() {
        let names = ["Customer Name"];
        let (out, rows, renamed) = ColumnStandardizer::resolve(&headers(&names), &[row_for(&names)], false);
        assert_eq!(out, headers(&names));
        assert_eq!(rows[0].keys().next().map(String::as_str), Some("Customer Name"));
        assert_eq!(renamed, 0);
    }
}
