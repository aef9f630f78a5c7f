//! Duplicate row removal.

use crate::types::{Cell, DuplicateStats, Row};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Removes rows that are structurally identical to an earlier row.
pub struct Deduplicator;

impl Deduplicator {
    /// Keep the first occurrence of every distinct row.
    pub fn resolve(rows: &[Row], enabled: bool) -> (Vec<Row>, DuplicateStats) {
        if !enabled {
            return (rows.to_vec(), DuplicateStats::default());
        }

        let mut seen = HashSet::with_capacity(rows.len());
        let mut kept = Vec::with_capacity(rows.len());

        for row in rows {
            if seen.insert(Self::canonical_key(row)) {
                kept.push(row.clone());
            }
        }

        let count = rows.len() - kept.len();
        debug!("Removed {} duplicate rows", count);
        (kept, DuplicateStats { count })
    }

    /// Identity key of a row: its JSON form with keys in sorted order.
    ///
    /// Two rows with the same cells under the same column names map to the
    /// same key regardless of column order.
    pub fn canonical_key(row: &Row) -> String {
        let sorted: BTreeMap<&str, &Cell> = row.iter().map(|(k, v)| (k.as_str(), v)).collect();
        serde_json::to_string(&sorted).unwrap_or_else(|_| format!("{:?}", sorted))
    }
}
