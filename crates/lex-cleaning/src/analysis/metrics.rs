use super::{
    COLUMN_SAMPLE_ROWS, ColumnAnalysis, DUPLICATE_SAMPLE_ROWS, DatasetOverview, OVERVIEW_SAMPLE_ROWS,
};
use crate::pipeline::dedup::Deduplicator;
use crate::types::{Cell, Dataset};
use crate::utils::{cell_kind, classify};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Per-column type, null share and samples over the first rows.
pub fn analyze_columns(dataset: &Dataset) -> IndexMap<String, ColumnAnalysis> {
    let sample = &dataset.rows[..dataset.rows.len().min(COLUMN_SAMPLE_ROWS)];

    dataset
        .headers
        .iter()
        .map(|header| {
            let values: Vec<&Cell> = sample.iter().filter_map(|row| row.get(header)).collect();
            let non_null: Vec<&Cell> = values.iter().copied().filter(|c| !c.is_null()).collect();

            let data_type = classify(non_null.iter().copied());
            let null_percentage = if values.is_empty() {
                0.0
            } else {
                (values.len() - non_null.len()) as f64 / values.len() as f64 * 100.0
            };
            let unique: HashSet<String> = non_null.iter().map(|c| cell_key(c)).collect();
            let consistent_type = non_null.iter().all(|c| cell_kind(c) == Some(data_type));

            let analysis = ColumnAnalysis {
                data_type,
                null_percentage,
                unique_values: unique.len(),
                sample_values: non_null.iter().take(3).map(|c| (*c).clone()).collect(),
                consistent_type,
            };
            (header.clone(), analysis)
        })
        .collect()
}

/// Share of null cells over the whole dataset.
pub fn missing_value_ratio(dataset: &Dataset) -> f64 {
    let total = dataset.row_count() * dataset.column_count();
    if total == 0 {
        return 0.0;
    }

    let missing = dataset
        .rows
        .iter()
        .flat_map(|row| dataset.headers.iter().map(move |h| row.get(h)))
        .filter(|cell| cell.is_none_or(Cell::is_null))
        .count();

    missing as f64 / total as f64
}

/// Duplicates among the first rows, scaled up to the full row count.
pub fn estimate_duplicates(dataset: &Dataset) -> usize {
    let sample_size = dataset.row_count().min(DUPLICATE_SAMPLE_ROWS);
    let mut seen = HashSet::with_capacity(sample_size);
    let duplicates = dataset.rows[..sample_size]
        .iter()
        .filter(|row| !seen.insert(Deduplicator::canonical_key(row)))
        .count();

    if sample_size < dataset.row_count() {
        (duplicates as f64 * (dataset.row_count() as f64 / sample_size as f64)).round() as usize
    } else {
        duplicates
    }
}

fn cell_key(cell: &Cell) -> String {
    serde_json::to_string(cell).unwrap_or_else(|_| format!("{:?}", cell))
}

impl DatasetOverview {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self {
            row_count: dataset.row_count(),
            column_count: dataset.column_count(),
            columns: analyze_columns(dataset),
            sample_rows: dataset.rows.iter().take(OVERVIEW_SAMPLE_ROWS).cloned().collect(),
            missing_value_ratio: missing_value_ratio(dataset),
            duplicate_rows_estimate: estimate_duplicates(dataset),
        }
    }
}
