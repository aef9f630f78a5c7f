//! Missing-value handling.
//!
//! Drops incomplete rows, imputes mean/mode fill values computed from the
//! original dataset, or replaces nulls with a constant.

use crate::config::{CleaningOptions, MissingValueStrategy};
use crate::types::{Cell, Dataset, MissingValueStats, Row};
use crate::utils::{ColumnKind, classify, mean, mode};
use indexmap::IndexMap;
use tracing::debug;

/// Resolves null cells according to [`MissingValueStrategy`].
pub struct MissingValueResolver;

impl MissingValueResolver {
    /// Apply the configured strategy to `rows`, returning new rows and counts.
    pub fn resolve(
        dataset: &Dataset,
        options: &CleaningOptions,
        rows: &[Row],
    ) -> (Vec<Row>, MissingValueStats) {
        match options.handle_missing_values {
            MissingValueStrategy::Drop => Self::drop_incomplete_rows(rows),
            MissingValueStrategy::Impute => {
                let fills = Self::fill_values(dataset);
                Self::fill_nulls(rows, |column| fills.get(column).cloned())
            }
            MissingValueStrategy::Replace => {
                let constant = Cell::Text(options.replacement_value.clone());
                Self::fill_nulls(rows, |_| Some(constant.clone()))
            }
        }
    }

    /// Per-column fill values computed from the original dataset.
    ///
    /// Numeric columns get the mean of their numbers, text (and date-like text)
    /// columns the mode of their strings. Boolean and all-null columns have no
    /// fill and keep their nulls.
    pub fn fill_values(dataset: &Dataset) -> IndexMap<String, Cell> {
        let mut fills = IndexMap::new();

        for column in &dataset.headers {
            let fill = match classify(dataset.column(column)) {
                ColumnKind::Numeric => {
                    let numbers: Vec<f64> = dataset.column(column).filter_map(Cell::as_f64).collect();
                    mean(&numbers).map(Cell::Number)
                }
                ColumnKind::Text | ColumnKind::Date => {
                    mode(dataset.column(column).filter_map(Cell::as_str)).map(Cell::from)
                }
                ColumnKind::Boolean | ColumnKind::Unknown => None,
            };

            match fill {
                Some(value) => {
                    debug!("Fill value for '{}': {}", column, value);
                    fills.insert(column.clone(), value);
                }
                None => debug!("No fill value for '{}'", column),
            }
        }

        fills
    }

    fn drop_incomplete_rows(rows: &[Row]) -> (Vec<Row>, MissingValueStats) {
        let mut stats = MissingValueStats::default();
        let mut kept = Vec::with_capacity(rows.len());

        for row in rows {
            if row.values().any(Cell::is_null) {
                stats.count += 1;
                for (column, _) in row.iter().filter(|(_, cell)| cell.is_null()) {
                    stats.columns.increment(column, 1);
                }
            } else {
                kept.push(row.clone());
            }
        }

        (kept, stats)
    }

    fn fill_nulls<F>(rows: &[Row], fill_for: F) -> (Vec<Row>, MissingValueStats)
    where
        F: Fn(&str) -> Option<Cell>,
    {
        let mut stats = MissingValueStats::default();
        let mut filled = rows.to_vec();

        for row in &mut filled {
            for (column, cell) in row.iter_mut() {
                if cell.is_null()
                    && let Some(value) = fill_for(column)
                {
                    *cell = value;
                    stats.columns.increment(column, 1);
                    stats.count += 1;
                }
            }
        }

        (filled, stats)
    }
}
