//! Outlier handling module.
//!
//! Detects values more than `outlier_z_threshold` standard deviations away
//! from the column mean and flags, removes or caps them.

use crate::config::{CleaningOptions, OutlierStrategy};
use crate::types::{Cell, Dataset, OutlierStats, Row};
use crate::utils::{is_numeric_column, mean, population_std_dev};
use tracing::debug;

/// Bounds of the non-outlying range of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierBounds {
    pub mean: f64,
    pub threshold: f64,
}

impl OutlierBounds {
    /// Compute bounds from the numbers of a column.
    ///
    /// Returns `None` when there are no values or the spread is degenerate.
    pub fn from_values(values: &[f64], z_threshold: f64) -> Option<Self> {
        let mean = mean(values)?;
        let std_dev = population_std_dev(values, mean);
        if std_dev == 0.0 || !std_dev.is_finite() {
            return None;
        }
        Some(Self {
            mean,
            threshold: z_threshold * std_dev,
        })
    }

    pub fn is_outlier(&self, value: f64) -> bool {
        (value - self.mean).abs() > self.threshold
    }

    /// Clamp to the nearest bound.
    pub fn cap(&self, value: f64) -> f64 {
        if value > self.mean {
            self.mean + self.threshold
        } else {
            self.mean - self.threshold
        }
    }
}

/// Handles outlier detection and treatment.
pub struct OutlierResolver;

impl OutlierResolver {
    /// Apply the configured outlier strategy to every numeric column.
    pub fn resolve(
        dataset: &Dataset,
        options: &CleaningOptions,
        rows: &[Row],
    ) -> (Vec<Row>, OutlierStats) {
        let mut stats = OutlierStats::default();
        let mut output = rows.to_vec();

        for column in &dataset.headers {
            if !is_numeric_column(dataset, column) {
                continue;
            }

            let values: Vec<f64> = output
                .iter()
                .filter_map(|row| row.get(column).and_then(Cell::as_f64))
                .collect();

            let Some(bounds) = OutlierBounds::from_values(&values, options.outlier_z_threshold)
            else {
                debug!("Skipping outliers for '{}': no spread", column);
                continue;
            };

            let mut found = 0;
            for row in &mut output {
                let Some(cell) = row.get_mut(column) else {
                    continue;
                };
                let Some(value) = cell.as_f64() else {
                    continue;
                };
                if !bounds.is_outlier(value) {
                    continue;
                }

                found += 1;
                match options.handle_outliers {
                    OutlierStrategy::Flag => {}
                    OutlierStrategy::Remove => *cell = Cell::Null,
                    OutlierStrategy::Cap => *cell = Cell::Number(bounds.cap(value)),
                }
            }

            if found > 0 {
                debug!(
                    "Column '{}': {} outliers {} (mean {:.3}, threshold {:.3})",
                    column,
                    found,
                    options.handle_outliers.action_label(),
                    bounds.mean,
                    bounds.threshold
                );
                stats.columns.increment(column, found);
            }
        }

        stats.count = stats.columns.total();
        (output, stats)
    }
}
