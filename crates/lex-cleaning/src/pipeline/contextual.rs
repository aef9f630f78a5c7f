//! LLM contextual correction of free-text cells.
//!
//! Text columns are split into row windows, each window becomes one batch
//! for the [`CorrectionProvider`], and batches are dispatched in waves of
//! `correction_concurrency` scoped threads. Results are applied in batch
//! order, so the output does not depend on which thread finishes first.

use crate::ai::{CorrectionContext, CorrectionProvider, CorrectionRequest, CorrectionResponse};
use crate::config::CleaningOptions;
use crate::error::{CleaningError, Result};
use crate::pipeline::progress::{CancellationToken, CleaningStage, ProgressReporter, ProgressUpdate};
use crate::types::{Cell, CleaningProfile, ContextualStats, Dataset, Row};
use crate::utils::is_text_column;
use std::collections::HashMap;
use std::thread;
use tracing::{debug, info, warn};

/// Insights are only recorded above this confidence.
const INSIGHT_CONFIDENCE: f64 = 0.8;

/// Output of one contextual correction pass.
#[derive(Debug, Clone, Default)]
pub struct ContextualOutput {
    pub rows: Vec<Row>,
    pub stats: ContextualStats,
    /// One entry per failed batch.
    pub warnings: Vec<String>,
}

/// A window of text cells from one column.
#[derive(Debug)]
struct Batch {
    /// Position of the column in the dataset headers.
    column: usize,
    requests: Vec<CorrectionRequest>,
}

impl Batch {
    fn row_span(&self) -> (usize, usize) {
        let first = self.requests.first().map_or(0, |r| r.row_index);
        let last = self.requests.last().map_or(0, |r| r.row_index);
        (first, last)
    }
}

/// Runs correction batches against a [`CorrectionProvider`].
pub struct ContextualCorrector<'a> {
    provider: &'a dyn CorrectionProvider,
    cancellation: Option<&'a CancellationToken>,
    reporter: Option<&'a dyn ProgressReporter>,
}

impl<'a> ContextualCorrector<'a> {
    pub fn new(provider: &'a dyn CorrectionProvider) -> Self {
        Self {
            provider,
            cancellation: None,
            reporter: None,
        }
    }

    pub fn with_cancellation(mut self, token: Option<&'a CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_reporter(mut self, reporter: Option<&'a dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Correct the text cells of `rows`.
    ///
    /// `headers[i]` is the current name of `dataset.headers[i]`; requests,
    /// issues and insights use the original name, cells are written under
    /// the current one.
    pub fn resolve(
        &self,
        dataset: &Dataset,
        profile: &CleaningProfile,
        options: &CleaningOptions,
        headers: &[String],
        rows: &[Row],
    ) -> Result<ContextualOutput> {
        let batches = build_batches(dataset, headers, rows, options.correction_batch_size);
        let mut output = ContextualOutput {
            rows: rows.to_vec(),
            ..Default::default()
        };

        if batches.is_empty() {
            debug!("No text cells to correct");
            return Ok(output);
        }

        info!(
            "Contextual correction: {} batches via {} (model: {})",
            batches.len(),
            self.provider.name(),
            self.provider.model().unwrap_or("default")
        );

        let contexts: HashMap<usize, CorrectionContext> = batches
            .iter()
            .map(|b| (b.column, correction_context(&dataset.headers[b.column], profile, options)))
            .collect();

        let total = batches.len();
        let mut done = 0;

        for wave in batches.chunks(options.correction_concurrency) {
            self.check_cancelled()?;

            let column = &dataset.headers[wave[0].column];
            self.report(ProgressUpdate::with_items(
                CleaningStage::ContextualCorrection,
                format!("Column: {}", column),
                done,
                total,
                format!("Correcting batch {} of {}", done + 1, total),
            ));

            let results = self.dispatch(wave, &contexts);

            for (batch, result) in wave.iter().zip(results) {
                let original = &dataset.headers[batch.column];
                match result {
                    Ok(responses) => {
                        apply_responses(batch, original, &headers[batch.column], responses, options, &mut output);
                    }
                    Err(e) => {
                        let (first, last) = batch.row_span();
                        warn!(
                            "Correction batch for '{}' (rows {}-{}) failed: {}",
                            original, first, last, e
                        );
                        output.stats.batches_failed += 1;
                        output.warnings.push(format!(
                            "Contextual correction skipped for column '{}' rows {}-{}: {}",
                            original, first, last, e
                        ));
                    }
                }
            }

            done += wave.len();
        }

        self.report(ProgressUpdate::with_items(
            CleaningStage::ContextualCorrection,
            "Done",
            total,
            total,
            format!("Corrected {} fields", output.stats.fields_processed),
        ));

        info!(
            "Contextual correction complete: {} fields processed, {} issues fixed, {} batches failed",
            output.stats.fields_processed,
            output.stats.contextual_issues_fixed,
            output.stats.batches_failed
        );

        Ok(output)
    }

    fn dispatch(
        &self,
        wave: &[Batch],
        contexts: &HashMap<usize, CorrectionContext>,
    ) -> Vec<anyhow::Result<Vec<CorrectionResponse>>> {
        let provider = self.provider;

        if let [batch] = wave {
            return vec![provider.correct(&batch.requests, &contexts[&batch.column])];
        }

        thread::scope(|scope| {
            let handles: Vec<_> = wave
                .iter()
                .map(|batch| {
                    let context = &contexts[&batch.column];
                    scope.spawn(move || provider.correct(&batch.requests, context))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(anyhow::anyhow!("correction worker panicked")))
                })
                .collect()
        })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.is_some_and(|t| t.is_cancelled()) {
            return Err(CleaningError::Cancelled);
        }
        Ok(())
    }

    fn report(&self, update: ProgressUpdate) {
        if let Some(reporter) = self.reporter {
            reporter.report(update);
        }
    }
}

fn correction_context(
    column: &str,
    profile: &CleaningProfile,
    options: &CleaningOptions,
) -> CorrectionContext {
    CorrectionContext {
        column_context: format!("Column \"{}\" from {} domain.", column, profile.domain),
        domain_name: profile.domain.as_str().to_string(),
        temperature: options.llm_temperature,
        max_tokens: options.llm_max_tokens,
        detect_anomalies: options.llm_detect_anomalies,
    }
}

/// Split every text column into windows of `batch_size` rows.
fn build_batches(dataset: &Dataset, headers: &[String], rows: &[Row], batch_size: usize) -> Vec<Batch> {
    let mut batches = Vec::new();

    for (column, original) in dataset.headers.iter().enumerate() {
        if !is_text_column(dataset, original) {
            continue;
        }
        let current = &headers[column];

        for start in (0..rows.len()).step_by(batch_size.max(1)) {
            let end = (start + batch_size).min(rows.len());
            let requests: Vec<CorrectionRequest> = (start..end)
                .filter_map(|index| match rows[index].get(current) {
                    Some(Cell::Text(value)) if !value.is_empty() => Some(CorrectionRequest {
                        column_name: original.clone(),
                        row_index: index,
                        original_value: value.clone(),
                    }),
                    _ => None,
                })
                .collect();

            if !requests.is_empty() {
                batches.push(Batch { column, requests });
            }
        }
    }

    batches
}

fn apply_responses(
    batch: &Batch,
    original: &str,
    current: &str,
    responses: Vec<CorrectionResponse>,
    options: &CleaningOptions,
    output: &mut ContextualOutput,
) {
    let mut pending: HashMap<usize, &CorrectionRequest> =
        batch.requests.iter().map(|r| (r.row_index, r)).collect();

    for response in responses {
        if !response.column_name.is_empty() && response.column_name != original {
            warn!(
                "Ignoring correction for column '{}' in a batch for '{}'",
                response.column_name, original
            );
            continue;
        }
        let Some(request) = pending.remove(&response.row_index) else {
            warn!(
                "Ignoring correction for '{}' row {}: not requested or already applied",
                original, response.row_index
            );
            continue;
        };

        let outcome = &response.result;
        match outcome.replacement() {
            Some(cleaned) => {
                output.stats.fields_processed += 1;
                if !outcome.issue_detected {
                    continue;
                }

                let explanation = outcome.explanation();
                output.stats.record_fix(
                    original,
                    format!(
                        "\"{}\" → \"{}\": {}",
                        request.original_value,
                        cleaned,
                        explanation.unwrap_or("Issue fixed")
                    ),
                );

                if let Some(cell) = output.rows[request.row_index].get_mut(current) {
                    *cell = Cell::Text(cleaned.to_string());
                }

                if let Some(explanation) = explanation
                    && outcome.confidence.is_some_and(|c| c > INSIGHT_CONFIDENCE)
                {
                    output
                        .stats
                        .add_insight(format!("Column \"{}\": {}", original, explanation));
                }
            }
            None if outcome.issue_detected && options.llm_detect_anomalies => {
                output.stats.anomalies_detected += 1;
            }
            None => {}
        }
    }
}
