//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating a cleaning run over the fixed stage topology in
//! [`CleaningStage::PIPELINE_ORDER`].

use crate::ai::CorrectionProvider;
use crate::config::{CleaningOptions, ConfigValidationError};
use crate::error::{CleaningError, Result};
use crate::pipeline::contextual::ContextualCorrector;
use crate::pipeline::dedup::Deduplicator;
use crate::pipeline::missing::MissingValueResolver;
use crate::pipeline::outliers::OutlierResolver;
use crate::pipeline::progress::{
    CancellationToken, CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::pipeline::standardize::ColumnStandardizer;
use crate::pipeline::state::{PipelineState, StateUpdate};
use crate::reporting::IssueAggregator;
use crate::types::{CleaningProfile, CleaningResult, CleaningSummary, Dataset};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The main cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom options.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::{CancellationToken, CleaningOptions, Pipeline, profiles};
/// use lex_cleaning::ai::OpenRouterProvider;
/// use std::sync::Arc;
///
/// // With LLM correction and progress reporting
/// let provider = Arc::new(OpenRouterProvider::new(api_key)?);
/// let token = CancellationToken::new();
///
/// let result = Pipeline::builder()
///     .options(CleaningOptions::builder().llm_contextual_cleaning(true).build()?)
///     .correction_provider(provider)
///     .cancellation_token(token.clone())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(&dataset, &profiles::general())?;
///
/// // Deterministic stages only
/// let result = Pipeline::builder().build()?.process(&dataset, &profile)?;
/// ```
pub struct Pipeline {
    options: CleaningOptions,
    correction_provider: Option<Arc<dyn CorrectionProvider>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

// Ensure Pipeline is Send (can be moved to a worker thread)
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Options this pipeline was built with.
    pub fn options(&self) -> &CleaningOptions {
        &self.options
    }

    /// Clean `dataset` under `profile`.
    ///
    /// The dataset is only borrowed; the result owns a cleaned copy.
    ///
    /// # Errors
    ///
    /// Returns `Err(CleaningError::Cancelled)` if the pipeline was cancelled
    /// via the cancellation token, and `InvalidDataset`, `InvalidProfile` or
    /// `InvalidConfig` when validation fails. Failed correction batches are
    /// not errors; they surface as result warnings.
    pub fn process(&self, dataset: &Dataset, profile: &CleaningProfile) -> Result<CleaningResult> {
        match self.process_internal(dataset, profile) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Cleaning completed successfully"));
                Ok(result)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Check if cancellation has been requested.
    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(CleaningError::Cancelled);
        }
        Ok(())
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(&self, dataset: &Dataset, profile: &CleaningProfile) -> Result<CleaningResult> {
        let start_time = Instant::now();

        info!(
            "Starting cleaning pipeline: {} rows x {} columns, profile '{}'",
            dataset.row_count(),
            dataset.column_count(),
            profile.id
        );
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Initializing,
            0.0,
            "Validating input...",
        ));

        dataset.validate()?;
        profile.validate(dataset)?;
        self.options
            .validate()
            .map_err(|e| CleaningError::InvalidConfig(e.to_string()))?;

        let mut state = PipelineState::new(dataset, profile, &self.options);

        for stage in CleaningStage::PIPELINE_ORDER {
            self.check_cancelled()?;

            self.report_progress(ProgressUpdate::new(stage, 0.0, stage.display_name()));
            let update = self.run_stage(stage, &state)?;
            state.merge(update);
            self.report_progress(ProgressUpdate::new(
                stage,
                1.0,
                format!("{} complete", stage.display_name()),
            ));
        }

        let result = state.result.take().ok_or_else(|| {
            CleaningError::InvariantViolation("result stage produced no result".to_string())
        })?;

        info!(
            "Cleaning complete in {} ms: {} -> {} rows, {} issues",
            start_time.elapsed().as_millis(),
            result.summary.rows_processed,
            result.summary.rows_remaining,
            result.issues.len()
        );

        Ok(result)
    }

    fn run_stage(&self, stage: CleaningStage, state: &PipelineState<'_>) -> Result<StateUpdate> {
        let options = state.options;

        let update = match stage {
            CleaningStage::MissingValues => {
                let (rows, stats) =
                    MissingValueResolver::resolve(state.dataset, options, &state.cleaned_data);
                info!(
                    "Missing values: {} ({:?}) across {} columns",
                    stats.count,
                    options.handle_missing_values,
                    stats.columns.len()
                );
                StateUpdate {
                    cleaned_data: Some(rows),
                    missing_values_fixed: Some(stats),
                    ..Default::default()
                }
            }
            CleaningStage::Outliers => {
                let (rows, stats) =
                    OutlierResolver::resolve(state.dataset, options, &state.cleaned_data);
                info!("Outliers: {} ({:?})", stats.count, options.handle_outliers);
                StateUpdate {
                    cleaned_data: Some(rows),
                    outliers_detected: Some(stats),
                    ..Default::default()
                }
            }
            CleaningStage::Deduplication => {
                let (rows, stats) =
                    Deduplicator::resolve(&state.cleaned_data, options.remove_duplicates);
                info!("Duplicates removed: {}", stats.count);
                StateUpdate {
                    cleaned_data: Some(rows),
                    duplicates_removed: Some(stats),
                    ..Default::default()
                }
            }
            CleaningStage::Standardization => {
                let (headers, rows, renamed) = ColumnStandardizer::resolve(
                    &state.headers,
                    &state.cleaned_data,
                    options.standardize_columns,
                );
                info!("Columns standardized: {}", renamed);
                StateUpdate {
                    cleaned_data: Some(rows),
                    headers: Some(headers),
                    columns_standardized: Some(renamed),
                    ..Default::default()
                }
            }
            CleaningStage::ContextualCorrection => self.run_contextual(state)?,
            CleaningStage::IssueReport => {
                let issues = IssueAggregator::aggregate(
                    options,
                    &state.missing_values_fixed,
                    &state.outliers_detected,
                    &state.duplicates_removed,
                    state.llm_cleaning_stats.as_ref(),
                );
                debug!("Issue report: {} entries", issues.len());
                StateUpdate {
                    issues: Some(issues),
                    ..Default::default()
                }
            }
            CleaningStage::PrepareResult => StateUpdate {
                result: Some(prepare_result(state)),
                ..Default::default()
            },
            CleaningStage::Initializing
            | CleaningStage::Complete
            | CleaningStage::Cancelled
            | CleaningStage::Failed => {
                return Err(CleaningError::InvariantViolation(format!(
                    "{:?} is not a processing stage",
                    stage
                )));
            }
        };

        Ok(update)
    }

    fn run_contextual(&self, state: &PipelineState<'_>) -> Result<StateUpdate> {
        if !state.options.llm_contextual_cleaning {
            debug!("Contextual correction disabled");
            return Ok(StateUpdate::default());
        }

        let Some(provider) = &self.correction_provider else {
            warn!("Contextual correction requested but no correction provider is configured");
            let mut warnings = state.warnings.clone();
            warnings.push("Contextual correction skipped: no correction provider configured".to_string());
            return Ok(StateUpdate {
                warnings: Some(warnings),
                ..Default::default()
            });
        };

        let output = ContextualCorrector::new(provider.as_ref())
            .with_cancellation(Some(&self.cancellation_token))
            .with_reporter(self.progress_reporter.as_deref())
            .resolve(
                state.dataset,
                state.profile,
                state.options,
                &state.headers,
                &state.cleaned_data,
            )?;

        info!(
            "Contextual correction: {} issues fixed, {} anomalies, {} failed batches",
            output.stats.contextual_issues_fixed,
            output.stats.anomalies_detected,
            output.stats.batches_failed
        );

        let mut warnings = state.warnings.clone();
        warnings.extend(output.warnings);

        Ok(StateUpdate {
            cleaned_data: Some(output.rows),
            llm_cleaning_stats: Some(output.stats),
            warnings: Some(warnings),
            ..Default::default()
        })
    }
}

fn prepare_result(state: &PipelineState<'_>) -> CleaningResult {
    let contextual = state.llm_cleaning_stats.as_ref();

    let summary = CleaningSummary {
        rows_processed: state.dataset.row_count(),
        rows_remaining: state.cleaned_data.len(),
        missing_values_fixed: state.missing_values_fixed.count,
        outliers_detected: state.outliers_detected.count,
        duplicates_removed: state.duplicates_removed.count,
        columns_standardized: state.columns_standardized,
        llm_cleaning_applied: contextual.map(|s| s.fields_processed),
        contextual_issues_fixed: contextual.map(|s| s.contextual_issues_fixed),
        anomalies_detected: contextual.map(|s| s.anomalies_detected),
    };

    CleaningResult {
        cleaned_data: state.cleaned_data.clone(),
        headers: state.headers.clone(),
        summary,
        issues: state.issues.clone(),
        llm_insights: contextual.map(|s| s.insights.clone()),
        warnings: state.warnings.clone(),
        profile_id: state.profile.id.clone(),
        processed_at: Utc::now().to_rfc3339(),
    }
}

/// Builder for creating a [`Pipeline`] with custom options.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = Pipeline::builder()
///     .options(CleaningOptions::default())
///     .cancellation_token(token)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?;
/// ```
#[derive(Default)]
pub struct PipelineBuilder {
    options: Option<CleaningOptions>,
    correction_provider: Option<Arc<dyn CorrectionProvider>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

// Ensure PipelineBuilder is Send (can be moved to another thread during construction)
static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the cleaning options.
    pub fn options(mut self, options: CleaningOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the provider used by the contextual correction stage.
    ///
    /// The stage only runs when `llm_contextual_cleaning` is enabled in the
    /// options. Use `Arc` to share one provider across pipeline runs.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use lex_cleaning::ai::GeminiProvider;
    /// use std::sync::Arc;
    ///
    /// let provider = Arc::new(GeminiProvider::new("api-key")?);
    ///
    /// let pipeline = Pipeline::builder()
    ///     .correction_provider(provider.clone())
    ///     .build()?;
    /// ```
    pub fn correction_provider(mut self, provider: Arc<dyn CorrectionProvider>) -> Self {
        self.correction_provider = Some(provider);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use lex_cleaning::{ProgressReporter, ProgressUpdate};
    /// use std::sync::Arc;
    ///
    /// struct MyReporter;
    ///
    /// impl ProgressReporter for MyReporter {
    ///     fn report(&self, update: ProgressUpdate) {
    ///         println!("{}: {}", update.stage.display_name(), update.message);
    ///     }
    /// }
    ///
    /// let pipeline = Pipeline::builder()
    ///     .progress_reporter(Arc::new(MyReporter))
    ///     .build()?;
    /// ```
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// Convenience over [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping the pipeline.
    ///
    /// Clone the token and call [`CancellationToken::cancel()`] from any
    /// thread. The pipeline checks it before every stage and before every
    /// wave of correction batches.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the options are invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let options = self.options.unwrap_or_default();
        options.validate()?;

        Ok(Pipeline {
            options,
            correction_provider: self.correction_provider,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{CorrectionContext, CorrectionOutcome, CorrectionRequest, CorrectionResponse};
    use crate::config::{MissingValueStrategy, OutlierStrategy};
    use crate::profiles;
    use crate::types::{Cell, IssueKind, Row};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // -------------------------------------------------------------------------
    // Helper functions
    // -------------------------------------------------------------------------

    fn row(pairs: &[(&str, Cell)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn dataset(headers: &[&str], rows: Vec<Row>) -> Dataset {
        Dataset::new(headers.iter().map(|h| h.to_string()).collect(), rows)
    }

    /// Title-cases every value and reports it as fixed.
    struct TitleCaseProvider;

    impl CorrectionProvider for TitleCaseProvider {
        fn correct(
            &self,
            batch: &[CorrectionRequest],
            _context: &CorrectionContext,
        ) -> anyhow::Result<Vec<CorrectionResponse>> {
            Ok(batch
                .iter()
                .map(|r| {
                    let mut chars = r.original_value.chars();
                    let cleaned: String = chars
                        .next()
                        .map(|c| c.to_uppercase().chain(chars).collect())
                        .unwrap_or_default();
                    CorrectionResponse {
                        column_name: r.column_name.clone(),
                        row_index: r.row_index,
                        original_value: Some(r.original_value.clone()),
                        result: CorrectionOutcome {
                            cleaned: cleaned != r.original_value,
                            issue_detected: cleaned != r.original_value,
                            cleaned_value: Some(cleaned),
                            explanation: Some("Capitalized".to_string()),
                            confidence: Some(0.95),
                            ..Default::default()
                        },
                    }
                })
                .collect())
        }

        fn name(&self) -> &str {
            "TitleCase"
        }
    }

    // -------------------------------------------------------------------------
    // Builder tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert!(pipeline.correction_provider.is_none());
        assert_eq!(pipeline.options(), &CleaningOptions::default());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_options() {
        let options = CleaningOptions {
            correction_batch_size: 0,
            ..Default::default()
        };
        assert!(Pipeline::builder().options(options).build().is_err());
    }

    #[test]
    fn test_pipeline_builder_with_cancellation_token() {
        let token = CancellationToken::new();
        let token_clone = token.clone();

        let pipeline = Pipeline::builder().cancellation_token(token).build().unwrap();
        assert!(pipeline.check_cancelled().is_ok());

        token_clone.cancel();
        assert!(matches!(pipeline.check_cancelled(), Err(CleaningError::Cancelled)));
    }

    // -------------------------------------------------------------------------
    // Processing tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_drop_scenario() {
        let data = dataset(
            &["a"],
            vec![
                row(&[("a", Cell::Number(1.0))]),
                row(&[("a", Cell::Number(2.0))]),
                row(&[("a", Cell::Null)]),
            ],
        );
        let result = Pipeline::builder()
            .build()
            .unwrap()
            .process(&data, &profiles::general())
            .unwrap();

        assert_eq!(result.summary.rows_processed, 3);
        assert_eq!(result.summary.rows_remaining, 2);
        assert_eq!(result.summary.missing_values_fixed, 1);
        assert_eq!(
            result.issues,
            vec![crate::types::Issue::new(IssueKind::Missing, "a", 1, "rows dropped")]
        );
        assert!(result.summary.llm_cleaning_applied.is_none());
        assert!(result.llm_insights.is_none());
        assert_eq!(result.profile_id, "general");
    }

    #[test]
    fn test_dedup_scenario() {
        let data = dataset(
            &["a"],
            vec![
                row(&[("a", Cell::Number(1.0))]),
                row(&[("a", Cell::Number(1.0))]),
                row(&[("a", Cell::Number(2.0))]),
            ],
        );
        let result = Pipeline::builder()
            .build()
            .unwrap()
            .process(&data, &profiles::general())
            .unwrap();

        assert_eq!(result.cleaned_data.len(), 2);
        assert_eq!(result.summary.duplicates_removed, 1);
        assert_eq!(result.issues[0].column, "multiple");
    }

    #[test]
    fn test_standardized_headers_in_result() {
        let data = dataset(
            &["First Name", "age"],
            vec![row(&[("First Name", "ada".into()), ("age", Cell::Number(36.0))])],
        );
        let result = Pipeline::builder()
            .build()
            .unwrap()
            .process(&data, &profiles::general())
            .unwrap();

        assert_eq!(result.headers, vec!["first_name", "age"]);
        assert_eq!(result.summary.columns_standardized, 1);
        assert_eq!(result.cleaned_data[0]["first_name"], Cell::Text("ada".to_string()));
        assert_eq!(data.headers[0], "First Name");
    }

    #[test]
    fn test_flag_without_dedup_is_idempotent() {
        let options = CleaningOptions::builder()
            .handle_missing_values(MissingValueStrategy::Impute)
            .handle_outliers(OutlierStrategy::Flag)
            .remove_duplicates(false)
            .standardize_columns(false)
            .build()
            .unwrap();
        let pipeline = Pipeline::builder().options(options).build().unwrap();
        let data = dataset(
            &["n", "t"],
            vec![
                row(&[("n", Cell::Number(1.0)), ("t", "x".into())]),
                row(&[("n", Cell::Null), ("t", Cell::Null)]),
                row(&[("n", Cell::Number(3.0)), ("t", "x".into())]),
            ],
        );

        let first = pipeline.process(&data, &profiles::general()).unwrap();
        let again = dataset(&["n", "t"], first.cleaned_data.clone());
        let second = pipeline.process(&again, &profiles::general()).unwrap();

        assert_eq!(first.cleaned_data[1]["n"], Cell::Number(2.0));
        assert_eq!(second.cleaned_data, first.cleaned_data);
        assert_eq!(second.summary.missing_values_fixed, 0);
    }

    #[test]
    fn test_contextual_stage_with_provider() {
        let options = CleaningOptions::builder()
            .llm_contextual_cleaning(true)
            .build()
            .unwrap();
        let pipeline = Pipeline::builder()
            .options(options)
            .correction_provider(Arc::new(TitleCaseProvider))
            .build()
            .unwrap();
        let data = dataset(
            &["City Name"],
            vec![row(&[("City Name", "paris".into())]), row(&[("City Name", "Rome".into())])],
        );

        let result = pipeline.process(&data, &profiles::general()).unwrap();

        assert_eq!(result.cleaned_data[0]["city_name"], Cell::Text("Paris".to_string()));
        assert_eq!(result.summary.llm_cleaning_applied, Some(1));
        assert_eq!(result.summary.contextual_issues_fixed, Some(1));
        assert_eq!(result.summary.anomalies_detected, Some(0));

        let contextual = result.issues.last().unwrap();
        assert_eq!(contextual.kind, IssueKind::Contextual);
        assert_eq!(contextual.column, "City Name");
        assert_eq!(contextual.action, "fixed with LLM");
        assert_eq!(
            result.llm_insights,
            Some(vec!["Column \"City Name\": Capitalized".to_string()])
        );
    }

    #[test]
    fn test_llm_cleaning_applied_counts_processed_fields() {
        struct EchoProvider;

        impl CorrectionProvider for EchoProvider {
            fn correct(
                &self,
                batch: &[CorrectionRequest],
                _context: &CorrectionContext,
            ) -> anyhow::Result<Vec<CorrectionResponse>> {
                Ok(batch
                    .iter()
                    .map(|r| CorrectionResponse {
                        column_name: r.column_name.clone(),
                        row_index: r.row_index,
                        original_value: Some(r.original_value.clone()),
                        result: CorrectionOutcome {
                            cleaned: true,
                            cleaned_value: Some(r.original_value.clone()),
                            ..Default::default()
                        },
                    })
                    .collect())
            }

            fn name(&self) -> &str {
                "Echo"
            }
        }

        let options = CleaningOptions::builder()
            .llm_contextual_cleaning(true)
            .build()
            .unwrap();
        let data = dataset(
            &["c"],
            vec![
                row(&[("c", "a".into())]),
                row(&[("c", "b".into())]),
                row(&[("c", "c".into())]),
            ],
        );

        let result = Pipeline::builder()
            .options(options)
            .correction_provider(Arc::new(EchoProvider))
            .build()
            .unwrap()
            .process(&data, &profiles::general())
            .unwrap();

        assert_eq!(result.summary.llm_cleaning_applied, Some(3));
        assert_eq!(result.summary.contextual_issues_fixed, Some(0));

        let json = serde_json::to_value(&result.summary).unwrap();
        assert_eq!(json["llmCleaningApplied"], 3);
    }

    #[test]
    fn test_contextual_enabled_without_provider_warns() {
        let options = CleaningOptions::builder()
            .llm_contextual_cleaning(true)
            .build()
            .unwrap();
        let data = dataset(&["c"], vec![row(&[("c", "x".into())])]);

        let result = Pipeline::builder()
            .options(options)
            .build()
            .unwrap()
            .process(&data, &profiles::general())
            .unwrap();

        assert!(result.summary.llm_cleaning_applied.is_none());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_provider_ignored_when_contextual_disabled() {
        let pipeline = Pipeline::builder()
            .correction_provider(Arc::new(TitleCaseProvider))
            .build()
            .unwrap();
        let data = dataset(&["c"], vec![row(&[("c", "paris".into())])]);

        let result = pipeline.process(&data, &profiles::general()).unwrap();
        assert_eq!(result.cleaned_data[0]["c"], Cell::Text("paris".to_string()));
        assert!(result.summary.contextual_issues_fixed.is_none());
    }

    // -------------------------------------------------------------------------
    // Validation, cancellation and progress
    // -------------------------------------------------------------------------

    #[test]
    fn test_invalid_dataset_is_rejected() {
        let data = dataset(&["a", "a"], vec![]);
        let err = Pipeline::builder()
            .build()
            .unwrap()
            .process(&data, &profiles::general())
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATASET");
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let data = dataset(&["a"], vec![row(&[("a", Cell::Number(1.0))])]);
        let mut profile = profiles::general();
        profile.id = String::new();

        let err = Pipeline::builder().build().unwrap().process(&data, &profile).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PROFILE");
    }

    #[test]
    fn test_cancelled_before_first_stage() {
        let token = CancellationToken::new();
        token.cancel();
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();

        let pipeline = Pipeline::builder()
            .cancellation_token(token)
            .on_progress(move |update| sink.lock().unwrap().push(update.stage))
            .build()
            .unwrap();
        let data = dataset(&["a"], vec![row(&[("a", Cell::Number(1.0))])]);

        let err = pipeline.process(&data, &profiles::general()).unwrap_err();
        assert!(err.is_cancelled());

        let stages = updates.lock().unwrap();
        assert_eq!(stages.last(), Some(&CleaningStage::Cancelled));
        assert!(!stages.contains(&CleaningStage::MissingValues));
    }

    #[test]
    fn test_cancelled_between_stages_stops_the_run() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();

        let pipeline = Pipeline::builder()
            .cancellation_token(token)
            .on_progress(move |update| {
                if update.stage == CleaningStage::MissingValues && update.stage_progress >= 1.0 {
                    trigger.cancel();
                }
                sink.lock().unwrap().push(update.stage);
            })
            .build()
            .unwrap();
        let data = dataset(
            &["a"],
            vec![
                row(&[("a", Cell::Number(1.0))]),
                row(&[("a", Cell::Null)]),
            ],
        );

        let err = pipeline.process(&data, &profiles::general()).unwrap_err();
        assert!(matches!(err, CleaningError::Cancelled));

        let stages = updates.lock().unwrap();
        assert!(stages.contains(&CleaningStage::MissingValues));
        for stage in &CleaningStage::PIPELINE_ORDER[1..] {
            assert!(!stages.contains(stage), "{:?} ran after cancel", stage);
        }
        assert_eq!(stages.last(), Some(&CleaningStage::Cancelled));
    }

    #[test]
    fn test_progress_reports_every_stage_then_complete() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stages = Arc::new(Mutex::new(Vec::new()));
        let (calls_clone, stages_clone) = (calls.clone(), stages.clone());

        let pipeline = Pipeline::builder()
            .on_progress(move |update| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                stages_clone.lock().unwrap().push(update.stage);
            })
            .build()
            .unwrap();
        let data = dataset(&["a"], vec![row(&[("a", Cell::Number(1.0))])]);
        pipeline.process(&data, &profiles::general()).unwrap();

        let stages = stages.lock().unwrap();
        assert_eq!(stages.last(), Some(&CleaningStage::Complete));
        for stage in CleaningStage::PIPELINE_ORDER {
            assert!(stages.contains(&stage), "missing {:?}", stage);
        }
        // initializing + two per stage + complete
        assert_eq!(calls.load(Ordering::SeqCst), 1 + 2 * CleaningStage::PIPELINE_ORDER.len() + 1);
    }

    #[test]
    fn test_non_processing_stage_is_an_invariant_violation() {
        let pipeline = Pipeline::builder().build().unwrap();
        let data = dataset(&["a"], vec![]);
        let profile = profiles::general();
        let options = CleaningOptions::default();
        let state = PipelineState::new(&data, &profile, &options);

        let err = pipeline.run_stage(CleaningStage::Complete, &state).unwrap_err();
        assert_eq!(err.error_code(), "INVARIANT_VIOLATION");
    }
}
