//! Progress reporting and cancellation support for the cleaning pipeline.
//!
//! This module provides types for tracking pipeline progress and supporting
//! cancellation from external threads (e.g., a UI cancel button or Ctrl-C).
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_cleaning::{Pipeline, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     token_clone.cancel();
//! });
//!
//! let result = Pipeline::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .process(&dataset, &profile);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of the cleaning pipeline.
///
/// The processing stages run in the order given by
/// [`CleaningStage::PIPELINE_ORDER`]; the remaining variants describe
/// the run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Validating input and building the initial state
    Initializing,
    /// Dropping, imputing or replacing null cells
    MissingValues,
    /// Detecting and treating numeric outliers
    Outliers,
    /// Removing duplicate rows
    Deduplication,
    /// Normalizing column names
    Standardization,
    /// LLM correction of free-text cells
    ContextualCorrection,
    /// Building the issue list
    IssueReport,
    /// Packaging the final result
    PrepareResult,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline was cancelled by user
    Cancelled,
    /// Pipeline failed with an error
    Failed,
}

impl CleaningStage {
    /// The fixed stage topology of a run.
    pub const PIPELINE_ORDER: [CleaningStage; 7] = [
        CleaningStage::MissingValues,
        CleaningStage::Outliers,
        CleaningStage::Deduplication,
        CleaningStage::Standardization,
        CleaningStage::ContextualCorrection,
        CleaningStage::IssueReport,
        CleaningStage::PrepareResult,
    ];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::MissingValues => "Handling Missing Values",
            Self::Outliers => "Handling Outliers",
            Self::Deduplication => "Removing Duplicates",
            Self::Standardization => "Standardizing Columns",
            Self::ContextualCorrection => "Contextual Correction",
            Self::IssueReport => "Building Issue Report",
            Self::PrepareResult => "Preparing Result",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Returns the typical weight of this stage in the overall pipeline (0.0 - 1.0).
    ///
    /// The contextual stage dominates because it makes network calls.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.02,
            Self::MissingValues => 0.10,
            Self::Outliers => 0.10,
            Self::Deduplication => 0.08,
            Self::Standardization => 0.03,
            Self::ContextualCorrection => 0.60,
            Self::IssueReport => 0.04,
            Self::PrepareResult => 0.03,
            Self::Complete => 0.0,
            Self::Cancelled => 0.0,
            Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::MissingValues => 0.02,
            Self::Outliers => 0.12,
            Self::Deduplication => 0.22,
            Self::Standardization => 0.30,
            Self::ContextualCorrection => 0.33,
            Self::IssueReport => 0.93,
            Self::PrepareResult => 0.97,
            Self::Complete => 1.0,
            Self::Cancelled => 0.0,
            Self::Failed => 0.0,
        }
    }
}

/// Progress update with optional sub-stage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: CleaningStage,

    /// Optional sub-stage description (e.g., "Column: city")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,

    /// Number of items processed in current stage (for iterative operations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    /// Total items in current stage (for iterative operations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage without sub-stage info.
    pub fn new(stage: CleaningStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a new progress update with item counts.
    pub fn with_items(
        stage: CleaningStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: Some(sub_stage.into()),
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: Some(current),
            items_total: Some(total),
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::terminal(CleaningStage::Complete, 1.0, message)
    }

    /// Creates a cancelled progress update.
    pub fn cancelled() -> Self {
        Self::terminal(CleaningStage::Cancelled, 0.0, "Pipeline cancelled by user")
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::terminal(CleaningStage::Failed, 0.0, message)
    }

    fn terminal(stage: CleaningStage, progress: f32, message: impl Into<String>) -> Self {
        Self {
            stage,
            sub_stage: None,
            progress,
            stage_progress: progress,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }
}

/// Trait for receiving progress updates during cleaning.
///
/// Implementations must be `Send + Sync`; the contextual stage may report
/// from the thread that runs the pipeline while batches are in flight.
pub trait ProgressReporter: Send + Sync {
    /// Called when progress is made. Should be cheap and non-blocking.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running pipeline.
///
/// Clones share one atomic flag. The pipeline checks it before every stage
/// and before every wave of correction batches, returning
/// [`CleaningError::Cancelled`](crate::error::CleaningError::Cancelled).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    /// Creates a new cancellation token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation of the pipeline. Callable from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_cancellation_token_clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();

        assert!(!token2.is_cancelled());
        token1.cancel();
        assert!(token2.is_cancelled());

        token2.reset();
        assert!(!token1.is_cancelled());
    }

    #[test]
    fn test_progress_update_with_items() {
        let update = ProgressUpdate::with_items(
            CleaningStage::ContextualCorrection,
            "Column: city",
            3,
            6,
            "Correcting city",
        );
        assert_eq!(update.sub_stage, Some("Column: city".to_string()));
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - (0.33 + 0.30)).abs() < 1e-5);
        assert_eq!(update.items_total, Some(6));
    }

    #[test]
    fn test_progress_update_terminal_states() {
        assert_eq!(ProgressUpdate::complete("Done").progress, 1.0);
        assert_eq!(ProgressUpdate::cancelled().stage, CleaningStage::Cancelled);
        assert_eq!(ProgressUpdate::failed("boom").message, "boom");
    }

    #[test]
    fn test_closure_progress_reporter() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(ProgressUpdate::new(CleaningStage::Outliers, 0.5, "Test"));
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stage_weights_sum() {
        let total_weight: f32 = CleaningStage::PIPELINE_ORDER
            .iter()
            .map(|s| s.weight())
            .sum::<f32>()
            + CleaningStage::Initializing.weight();
        assert!((total_weight - 1.0).abs() < 0.01, "Weights should sum to ~1.0");
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        let mut expected = CleaningStage::Initializing.weight();
        for stage in CleaningStage::PIPELINE_ORDER {
            assert!(
                (stage.base_progress() - expected).abs() < 1e-5,
                "{:?} should start at {}",
                stage,
                expected
            );
            expected += stage.weight();
        }
    }

    #[test]
    fn test_stage_json_values() {
        let stage_expectations = [
            (CleaningStage::MissingValues, "\"missing_values\""),
            (CleaningStage::ContextualCorrection, "\"contextual_correction\""),
            (CleaningStage::PrepareResult, "\"prepare_result\""),
            (CleaningStage::Cancelled, "\"cancelled\""),
        ];

        for (stage, expected_json) in stage_expectations {
            let json = serde_json::to_string(&stage).expect("Should serialize");
            assert_eq!(json, expected_json);
        }
    }
}
