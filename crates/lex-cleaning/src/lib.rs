//! Dataset Cleaning Pipeline Library
//!
//! An LLM-optional cleaning library for tabular datasets.
//!
//! # Overview
//!
//! A run threads an accumulating state through a fixed sequence of stages:
//!
//! - **Missing values**: drop incomplete rows, impute mean/mode, or replace with a constant
//! - **Outliers**: z-score detection with flag, remove or cap treatment
//! - **Deduplication**: exact duplicate rows, first occurrence kept
//! - **Column standardization**: `First Name` → `first_name`
//! - **Contextual correction**: optional LLM correction of free-text cells
//! - **Issue report**: per-column issue list in a fixed order
//!
//! Besides cleaning, the [`analysis`] module gives an advisory domain
//! recommendation and quality assessment, with a rule-based fallback.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_cleaning::{CleaningOptions, MissingValueStrategy, Pipeline, load_dataset, profiles};
//! use lex_cleaning::ai::OpenRouterProvider;
//! use std::sync::Arc;
//!
//! let dataset = load_dataset("customers.csv")?;
//!
//! // Option 1: deterministic stages only
//! let result = Pipeline::builder()
//!     .build()?
//!     .process(&dataset, &profiles::general())?;
//!
//! // Option 2: with LLM correction and progress reporting
//! let options = CleaningOptions::builder()
//!     .handle_missing_values(MissingValueStrategy::Impute)
//!     .llm_contextual_cleaning(true)
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .options(options)
//!     .correction_provider(Arc::new(OpenRouterProvider::new(api_key)?))
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(&dataset, &profiles::find("marketing").unwrap())?;
//!
//! println!("{} -> {} rows", result.summary.rows_processed, result.summary.rows_remaining);
//! ```
//!
//! # AI Providers
//!
//! LLM backends implement [`ai::CorrectionProvider`] (text correction) and
//! [`ai::AnalysisProvider`] (dataset assessment). Implemented providers:
//!
//! - [`ai::OpenRouterProvider`] - OpenRouter API (supports multiple LLM models)
//! - [`ai::GeminiProvider`] - Google Gemini API
//!
//! Failed correction batches never fail a run; they are skipped and reported
//! in [`CleaningResult::warnings`].
//!
//! # Cancellation
//!
//! ```rust,ignore
//! use lex_cleaning::{CancellationToken, CleaningError, Pipeline};
//!
//! let token = CancellationToken::new();
//! let token_for_cancel = token.clone();
//! std::thread::spawn(move || token_for_cancel.cancel());
//!
//! match Pipeline::builder().cancellation_token(token).build()?.process(&dataset, &profile) {
//!     Ok(result) => println!("Success!"),
//!     Err(CleaningError::Cancelled) => println!("Cancelled by user"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

pub mod ai;
pub mod analysis;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod profiles;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use analysis::{DatasetAnalysisResult, DatasetAnalyzer, DomainAssessment, RuleBasedAdvisor};
pub use config::{
    CleaningOptions, CleaningOptionsBuilder, ConfigValidationError, MissingValueStrategy,
    OutlierStrategy,
};
pub use error::{CleaningError, ResultExt};
pub use loader::{load_dataset, parse_csv, parse_json};
pub use pipeline::{
    CancellationToken, CleaningStage, ClosureProgressReporter, Pipeline, PipelineBuilder,
    ProgressReporter, ProgressUpdate,
};
pub use reporting::{IssueAggregator, to_csv_string, to_json_string, write_cleaned, write_report};
pub use types::{
    Cell, CleaningProfile, CleaningResult, CleaningSummary, ColumnTally, ContextualStats, Dataset,
    Domain, DuplicateStats, Issue, IssueKind, MissingValueStats, OutlierStats, Row, Rule,
};
pub use utils::ColumnKind;
