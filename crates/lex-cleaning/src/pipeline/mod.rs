//! Pipeline module.
//!
//! This module provides the cleaning pipeline, its stages and the state
//! threaded between them. Stages run in the fixed order of
//! [`CleaningStage::PIPELINE_ORDER`]:
//!
//! 1. [`missing`] - drop, impute or replace null cells
//! 2. [`outliers`] - z-score detection with flag/remove/cap
//! 3. [`dedup`] - exact duplicate row removal
//! 4. [`standardize`] - snake_case column names
//! 5. [`contextual`] - LLM correction of text cells (optional)
//!
//! followed by the issue report and result packaging.

mod builder;
pub mod contextual;
pub mod dedup;
pub mod missing;
pub mod outliers;
pub mod progress;
pub mod standardize;
pub mod state;

pub use builder::{Pipeline, PipelineBuilder};
pub use contextual::{ContextualCorrector, ContextualOutput};
pub use dedup::Deduplicator;
pub use missing::MissingValueResolver;
pub use outliers::{OutlierBounds, OutlierResolver};
pub use progress::{
    CancellationToken, CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
pub use standardize::{ColumnStandardizer, standardize_name};
pub use state::{PipelineState, StateUpdate};
