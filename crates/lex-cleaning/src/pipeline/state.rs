//! State threaded through the cleaning stages.

use crate::config::CleaningOptions;
use crate::types::{
    CleaningProfile, CleaningResult, ContextualStats, Dataset, DuplicateStats, Issue,
    MissingValueStats, OutlierStats, Row,
};

/// Everything a stage may read. Inputs are borrowed and never mutated.
#[derive(Debug)]
pub struct PipelineState<'a> {
    pub dataset: &'a Dataset,
    pub profile: &'a CleaningProfile,
    pub options: &'a CleaningOptions,
    pub cleaned_data: Vec<Row>,
    /// Current column names; position `i` is the current name of `dataset.headers[i]`.
    pub headers: Vec<String>,
    pub missing_values_fixed: MissingValueStats,
    pub outliers_detected: OutlierStats,
    pub duplicates_removed: DuplicateStats,
    pub columns_standardized: usize,
    /// `None` until the contextual stage actually runs.
    pub llm_cleaning_stats: Option<ContextualStats>,
    pub issues: Vec<Issue>,
    pub warnings: Vec<String>,
    pub result: Option<CleaningResult>,
}

/// Fields a stage wants to replace. `None` leaves the state field untouched.
#[derive(Debug, Default)]
pub struct StateUpdate {
    pub cleaned_data: Option<Vec<Row>>,
    pub headers: Option<Vec<String>>,
    pub missing_values_fixed: Option<MissingValueStats>,
    pub outliers_detected: Option<OutlierStats>,
    pub duplicates_removed: Option<DuplicateStats>,
    pub columns_standardized: Option<usize>,
    pub llm_cleaning_stats: Option<ContextualStats>,
    pub issues: Option<Vec<Issue>>,
    pub warnings: Option<Vec<String>>,
    pub result: Option<CleaningResult>,
}

impl<'a> PipelineState<'a> {
    /// Fresh state: zeroed counters and a private copy of the rows.
    pub fn new(
        dataset: &'a Dataset,
        profile: &'a CleaningProfile,
        options: &'a CleaningOptions,
    ) -> Self {
        Self {
            dataset,
            profile,
            options,
            cleaned_data: dataset.rows.clone(),
            headers: dataset.headers.clone(),
            missing_values_fixed: MissingValueStats::default(),
            outliers_detected: OutlierStats::default(),
            duplicates_removed: DuplicateStats::default(),
            columns_standardized: 0,
            llm_cleaning_stats: None,
            issues: Vec::new(),
            warnings: Vec::new(),
            result: None,
        }
    }

    /// Merge a stage's output by field replacement.
    pub fn merge(&mut self, update: StateUpdate) {
        let StateUpdate {
            cleaned_data,
            headers,
            missing_values_fixed,
            outliers_detected,
            duplicates_removed,
            columns_standardized,
            llm_cleaning_stats,
            issues,
            warnings,
            result,
        } = update;

        if let Some(v) = cleaned_data {
            self.cleaned_data = v;
        }
        if let Some(v) = headers {
            self.headers = v;
        }
        if let Some(v) = missing_values_fixed {
            self.missing_values_fixed = v;
        }
        if let Some(v) = outliers_detected {
            self.outliers_detected = v;
        }
        if let Some(v) = duplicates_removed {
            self.duplicates_removed = v;
        }
        if let Some(v) = columns_standardized {
            self.columns_standardized = v;
        }
        if let Some(v) = llm_cleaning_stats {
            self.llm_cleaning_stats = Some(v);
        }
        if let Some(v) = issues {
            self.issues = v;
        }
        if let Some(v) = warnings {
            self.warnings = v;
        }
        if let Some(v) = result {
            self.result = Some(v);
        }
    }
}
