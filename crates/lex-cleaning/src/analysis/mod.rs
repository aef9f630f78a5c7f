//! Advisory dataset analysis.
//!
//! Produces a domain recommendation, quality scores and suggested cleaning
//! actions for a dataset before it is cleaned. The result is informational:
//! nothing here feeds the cleaning stages.
//!
//! An [`AnalysisProvider`](crate::ai::AnalysisProvider) is consulted when one
//! is configured; otherwise, or when it fails, [`RuleBasedAdvisor`] scores
//! the dataset from its column names and basic metrics.

mod advisor;
mod analyzer;
mod metrics;

pub use advisor::RuleBasedAdvisor;
pub use analyzer::DatasetAnalyzer;
pub use metrics::{analyze_columns, estimate_duplicates, missing_value_ratio};

use crate::types::{Domain, Row};
use crate::utils::ColumnKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Rows inspected per column for [`ColumnAnalysis`].
pub const COLUMN_SAMPLE_ROWS: usize = 10;

/// Rows included verbatim in a [`DatasetOverview`].
pub const OVERVIEW_SAMPLE_ROWS: usize = 5;

/// Rows scanned when estimating duplicates.
pub const DUPLICATE_SAMPLE_ROWS: usize = 1000;

/// Type and shape of one column, computed from the first rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnAnalysis {
    pub data_type: ColumnKind,
    pub null_percentage: f64,
    pub unique_values: usize,
    pub sample_values: Vec<crate::types::Cell>,
    /// Every non-null sampled value has the column's kind.
    pub consistent_type: bool,
}

/// What an analysis provider is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetOverview {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: IndexMap<String, ColumnAnalysis>,
    pub sample_rows: Vec<Row>,
    pub missing_value_ratio: f64,
    pub duplicate_rows_estimate: usize,
}

/// Quality scores on a 0-10 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityAssessment {
    pub completeness_score: f64,
    pub accuracy_score: f64,
    pub consistency_score: f64,
    pub overall_quality_score: f64,
}

/// A domain recommendation with quality scores and advice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainAssessment {
    pub recommended_domain: Domain,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub suggested_cleaning_actions: Vec<String>,
    pub data_quality_assessment: QualityAssessment,
    #[serde(default)]
    pub potential_use_case: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

/// Errors that can occur when validating a [`DomainAssessment`].
#[derive(Debug, thiserror::Error)]
pub enum AssessmentValidationError {
    #[error("Invalid confidence: {0} (must be between 0.0 and 1.0)")]
    InvalidConfidence(f64),

    #[error("Invalid {0}: {1} (must be between 0 and 10)")]
    InvalidScore(&'static str, f64),
}

impl DomainAssessment {
    /// Reject confidences outside [0, 1] and scores outside [0, 10].
    pub fn validate(&self) -> Result<(), AssessmentValidationError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(AssessmentValidationError::InvalidConfidence(self.confidence));
        }

        let quality = &self.data_quality_assessment;
        let scores = [
            ("completenessScore", quality.completeness_score),
            ("accuracyScore", quality.accuracy_score),
            ("consistencyScore", quality.consistency_score),
            ("overallQualityScore", quality.overall_quality_score),
        ];
        for (name, score) in scores {
            if !(0.0..=10.0).contains(&score) {
                return Err(AssessmentValidationError::InvalidScore(name, score));
            }
        }

        Ok(())
    }
}

/// Where an assessment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentSource {
    Ai,
    Rules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetrics {
    pub missing_value_ratio: f64,
    pub duplicate_rows_estimate: usize,
    pub anomaly_score: f64,
    pub format_consistency_score: f64,
}

/// Output of [`DatasetAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAnalysisResult {
    #[serde(flatten)]
    pub assessment: DomainAssessment,
    pub analysis_metrics: AnalysisMetrics,
    pub source: AssessmentSource,
    pub trace_id: String,
    pub analyzed_at: String,
}
