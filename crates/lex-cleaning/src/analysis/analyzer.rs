use super::{
    AnalysisMetrics, AssessmentSource, DatasetAnalysisResult, DatasetOverview, DomainAssessment,
    RuleBasedAdvisor,
};
use crate::ai::AnalysisProvider;
use crate::error::{CleaningError, Result};
use crate::types::Dataset;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Produces advisory assessments of a dataset.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::analysis::DatasetAnalyzer;
///
/// let result = DatasetAnalyzer::new().analyze(&dataset)?;
/// println!("{} ({:.0}%)", result.assessment.recommended_domain, result.assessment.confidence * 100.0);
/// ```
#[derive(Default)]
pub struct DatasetAnalyzer {
    provider: Option<Arc<dyn AnalysisProvider>>,
}

impl DatasetAnalyzer {
    /// Analyzer that only uses the rule-based advisor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consult `provider` first, falling back to rules on failure.
    pub fn with_provider(provider: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub fn analyze(&self, dataset: &Dataset) -> Result<DatasetAnalysisResult> {
        if dataset.headers.is_empty() {
            return Err(CleaningError::InvalidDataset(
                "dataset has no columns".to_string(),
            ));
        }

        let overview = DatasetOverview::from_dataset(dataset);
        let (assessment, source) = self.assess(&overview);

        info!(
            "Dataset analysis: {} (confidence {:.2}, source {:?})",
            assessment.recommended_domain, assessment.confidence, source
        );

        let now = Utc::now();
        let analysis_metrics = AnalysisMetrics {
            missing_value_ratio: overview.missing_value_ratio,
            duplicate_rows_estimate: overview.duplicate_rows_estimate,
            anomaly_score: assessment.data_quality_assessment.accuracy_score,
            format_consistency_score: assessment.data_quality_assessment.consistency_score,
        };

        Ok(DatasetAnalysisResult {
            assessment,
            analysis_metrics,
            source,
            trace_id: format!("analysis-{}", now.timestamp_millis()),
            analyzed_at: now.to_rfc3339(),
        })
    }

    fn assess(&self, overview: &DatasetOverview) -> (DomainAssessment, AssessmentSource) {
        let Some(provider) = &self.provider else {
            return (RuleBasedAdvisor::assess(overview), AssessmentSource::Rules);
        };

        match provider.assess(overview) {
            Ok(assessment) => match assessment.validate() {
                Ok(()) => (assessment, AssessmentSource::Ai),
                Err(e) => {
                    warn!("{} returned an invalid assessment ({}), using rules", provider.name(), e);
                    (RuleBasedAdvisor::assess(overview), AssessmentSource::Rules)
                }
            },
            Err(e) => {
                warn!("{} analysis failed: {}, using rules", provider.name(), e);
                (RuleBasedAdvisor::assess(overview), AssessmentSource::Rules)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::QualityAssessment;
    use crate::types::{Cell, Domain, Row};

    struct FixedAnalysis(Option<DomainAssessment>);

    impl AnalysisProvider for FixedAnalysis {
        fn assess(&self, _overview: &DatasetOverview) -> anyhow::Result<DomainAssessment> {
            self.0.clone().ok_or_else(|| anyhow::anyhow!("quota exceeded"))
        }

        fn name(&self) -> &str {
            "Fixed"
        }
    }

    fn dataset() -> Dataset {
        let rows: Vec<Row> = (0..4)
            .map(|i| {
                [
                    ("transaction_id".to_string(), Cell::Number(i as f64)),
                    ("amount".to_string(), Cell::Number(10.0 * i as f64)),
                ]
                .into_iter()
                .collect()
            })
            .collect();
        Dataset::new(vec!["transaction_id".to_string(), "amount".to_string()], rows)
    }

    fn ai_assessment(confidence: f64) -> DomainAssessment {
        DomainAssessment {
            recommended_domain: Domain::Marketing,
            confidence,
            reasoning: "model".to_string(),
            suggested_cleaning_actions: vec![],
            data_quality_assessment: QualityAssessment {
                completeness_score: 9.0,
                accuracy_score: 4.0,
                consistency_score: 6.0,
                overall_quality_score: 6.3,
            },
            potential_use_case: String::new(),
            risk_factors: vec![],
        }
    }

    #[test]
    fn test_rules_without_provider() {
        let result = DatasetAnalyzer::new().analyze(&dataset()).unwrap();
        assert_eq!(result.source, AssessmentSource::Rules);
        assert_eq!(result.assessment.recommended_domain, Domain::Finance);
        assert_eq!(result.analysis_metrics.missing_value_ratio, 0.0);
    }

    #[test]
    fn test_provider_assessment_is_used() {
        let analyzer = DatasetAnalyzer::with_provider(Arc::new(FixedAnalysis(Some(ai_assessment(0.7)))));
        let result = analyzer.analyze(&dataset()).unwrap();

        assert_eq!(result.source, AssessmentSource::Ai);
        assert_eq!(result.assessment.recommended_domain, Domain::Marketing);
        assert_eq!(result.analysis_metrics.anomaly_score, 4.0);
        assert_eq!(result.analysis_metrics.format_consistency_score, 6.0);
    }

    #[test]
    fn test_falls_back_when_provider_fails() {
        let analyzer = DatasetAnalyzer::with_provider(Arc::new(FixedAnalysis(None)));
        let result = analyzer.analyze(&dataset()).unwrap();
        assert_eq!(result.source, AssessmentSource::Rules);
        assert_eq!(result.assessment.recommended_domain, Domain::Finance);
    }

    #[test]
    fn test_falls_back_on_invalid_assessment() {
        let analyzer = DatasetAnalyzer::with_provider(Arc::new(FixedAnalysis(Some(ai_assessment(3.0)))));
        let result = analyzer.analyze(&dataset()).unwrap();
        assert_eq!(result.source, AssessmentSource::Rules);
    }

    #[test]
    fn test_result_json_is_flat() {
        let result = DatasetAnalyzer::new().analyze(&dataset()).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("recommendedDomain").is_some());
        assert!(json["analysisMetrics"].get("duplicateRowsEstimate").is_some());
        assert!(json.get("analyzedAt").is_some());
    }

    #[test]
    fn test_rejects_dataset_without_columns() {
        let err = DatasetAnalyzer::new().analyze(&Dataset::default()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATASET");
    }
}
