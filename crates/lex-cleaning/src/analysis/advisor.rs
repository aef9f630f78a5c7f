//! Rule-based dataset assessment.
//!
//! Used when no analysis provider is configured or the provider fails.

use super::{DatasetOverview, DomainAssessment, QualityAssessment};
use crate::pipeline::standardize::standardize_name;
use crate::types::Domain;
use crate::utils::ColumnKind;
use tracing::debug;

/// Column-name fragments that point to a domain.
const DOMAIN_KEYWORDS: [(Domain, &[&str]); 4] = [
    (
        Domain::Finance,
        &[
            "amount", "price", "revenue", "cost", "balance", "transaction", "account", "invoice",
            "payment", "budget", "tax", "profit", "currency", "expense",
        ],
    ),
    (
        Domain::Healthcare,
        &[
            "patient", "diagnosis", "medical", "blood", "heart", "bmi", "treatment", "hospital",
            "doctor", "symptom", "medication", "glucose", "cholesterol",
        ],
    ),
    (
        Domain::Marketing,
        &[
            "campaign", "click", "impression", "conversion", "customer", "channel", "ctr", "lead",
            "segment", "engagement", "email", "ad_",
        ],
    ),
    (
        Domain::Hr,
        &[
            "employee", "salary", "department", "hire", "position", "manager", "performance",
            "tenure", "job", "payroll", "leave", "attrition",
        ],
    ),
];

/// Below this many rows the sample is reported as a risk.
const SMALL_DATASET_ROWS: usize = 30;

/// Missing-value share reported as a risk.
const HIGH_MISSING_RATIO: f64 = 0.2;

/// Heuristic replacement for an [`AnalysisProvider`](crate::ai::AnalysisProvider).
pub struct RuleBasedAdvisor;

impl RuleBasedAdvisor {
    pub fn assess(overview: &DatasetOverview) -> DomainAssessment {
        let (domain, matched) = Self::detect_domain(overview.columns.keys().map(String::as_str));
        let quality = Self::score(overview);

        let confidence = if matched.is_empty() || overview.column_count == 0 {
            0.5
        } else {
            (0.5 + 0.5 * matched.len() as f64 / overview.column_count as f64).min(0.95)
        };

        let reasoning = if matched.is_empty() {
            "Rule-based assessment: no column names match a specific domain.".to_string()
        } else {
            format!(
                "Rule-based assessment: {} of {} column names match {} keywords ({}).",
                matched.len(),
                overview.column_count,
                domain,
                matched.join(", ")
            )
        };

        debug!("Rule-based domain: {} (confidence {:.2})", domain, confidence);

        DomainAssessment {
            recommended_domain: domain,
            confidence,
            reasoning,
            suggested_cleaning_actions: Self::suggest_actions(overview),
            data_quality_assessment: quality,
            potential_use_case: Self::use_case(domain).to_string(),
            risk_factors: Self::risk_factors(overview),
        }
    }

    /// Domain with the most matching column names; `General` when none match.
    ///
    /// Ties go to the domain listed first.
    pub fn detect_domain<'a>(headers: impl Iterator<Item = &'a str> + Clone) -> (Domain, Vec<&'a str>) {
        let mut best: (Domain, Vec<&str>) = (Domain::General, Vec::new());

        for (domain, keywords) in DOMAIN_KEYWORDS {
            let matched: Vec<&str> = headers
                .clone()
                .filter(|h| {
                    let name = h.to_lowercase();
                    keywords.iter().any(|k| name.contains(k))
                })
                .collect();
            if matched.len() > best.1.len() {
                best = (domain, matched);
            }
        }

        best
    }

    fn score(overview: &DatasetOverview) -> QualityAssessment {
        let completeness = 10.0 * (1.0 - overview.missing_value_ratio);

        let consistency = if overview.row_count == 0 {
            10.0
        } else {
            let duplicate_share = overview.duplicate_rows_estimate as f64 / overview.row_count as f64;
            10.0 * (1.0 - duplicate_share)
        };

        let accuracy = if overview.columns.is_empty() {
            10.0
        } else {
            let consistent = overview.columns.values().filter(|c| c.consistent_type).count();
            10.0 * consistent as f64 / overview.columns.len() as f64
        };

        let clamp = |v: f64| round1(v.clamp(0.0, 10.0));
        let (completeness, accuracy, consistency) = (clamp(completeness), clamp(accuracy), clamp(consistency));

        QualityAssessment {
            completeness_score: completeness,
            accuracy_score: accuracy,
            consistency_score: consistency,
            overall_quality_score: round1((completeness + accuracy + consistency) / 3.0),
        }
    }

    fn suggest_actions(overview: &DatasetOverview) -> Vec<String> {
        let mut actions = Vec::new();

        if overview.missing_value_ratio > 0.0 {
            actions.push(format!(
                "Handle missing values ({:.1}% of cells are empty)",
                overview.missing_value_ratio * 100.0
            ));
        }

        if overview.duplicate_rows_estimate > 0 {
            actions.push(format!(
                "Remove approximately {} duplicate rows",
                overview.duplicate_rows_estimate
            ));
        }

        if overview.columns.keys().any(|h| standardize_name(h) != *h) {
            actions.push("Standardize column names".to_string());
        }

        let numeric = Self::columns_of_kind(overview, ColumnKind::Numeric);
        if !numeric.is_empty() {
            actions.push(format!("Review numeric columns for outliers: {}", numeric.join(", ")));
        }

        let text = Self::columns_of_kind(overview, ColumnKind::Text);
        if !text.is_empty() {
            actions.push(format!("Check text formatting consistency in: {}", text.join(", ")));
        }

        actions
    }

    fn risk_factors(overview: &DatasetOverview) -> Vec<String> {
        let mut risks = Vec::new();

        if overview.missing_value_ratio > HIGH_MISSING_RATIO {
            risks.push("High proportion of missing values".to_string());
        }

        if overview.row_count < SMALL_DATASET_ROWS {
            risks.push(format!("Small sample size ({} rows)", overview.row_count));
        }

        let mixed: Vec<&str> = overview
            .columns
            .iter()
            .filter(|(_, c)| !c.consistent_type)
            .map(|(name, _)| name.as_str())
            .collect();
        if !mixed.is_empty() {
            risks.push(format!("Mixed value types in: {}", mixed.join(", ")));
        }

        risks
    }

    fn columns_of_kind(overview: &DatasetOverview, kind: ColumnKind) -> Vec<&str> {
        overview
            .columns
            .iter()
            .filter(|(_, c)| c.data_type == kind)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    fn use_case(domain: Domain) -> &'static str {
        match domain {
            Domain::General => "General-purpose reporting and exploratory analysis",
            Domain::Finance => "Financial reporting, budgeting and transaction analysis",
            Domain::Healthcare => "Clinical outcome tracking and patient analytics",
            Domain::Marketing => "Campaign performance and customer segmentation",
            Domain::Hr => "Workforce planning and employee performance analysis",
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, Dataset, Row};

    fn overview(headers: &[&str], rows: Vec<Vec<Cell>>) -> DatasetOverview {
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|cells| headers.iter().map(|h| h.to_string()).zip(cells).collect())
            .collect();
        let dataset = Dataset::new(headers.iter().map(|h| h.to_string()).collect(), rows);
        DatasetOverview::from_dataset(&dataset)
    }

    #[test]
    fn test_detect_domain_by_keywords() {
        let headers = ["Employee ID", "Department", "Salary", "Amount"];
        let (domain, matched) = RuleBasedAdvisor::detect_domain(headers.iter().copied());
        assert_eq!(domain, Domain::Hr);
        assert_eq!(matched, vec!["Employee ID", "Department", "Salary"]);
    }

    #[test]
    fn test_detect_domain_defaults_to_general() {
        let headers = ["x", "y"];
        let (domain, matched) = RuleBasedAdvisor::detect_domain(headers.iter().copied());
        assert_eq!(domain, Domain::General);
        assert!(matched.is_empty());
    }

    #[test]
    fn test_assessment_is_valid_and_scored() {
        let o = overview(
            &["patient", "Blood Pressure", "note"],
            vec![
                vec![Cell::from("a"), Cell::Number(120.0), Cell::Null],
                vec![Cell::from("b"), Cell::Number(130.0), Cell::from("ok")],
                vec![Cell::from("b"), Cell::Number(130.0), Cell::from("ok")],
            ],
        );

        let a = RuleBasedAdvisor::assess(&o);

        assert!(a.validate().is_ok());
        assert_eq!(a.recommended_domain, Domain::Healthcare);
        // 1 null of 9 cells
        assert_eq!(a.data_quality_assessment.completeness_score, 8.9);
        // 1 duplicate of 3 rows
        assert_eq!(a.data_quality_assessment.consistency_score, 6.7);
        assert_eq!(a.data_quality_assessment.accuracy_score, 10.0);
        assert!(a.suggested_cleaning_actions.iter().any(|s| s == "Standardize column names"));
        assert!(a.risk_factors.iter().any(|r| r.starts_with("Small sample size")));
    }

    #[test]
    fn test_empty_dataset_scores() {
        let o = overview(&["a"], vec![]);
        let a = RuleBasedAdvisor::assess(&o);
        assert!(a.validate().is_ok());
        assert_eq!(a.data_quality_assessment.overall_quality_score, 10.0);
    }
}
