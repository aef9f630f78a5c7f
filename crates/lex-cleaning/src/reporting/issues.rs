use crate::config::CleaningOptions;
use crate::types::{ContextualStats, DuplicateStats, Issue, IssueKind, MissingValueStats, OutlierStats};

/// Column label used for dataset-wide issues.
pub const MULTIPLE_COLUMNS: &str = "multiple";

const DUPLICATE_ACTION: &str = "removed";
const CONTEXTUAL_ACTION: &str = "fixed with LLM";

/// Turns accumulated stage statistics into the report's issue list.
pub struct IssueAggregator;

impl IssueAggregator {
    /// Build issues in report order: missing, outliers, duplicates, contextual.
    ///
    /// Columns keep the order in which the stages first recorded them and
    /// columns with a zero count are left out.
    pub fn aggregate(
        options: &CleaningOptions,
        missing: &MissingValueStats,
        outliers: &OutlierStats,
        duplicates: &DuplicateStats,
        contextual: Option<&ContextualStats>,
    ) -> Vec<Issue> {
        let mut issues = Vec::new();

        let missing_action = options.handle_missing_values.action_label();
        issues.extend(
            missing
                .columns
                .iter()
                .filter(|(_, count)| *count > 0)
                .map(|(column, count)| Issue::new(IssueKind::Missing, column, count, missing_action)),
        );

        let outlier_action = options.handle_outliers.action_label();
        issues.extend(
            outliers
                .columns
                .iter()
                .filter(|(_, count)| *count > 0)
                .map(|(column, count)| Issue::new(IssueKind::Outlier, column, count, outlier_action)),
        );

        if duplicates.count > 0 {
            issues.push(Issue::new(
                IssueKind::Duplicate,
                MULTIPLE_COLUMNS,
                duplicates.count,
                DUPLICATE_ACTION,
            ));
        }

        if let Some(contextual) = contextual {
            issues.extend(
                contextual
                    .column_issues
                    .iter()
                    .filter(|(_, entry)| entry.count > 0)
                    .map(|(column, entry)| {
                        Issue::new(IssueKind::Contextual, column, entry.count, CONTEXTUAL_ACTION)
                            .with_examples(entry.examples.clone())
                    }),
            );
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MissingValueStrategy, OutlierStrategy};
    use crate::types::ColumnTally;
    use pretty_assertions::assert_eq;

    fn tally(pairs: &[(&str, usize)]) -> ColumnTally {
        let mut tally = ColumnTally::new();
        for (column, count) in pairs {
            tally.increment(column, *count);
        }
        tally
    }

    #[test]
    fn test_empty_stats_produce_no_issues() {
        let issues = IssueAggregator::aggregate(
            &CleaningOptions::default(),
            &MissingValueStats::default(),
            &OutlierStats::default(),
            &DuplicateStats::default(),
            None,
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_issue_order_and_actions() {
        let options = CleaningOptions {
            handle_missing_values: MissingValueStrategy::Impute,
            handle_outliers: OutlierStrategy::Cap,
            ..Default::default()
        };
        let missing = MissingValueStats {
            count: 3,
            columns: tally(&[("b", 1), ("a", 2)]),
        };
        let outliers = OutlierStats {
            count: 1,
            columns: tally(&[("price", 1)]),
        };
        let mut contextual = ContextualStats::default();
        contextual.record_fix("city", "\"pariss\" → \"Paris\": typo".to_string());

        let issues = IssueAggregator::aggregate(
            &options,
            &missing,
            &outliers,
            &DuplicateStats { count: 4 },
            Some(&contextual),
        );

        assert_eq!(
            issues,
            vec![
                Issue::new(IssueKind::Missing, "b", 1, "imputed with mean/mode"),
                Issue::new(IssueKind::Missing, "a", 2, "imputed with mean/mode"),
                Issue::new(IssueKind::Outlier, "price", 1, "capped"),
                Issue::new(IssueKind::Duplicate, "multiple", 4, "removed"),
                Issue::new(IssueKind::Contextual, "city", 1, "fixed with LLM")
                    .with_examples(vec!["\"pariss\" → \"Paris\": typo".to_string()]),
            ]
        );
    }

    #[test]
    fn test_default_action_labels() {
        let missing = MissingValueStats {
            count: 1,
            columns: tally(&[("a", 1)]),
        };
        let outliers = OutlierStats {
            count: 1,
            columns: tally(&[("a", 1)]),
        };
        let issues = IssueAggregator::aggregate(
            &CleaningOptions::default(),
            &missing,
            &outliers,
            &DuplicateStats::default(),
            None,
        );

        assert_eq!(issues[0].action, "rows dropped");
        assert_eq!(issues[1].action, "flagged");
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_issue_serializes_type_field() {
        let issue = Issue::new(IssueKind::Duplicate, MULTIPLE_COLUMNS, 2, "removed");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "duplicate");
        assert!(json.get("examples").is_none());
    }
}
