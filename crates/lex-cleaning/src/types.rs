use crate::error::{CleaningError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// Maximum number of insights kept in [`ContextualStats`].
pub const MAX_INSIGHTS: usize = 10;

/// Maximum number of examples kept per column in [`ContextualStats`].
pub const MAX_EXAMPLES_PER_COLUMN: usize = 5;

/// A single scalar value of a dataset.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Render a number the way spreadsheets do: integral values without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Number(n) => f.write_str(&format_number(*n)),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

// Integral numbers serialize as JSON integers so `1` round-trips as `1`, not `1.0`.
impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Cell::Null => serializer.serialize_unit(),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

/// One record: column name to cell.
pub type Row = IndexMap<String, Cell>;

/// An in-memory tabular dataset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub headers: Vec<String>,
    #[serde(alias = "data")]
    pub rows: Vec<Row>,
    #[serde(default, alias = "size")]
    pub size_bytes: u64,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            headers,
            rows,
            size_bytes: 0,
        }
    }

    pub fn with_size_bytes(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Cells of one column in row order.
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Cell> + 'a {
        self.rows.iter().filter_map(move |row| row.get(name))
    }

    /// Check the header/row invariants.
    pub fn validate(&self) -> Result<()> {
        if self.headers.is_empty() {
            return Err(CleaningError::InvalidDataset(
                "dataset has no columns".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.headers.len());
        for header in &self.headers {
            if header.trim().is_empty() {
                return Err(CleaningError::InvalidDataset(
                    "column names must not be blank".to_string(),
                ));
            }
            if !seen.insert(header.as_str()) {
                return Err(CleaningError::InvalidDataset(format!(
                    "duplicate column '{}'",
                    header
                )));
            }
        }

        for (index, row) in self.rows.iter().enumerate() {
            let keys_match = row.len() == seen.len() && row.keys().all(|k| seen.contains(k.as_str()));
            if !keys_match {
                return Err(CleaningError::InvalidDataset(format!(
                    "row {} does not match the dataset headers",
                    index
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    #[default]
    General,
    Finance,
    Healthcare,
    Marketing,
    Hr,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Finance => "finance",
            Self::Healthcare => "healthcare",
            Self::Marketing => "marketing",
            Self::Hr => "hr",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Missing,
    Outlier,
    Duplicate,
    Format,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulePriority {
    High,
    Medium,
    Low,
}

/// A declared cleaning rule. Rules are carried through a run but not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub action: String,
    pub priority: RulePriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Rule {
    pub fn new(kind: RuleKind, action: impl Into<String>, priority: RulePriority) -> Self {
        Self {
            kind,
            action: action.into(),
            priority,
            columns: None,
            parameters: None,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }
}

/// A named bundle of domain context and cleaning rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domain: Domain,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl CleaningProfile {
    /// Check the profile against the dataset it will be applied to.
    ///
    /// Rules naming unknown columns are reported but do not fail the run.
    pub fn validate(&self, dataset: &Dataset) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CleaningError::InvalidProfile(
                "profile id must not be empty".to_string(),
            ));
        }

        for rule in &self.rules {
            for column in rule.columns.iter().flatten() {
                if !dataset.headers.contains(column) {
                    warn!(
                        "Profile '{}' rule '{}' references unknown column '{}'",
                        self.id, rule.action, column
                    );
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Missing,
    Outlier,
    Duplicate,
    Format,
    Contextual,
    Custom,
}

/// One line of the cleaning report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub column: String,
    pub count: usize,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
}

impl Issue {
    pub fn new(kind: IssueKind, column: impl Into<String>, count: usize, action: impl Into<String>) -> Self {
        Self {
            kind,
            column: column.into(),
            count,
            action: action.into(),
            examples: None,
        }
    }

    pub fn with_examples(mut self, examples: Vec<String>) -> Self {
        self.examples = Some(examples);
        self
    }
}

/// Per-column counters in first-recorded order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnTally(IndexMap<String, usize>);

impl ColumnTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, column: &str, by: usize) {
        if by == 0 {
            return;
        }
        *self.0.entry(column.to_string()).or_insert(0) += by;
    }

    pub fn get(&self, column: &str) -> usize {
        self.0.get(column).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingValueStats {
    pub count: usize,
    pub columns: ColumnTally,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierStats {
    pub count: usize,
    pub columns: ColumnTally,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicateStats {
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnIssues {
    pub count: usize,
    pub examples: Vec<String>,
}

/// Accumulated output of the contextual correction stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualStats {
    pub fields_processed: usize,
    pub contextual_issues_fixed: usize,
    pub anomalies_detected: usize,
    pub batches_failed: usize,
    pub insights: Vec<String>,
    pub column_issues: IndexMap<String, ColumnIssues>,
}

impl ContextualStats {
    /// Count a fixed issue for `column`; the example is kept while under the cap.
    pub fn record_fix(&mut self, column: &str, example: String) {
        self.contextual_issues_fixed += 1;
        let entry = self.column_issues.entry(column.to_string()).or_default();
        entry.count += 1;
        if entry.examples.len() < MAX_EXAMPLES_PER_COLUMN {
            entry.examples.push(example);
        }
    }

    pub fn add_insight(&mut self, insight: String) {
        if self.insights.len() < MAX_INSIGHTS {
            self.insights.push(insight);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningSummary {
    pub rows_processed: usize,
    pub rows_remaining: usize,
    pub missing_values_fixed: usize,
    pub outliers_detected: usize,
    pub duplicates_removed: usize,
    pub columns_standardized: usize,
    /// Fields the LLM returned a cleaned value for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_cleaning_applied: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contextual_issues_fixed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomalies_detected: Option<usize>,
}

/// Final output of a cleaning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningResult {
    pub cleaned_data: Vec<Row>,
    pub headers: Vec<String>,
    pub summary: CleaningSummary,
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_insights: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub profile_id: String,
    pub processed_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Cell)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_cell_deserializes_untagged() {
        let cells: Vec<Cell> = serde_json::from_str(r#"[null, true, 3, 2.5, "x"]"#).unwrap();
        assert_eq!(
            cells,
            vec![
                Cell::Null,
                Cell::Bool(true),
                Cell::Number(3.0),
                Cell::Number(2.5),
                Cell::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_cell_serializes_integral_numbers_without_fraction() {
        let json = serde_json::to_string(&vec![Cell::Number(3.0), Cell::Number(2.5)]).unwrap();
        assert_eq!(json, "[3,2.5]");
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Null.to_string(), "");
        assert_eq!(Cell::Number(42.0).to_string(), "42");
        assert_eq!(Cell::Number(-0.5).to_string(), "-0.5");
        assert_eq!(Cell::Bool(false).to_string(), "false");
        assert_eq!(Cell::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_dataset_validate_accepts_matching_rows() {
        let dataset = Dataset::new(
            vec!["a".to_string(), "b".to_string()],
            vec![row(&[("a", Cell::Number(1.0)), ("b", Cell::Null)])],
        );
        assert!(dataset.validate().is_ok());
    }

    #[test]
    fn test_dataset_validate_rejects_mismatched_row() {
        let dataset = Dataset::new(
            vec!["a".to_string(), "b".to_string()],
            vec![row(&[("a", Cell::Number(1.0))])],
        );
        let err = dataset.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATASET");
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn test_dataset_validate_rejects_duplicate_headers() {
        let dataset = Dataset::new(vec!["a".to_string(), "a".to_string()], vec![]);
        assert!(dataset.validate().is_err());
        assert!(Dataset::default().validate().is_err());
    }

    #[test]
    fn test_dataset_accepts_original_field_names() {
        let json = r#"{"headers": ["a"], "data": [{"a": 1}], "size": 12}"#;
        let dataset: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.rows.len(), 1);
        assert_eq!(dataset.size_bytes, 12);
    }

    #[test]
    fn test_profile_validate_requires_id() {
        let profile = CleaningProfile {
            id: "  ".to_string(),
            name: "Blank".to_string(),
            description: String::new(),
            domain: Domain::General,
            rules: vec![],
        };
        let dataset = Dataset::new(vec!["a".to_string()], vec![]);
        assert_eq!(
            profile.validate(&dataset).unwrap_err().error_code(),
            "INVALID_PROFILE"
        );
    }

    #[test]
    fn test_rule_json_uses_type_key() {
        let rule = Rule::new(RuleKind::Format, "standardize", RulePriority::High)
            .with_parameter("decimals", serde_json::json!(2));
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["type"], "format");
        assert_eq!(json["parameters"]["decimals"], 2);
    }

    #[test]
    fn test_column_tally_keeps_first_recorded_order() {
        let mut tally = ColumnTally::new();
        tally.increment("b", 2);
        tally.increment("a", 1);
        tally.increment("b", 1);
        tally.increment("c", 0);

        let entries: Vec<_> = tally.iter().collect();
        assert_eq!(entries, vec![("b", 3), ("a", 1)]);
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.get("c"), 0);
    }

    #[test]
    fn test_contextual_stats_caps() {
        let mut stats = ContextualStats::default();
        for i in 0..8 {
            stats.record_fix("city", format!("example {}", i));
        }
        for i in 0..12 {
            stats.add_insight(format!("insight {}", i));
        }

        assert_eq!(stats.contextual_issues_fixed, 8);
        assert_eq!(stats.column_issues["city"].count, 8);
        assert_eq!(stats.column_issues["city"].examples.len(), MAX_EXAMPLES_PER_COLUMN);
        assert_eq!(stats.insights.len(), MAX_INSIGHTS);
    }

    #[test]
    fn test_issue_serialization_omits_empty_examples() {
        let issue = Issue::new(IssueKind::Duplicate, "multiple", 2, "removed");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "duplicate", "column": "multiple", "count": 2, "action": "removed"})
        );
    }
}
