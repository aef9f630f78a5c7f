//! Prompt construction and response parsing shared by the HTTP providers.

use super::provider::{CorrectionContext, CorrectionRequest, CorrectionResponse};
use crate::analysis::{DatasetOverview, DomainAssessment};
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

/// Temperature used for dataset analysis calls.
pub const ANALYSIS_TEMPERATURE: f32 = 0.2;

/// Token budget for dataset analysis calls.
pub const ANALYSIS_MAX_TOKENS: u32 = 1500;

const CORRECTION_FORMAT: &str = r#"Respond with a JSON array only, one element per input value:
[
  {
    "columnName": string,
    "rowIndex": number,
    "originalValue": string,
    "result": {
      "cleaned": boolean,
      "cleanedValue": string (omit when not cleaned),
      "issueDetected": boolean,
      "issueType": string (optional),
      "explanation": string (optional),
      "confidence": number between 0 and 1 (optional)
    }
  }
]"#;

const ANALYSIS_FORMAT: &str = r#"Respond with a JSON object only:
{
  "recommendedDomain": "general" | "finance" | "healthcare" | "marketing" | "hr",
  "confidence": number between 0 and 1,
  "reasoning": string,
  "suggestedCleaningActions": [string],
  "dataQualityAssessment": {
    "completenessScore": number between 0 and 10,
    "accuracyScore": number between 0 and 10,
    "consistencyScore": number between 0 and 10,
    "overallQualityScore": number between 0 and 10
  },
  "potentialUseCase": string,
  "riskFactors": [string]
}"#;

/// Build the prompt for one correction batch.
pub fn correction_prompt(batch: &[CorrectionRequest], context: &CorrectionContext) -> Result<String> {
    let column = batch.first().map_or("", |r| r.column_name.as_str());
    let values = serde_json::to_string(batch).context("Failed to serialize correction batch")?;

    let anomalies = if context.detect_anomalies {
        "- Report values that look wrong but cannot be fixed with issueDetected=true and cleaned=false\n"
    } else {
        ""
    };

    Ok(format!(
        "You are an expert data cleaning assistant specializing in contextual issues in text data.\n\n\
        # Context\n\
        {}\n\
        Dataset domain: {}\n\n\
        # Task\n\
        Below is a batch of values from the \"{}\" column. For each value, decide whether it has \
        contextual errors, inconsistencies or anomalies that should be fixed.\n\n\
        Look for:\n\
        1. Spelling errors\n\
        2. Inconsistent formatting\n\
        3. Values that do not make sense in context\n\
        4. Values that do not match the expected pattern\n\
        5. Mixed formats (e.g., different date or number formats)\n\
        6. Domain-specific issues\n\n\
        # Instructions\n\
        - If a value needs cleaning, provide the corrected version\n\
        - Explain the issue and how you fixed it\n\
        - Give a confidence score between 0.0 and 1.0\n\
        - Do NOT overcorrect: only fix clear issues\n\
        - If a value looks correct, mark it as not needing cleaning\n\
        {}\n\
        # Input Batch\n\
        {}\n\n\
        {}",
        context.column_context, context.domain_name, column, anomalies, values, CORRECTION_FORMAT
    ))
}

/// Build the prompt for a dataset assessment.
pub fn analysis_prompt(overview: &DatasetOverview) -> Result<String> {
    let mut column_info = String::new();
    for (name, column) in &overview.columns {
        column_info.push_str(&format!(
            "Column: \"{}\"\n- Data Type: {}\n- Null Percentage: {:.2}%\n- Unique Values Count: {}\n- Sample Values: {}\n\n",
            name,
            column.data_type.as_str(),
            column.null_percentage,
            column.unique_values,
            serde_json::to_string(&column.sample_values).context("Failed to serialize samples")?
        ));
    }

    let sample = serde_json::to_string_pretty(&overview.sample_rows).context("Failed to serialize sample rows")?;

    Ok(format!(
        "You are a senior data scientist specialized in dataset analysis and data quality assessment.\n\n\
        # Dataset Information\n\
        - Total Rows: {}\n\
        - Total Columns: {}\n\n\
        # Column Information\n\
        {}\
        # Sample Data (first {} rows)\n\
        {}\n\n\
        # Basic Dataset Statistics\n\
        - Missing Value Ratio: {:.4}\n\
        - Estimated Duplicate Rows: {}\n\n\
        # Instructions\n\
        1. Analyze the column names, data types and sample values\n\
        2. Determine the most likely domain for this dataset\n\
        3. Recommend specific cleaning actions for the quality issues you identify\n\
        4. Assess completeness, accuracy and consistency on a 0-10 scale\n\
        5. Suggest potential use cases once cleaned\n\
        6. List risk factors or limitations of the data\n\n\
        Domains:\n\
        - general: generic data that does not clearly fit the other categories\n\
        - finance: financial transactions, budgets, investments\n\
        - healthcare: patient data, medical records, health metrics\n\
        - marketing: customer data, campaign metrics, engagement data\n\
        - hr: employee records, performance metrics, recruitment data\n\n\
        {}",
        overview.row_count,
        overview.column_count,
        column_info,
        overview.sample_rows.len(),
        sample,
        overview.missing_value_ratio,
        overview.duplicate_rows_estimate,
        ANALYSIS_FORMAT
    ))
}

/// Locate the JSON payload in a model reply.
///
/// Strips markdown code fences and surrounding prose by slicing from the
/// first `[`/`{` to the matching last `]`/`}`.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find(['[', '{'])?;
    let closing = if text[start..].starts_with('[') { ']' } else { '}' };
    let end = text.rfind(closing)?;
    (end > start).then(|| &text[start..=end])
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CorrectionPayload {
    List(Vec<CorrectionResponse>),
    Wrapped { results: Vec<CorrectionResponse> },
}

/// Parse a correction reply: a JSON array, or an object wrapping it in `results`.
pub fn parse_corrections(text: &str) -> Result<Vec<CorrectionResponse>> {
    let json = extract_json(text).ok_or_else(|| anyhow!("No JSON found in correction response"))?;
    let payload: CorrectionPayload =
        serde_json::from_str(json).context("Failed to parse correction response")?;

    Ok(match payload {
        CorrectionPayload::List(items) => items,
        CorrectionPayload::Wrapped { results } => results,
    })
}

/// Parse an analysis reply into a [`DomainAssessment`].
pub fn parse_assessment(text: &str) -> Result<DomainAssessment> {
    let json = extract_json(text).ok_or_else(|| anyhow!("No JSON found in analysis response"))?;
    serde_json::from_str(json).context("Failed to parse analysis response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, Dataset, Row};

    // -------------------------------------------------------------------------
    // Helper functions
    // -------------------------------------------------------------------------

    fn request(row_index: usize, value: &str) -> CorrectionRequest {
        CorrectionRequest {
            column_name: "city".to_string(),
            row_index,
            original_value: value.to_string(),
        }
    }

    fn context(detect_anomalies: bool) -> CorrectionContext {
        CorrectionContext {
            column_context: "Column \"city\" from marketing domain.".to_string(),
            domain_name: "marketing".to_string(),
            temperature: 0.2,
            max_tokens: 1000,
            detect_anomalies,
        }
    }

    // -------------------------------------------------------------------------
    // Prompt tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_correction_prompt_contains_required_parts() {
        let prompt = correction_prompt(&[request(0, "pariss")], &context(false)).unwrap();

        assert!(prompt.contains("Column \"city\" from marketing domain."));
        assert!(prompt.contains("Dataset domain: marketing"));
        assert!(prompt.contains("\"originalValue\":\"pariss\""));
        assert!(prompt.contains("\"rowIndex\": number"));
        assert!(!prompt.contains("cannot be fixed"));
    }

    #[test]
    fn test_correction_prompt_mentions_anomalies_when_enabled() {
        let prompt = correction_prompt(&[request(0, "x")], &context(true)).unwrap();
        assert!(prompt.contains("cannot be fixed"));
    }

    #[test]
    fn test_analysis_prompt_lists_columns() {
        let row: Row = [("Salary".to_string(), Cell::Number(50000.0))].into_iter().collect();
        let dataset = Dataset::new(vec!["Salary".to_string()], vec![row]);
        let prompt = analysis_prompt(&DatasetOverview::from_dataset(&dataset)).unwrap();

        assert!(prompt.contains("Column: \"Salary\""));
        assert!(prompt.contains("- Data Type: numeric"));
        assert!(prompt.contains("- Total Rows: 1"));
        assert!(prompt.contains("\"recommendedDomain\""));
    }

    // -------------------------------------------------------------------------
    // Parsing tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_json_from_code_fence() {
        let text = "Here you go:\n```json\n[{\"a\": 1}]\n```\n";
        assert_eq!(extract_json(text), Some("[{\"a\": 1}]"));
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json("result: {\"x\": [1]} done"), Some("{\"x\": [1]}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} {"), None);
    }

    #[test]
    fn test_parse_corrections_array() {
        let text = r#"```json
[{"columnName": "city", "rowIndex": 0, "originalValue": "pariss",
  "result": {"cleaned": true, "cleanedValue": "Paris", "issueDetected": true, "confidence": 0.9}}]
```"#;
        let parsed = parse_corrections(text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].result.replacement(), Some("Paris"));
    }

    #[test]
    fn test_parse_corrections_wrapped() {
        let text = r#"{"results": [{"rowIndex": 2, "result": {"cleaned": false, "issueDetected": false}}]}"#;
        let parsed = parse_corrections(text).unwrap();
        assert_eq!(parsed[0].row_index, 2);
        assert_eq!(parsed[0].column_name, "");
    }

    #[test]
    fn test_parse_corrections_rejects_garbage() {
        assert!(parse_corrections("I could not process this batch.").is_err());
        assert!(parse_corrections("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_parse_assessment() {
        let text = r#"Sure! {"recommendedDomain": "finance", "confidence": 0.8, "reasoning": "r",
            "dataQualityAssessment": {"completenessScore": 9, "accuracyScore": 8,
            "consistencyScore": 7, "overallQualityScore": 8}}"#;
        let assessment = parse_assessment(text).unwrap();
        assert_eq!(assessment.recommended_domain, crate::types::Domain::Finance);
        assert!(assessment.risk_factors.is_empty());
    }
}
