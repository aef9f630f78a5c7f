//! Provider traits for abstracting LLM interactions.
//!
//! Two capabilities are used by the crate:
//!
//! - [`CorrectionProvider`] corrects batches of free-text cells during the
//!   contextual stage of the cleaning pipeline.
//! - [`AnalysisProvider`] assesses a dataset overview for the advisory
//!   analyzer.
//!
//! # Implementing a New Provider
//!
//! 1. Create a new file in `src/ai/` (e.g., `openai.rs`)
//! 2. Implement one or both traits for your provider struct
//! 3. Export the provider in `src/ai/mod.rs`
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_cleaning::ai::OpenRouterProvider;
//! use lex_cleaning::Pipeline;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(OpenRouterProvider::new("your-api-key")?);
//!
//! let pipeline = Pipeline::builder()
//!     .correction_provider(provider)
//!     .build()?;
//! ```

use crate::analysis::{DatasetOverview, DomainAssessment};
use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};

/// One text cell submitted for correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    pub column_name: String,
    pub row_index: usize,
    pub original_value: String,
}

/// Context shared by every request of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionContext {
    /// Short description, e.g. `Column "city" from finance domain.`
    pub column_context: String,
    pub domain_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub detect_anomalies: bool,
}

/// What the model decided for a single cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorrectionOutcome {
    pub cleaned: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub cleaned_value: Option<String>,
    pub issue_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl CorrectionOutcome {
    /// The replacement value, if the model actually produced one.
    ///
    /// An empty `cleanedValue` counts as no value.
    pub fn replacement(&self) -> Option<&str> {
        if !self.cleaned {
            return None;
        }
        self.cleaned_value.as_deref().filter(|v| !v.is_empty())
    }

    /// The explanation, treating an empty string as absent.
    pub fn explanation(&self) -> Option<&str> {
        self.explanation
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

/// Result for one request, keyed by column and row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionResponse {
    #[serde(default)]
    pub column_name: String,
    pub row_index: usize,
    #[serde(default, deserialize_with = "lenient_string")]
    pub original_value: Option<String>,
    #[serde(default)]
    pub result: CorrectionOutcome,
}

// Models sometimes answer `"cleanedValue": 42` instead of `"42"`.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Trait for providers that correct free-text cells.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; batches may be dispatched from
/// several scoped threads at once.
///
/// # Error Handling
///
/// Return an error for transport or parse failures. The pipeline logs the
/// failure, counts the batch as failed and continues with the next one.
pub trait CorrectionProvider: Send + Sync {
    /// Correct one batch. Responses are matched back by `(column_name, row_index)`.
    fn correct(
        &self,
        batch: &[CorrectionRequest],
        context: &CorrectionContext,
    ) -> Result<Vec<CorrectionResponse>>;

    /// Get the provider name for logging and debugging.
    fn name(&self) -> &str;

    /// Get the model being used by this provider.
    ///
    /// Returns `None` if the provider doesn't expose model information.
    fn model(&self) -> Option<&str> {
        None
    }
}

/// Trait for providers that assess a dataset for the advisory analyzer.
///
/// The analyzer falls back to rule-based scoring when this fails or the
/// returned assessment does not validate.
pub trait AnalysisProvider: Send + Sync {
    fn assess(&self, overview: &DatasetOverview) -> Result<DomainAssessment>;

    fn name(&self) -> &str;

    fn model(&self) -> Option<&str> {
        None
    }
}
