//! Google Gemini AI provider implementation.
//!
//! This module provides the [`GeminiProvider`] which implements
//! [`CorrectionProvider`] and [`AnalysisProvider`] for Google's Gemini API
//! (<https://ai.google.dev/>).

use std::time::Duration;

use super::prompts::{
    ANALYSIS_MAX_TOKENS, ANALYSIS_TEMPERATURE, analysis_prompt, correction_prompt, parse_assessment,
    parse_corrections,
};
use super::{AnalysisProvider, CorrectionContext, CorrectionProvider, CorrectionRequest, CorrectionResponse};
use crate::analysis::{DatasetOverview, DomainAssessment};
use crate::error::CleaningError;
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default Gemini API endpoint.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/";

/// Default model.
const DEFAULT_MODEL: &str = "gemini-flash-lite-latest";

/// Default timeout for API requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default temperature when a call does not specify one.
const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default max tokens when a call does not specify them.
const DEFAULT_MAX_TOKENS: u32 = 1000;

const PROVIDER_NAME: &str = "Gemini";

// Gemini API request structures
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

// Gemini API response structures
#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<Part>>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String> {
        let candidate = self
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .ok_or_else(|| anyhow!("No response content from Gemini API"))?;

        if let Some(reason) = &candidate.finish_reason
            && (reason == "SAFETY" || reason == "BLOCKED")
        {
            return Err(anyhow!("Gemini response blocked ({})", reason));
        }

        let parts = candidate
            .content
            .and_then(|content| content.parts)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| anyhow!("No response content from Gemini API"))?;

        Ok(parts.into_iter().map(|p| p.text).collect())
    }
}

/// Configuration for the Gemini provider.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// The model to use (e.g., "gemini-2.0-flash", "gemini-flash-lite-latest").
    pub model: String,
    /// Fallback temperature (0.0 - 2.0). Correction calls use the pipeline's value.
    pub temperature: f32,
    /// Fallback response token budget.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Base URL for the API (useful for proxies or custom endpoints).
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }
}

impl GeminiConfig {
    /// Create a new configuration builder.
    pub fn builder() -> GeminiConfigBuilder {
        GeminiConfigBuilder::default()
    }
}

/// Builder for [`GeminiConfig`].
#[derive(Default)]
pub struct GeminiConfigBuilder {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
}

impl GeminiConfigBuilder {
    /// Set the model to use.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the fallback temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the fallback maximum tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the request timeout in seconds.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Set a custom base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> GeminiConfig {
        GeminiConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
        }
    }
}

/// Google Gemini provider for text correction and dataset analysis.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::ai::{GeminiProvider, GeminiConfig};
///
/// let provider = GeminiProvider::new("your-api-key")?;
///
/// let config = GeminiConfig::builder()
///     .model("gemini-2.0-flash")
///     .build();
/// let provider = GeminiProvider::with_config("your-api-key", config)?;
/// ```
pub struct GeminiProvider {
    api_key: String,
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::AiClientError`] if the API key is blank or
    /// the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> crate::error::Result<Self> {
        Self::with_config(api_key, GeminiConfig::default())
    }

    /// Create a new Gemini provider with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::AiClientError`] if the API key is blank or
    /// the HTTP client cannot be created.
    pub fn with_config(api_key: impl Into<String>, config: GeminiConfig) -> crate::error::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CleaningError::AiClientError(
                "Gemini API key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CleaningError::AiClientError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            config,
            client,
        })
    }

    /// Provider name for logging.
    pub fn name(&self) -> &str {
        PROVIDER_NAME
    }

    /// Model used for every call.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn call_api(&self, prompt: &str, temperature: Option<f32>, max_tokens: Option<u32>) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![Content {
                role: "user".to_owned(),
                parts: vec![Part {
                    text: prompt.to_owned(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: temperature.unwrap_or(self.config.temperature),
                max_output_tokens: max_tokens.unwrap_or(self.config.max_tokens),
                response_mime_type: "application/json",
            },
        };

        // {base_url}{model}:generateContent?key={api_key}
        let url = format!(
            "{}{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.api_key
        );

        debug!("Gemini request: model={}, {} prompt bytes", self.config.model, prompt.len());

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Gemini API error {}: {}",
                response.status(),
                response.text()?
            ));
        }

        let result: GeminiResponse = response.json()?;
        result.into_text()
    }
}

impl CorrectionProvider for GeminiProvider {
    fn correct(
        &self,
        batch: &[CorrectionRequest],
        context: &CorrectionContext,
    ) -> Result<Vec<CorrectionResponse>> {
        let prompt = correction_prompt(batch, context)?;
        let text = self.call_api(&prompt, Some(context.temperature), Some(context.max_tokens))?;
        parse_corrections(&text)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

impl AnalysisProvider for GeminiProvider {
    fn assess(&self, overview: &DatasetOverview) -> Result<DomainAssessment> {
        let prompt = analysis_prompt(overview)?;
        let text = self.call_api(&prompt, Some(ANALYSIS_TEMPERATURE), Some(ANALYSIS_MAX_TOKENS))?;
        parse_assessment(&text)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // GeminiResponse parsing tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_valid_response_structure() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "[]"}]
                },
                "finishReason": "STOP"
            }]
        }"#;

        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().unwrap(), "[]");
    }

    #[test]
    fn test_parse_response_with_empty_candidates() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(response.into_text().is_err());
    }

    #[test]
    fn test_parse_response_missing_parts() {
        let json = r#"{"candidates": [{"content": {"parts": null}, "finishReason": "STOP"}]}"#;

        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(response.into_text().is_err());
    }

    #[test]
    fn test_parse_response_safety_blocked() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "x"}]}, "finishReason": "SAFETY"}]}"#;

        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = response.into_text().unwrap_err();
        assert!(err.to_string().contains("blocked"));
    }

    #[test]
    fn test_parse_response_multiple_parts_are_joined() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "[{\"rowIndex\": 0,"},
                        {"text": " \"result\": {}}]"}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;

        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        let text = response.into_text().unwrap();
        assert_eq!(text, "[{\"rowIndex\": 0, \"result\": {}}]");
        assert_eq!(parse_corrections(&text).unwrap()[0].row_index, 0);
    }

    #[test]
    fn test_request_uses_camel_case_generation_config() {
        let request = GeminiRequest {
            contents: vec![],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 1500,
                response_mime_type: "application/json",
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1500);
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    // -------------------------------------------------------------------------
    // Provider trait implementation tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_provider_name() {
        let provider = GeminiProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "Gemini");
        assert_eq!(AnalysisProvider::name(&provider), "Gemini");
    }

    #[test]
    fn test_provider_model() {
        let provider = GeminiProvider::new("test-key").unwrap();
        assert_eq!(CorrectionProvider::model(&provider), Some(DEFAULT_MODEL));

        let config = GeminiConfig::builder().model("gemini-2.0-flash").build();
        let provider = GeminiProvider::with_config("test-key", config).unwrap();
        assert_eq!(provider.model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        let err = GeminiProvider::with_config("", GeminiConfig::default()).err().unwrap();
        assert_eq!(err.error_code(), "AI_CLIENT_ERROR");
    }
}
