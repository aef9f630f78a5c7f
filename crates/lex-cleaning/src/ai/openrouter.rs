//! OpenRouter AI provider implementation.
//!
//! This module provides the [`OpenRouterProvider`] which implements
//! [`CorrectionProvider`] and [`AnalysisProvider`] for the OpenRouter API
//! (<https://openrouter.ai/>).
//!
//! OpenRouter provides access to multiple LLM models through a unified
//! chat-completions API.

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
use std::time::Duration;
use tracing::debug;

/// Default OpenRouter API endpoint.
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model.
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat";

/// Default timeout for API requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default temperature when a call does not specify one.
const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default max tokens when a call does not specify them.
const DEFAULT_MAX_TOKENS: u32 = 1000;

const PROVIDER_NAME: &str = "OpenRouter";

#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

impl OpenRouterResponse {
    fn into_text(self) -> Result<String> {
        self.choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .map(|msg| msg.content)
            .ok_or_else(|| anyhow!("No response content from OpenRouter API"))
    }
}

/// Configuration for the OpenRouter provider.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// The model to use (e.g., "deepseek/deepseek-chat", "openai/gpt-4o-mini").
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

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl OpenRouterConfig {
    /// Create a new configuration builder.
    pub fn builder() -> OpenRouterConfigBuilder {
        OpenRouterConfigBuilder::default()
    }
}

/// Builder for [`OpenRouterConfig`].
#[derive(Default)]
pub struct OpenRouterConfigBuilder {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
}

impl OpenRouterConfigBuilder {
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
    pub fn build(self) -> OpenRouterConfig {
        OpenRouterConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// OpenRouter provider for text correction and dataset analysis.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::ai::{OpenRouterProvider, OpenRouterConfig};
///
/// // Simple usage with defaults
/// let provider = OpenRouterProvider::new("your-api-key")?;
///
/// // With custom configuration
/// let config = OpenRouterConfig::builder()
///     .model("openai/gpt-4o-mini")
///     .timeout_secs(120)
///     .build();
/// let provider = OpenRouterProvider::with_config("your-api-key", config)?;
/// ```
pub struct OpenRouterProvider {
    api_key: String,
    config: OpenRouterConfig,
    client: Client,
}

impl OpenRouterProvider {
    /// Create a new OpenRouter provider with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::AiClientError`] if the API key is blank or
    /// the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> crate::error::Result<Self> {
        Self::with_config(api_key, OpenRouterConfig::default())
    }

    /// Create a new OpenRouter provider with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::AiClientError`] if the API key is blank or
    /// the HTTP client cannot be created.
    pub fn with_config(api_key: impl Into<String>, config: OpenRouterConfig) -> crate::error::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CleaningError::AiClientError(
                "OpenRouter API key is empty".to_string(),
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
        let request = OpenRouterRequest {
            model: self.config.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: temperature.unwrap_or(self.config.temperature),
            max_tokens: max_tokens.unwrap_or(self.config.max_tokens),
        };

        debug!("OpenRouter request: model={}, {} prompt bytes", request.model, prompt.len());

        let response = self
            .client
            .post(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "lex-cleaning")
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "OpenRouter API Error {}: {}",
                response.status(),
                response.text()?
            ));
        }

        let result: OpenRouterResponse = response.json()?;
        result.into_text()
    }
}

impl CorrectionProvider for OpenRouterProvider {
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

impl AnalysisProvider for OpenRouterProvider {
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
