//! AI module for LLM-powered text correction and dataset analysis.
//!
//! This module provides trait-based abstractions for AI providers, so the
//! cleaning pipeline and the analyzer work with any LLM backend.
//!
//! # Feature Flag
//!
//! The concrete HTTP providers require the `ai` feature flag. The traits,
//! request/response types and prompt helpers are always available for
//! custom implementations.
//!
//! ```toml
//! # Enable AI support (default)
//! lex_cleaning = { version = "0.1", features = ["ai"] }
//!
//! # Disable AI support for smaller binary
//! lex_cleaning = { version = "0.1", default-features = false }
//! ```
//!
//! # Architecture
//!
//! - [`CorrectionProvider`] corrects batches of text cells
//! - [`AnalysisProvider`] assesses a dataset overview
//!
//! Both are implemented by:
//!
//! - [`GeminiProvider`] - Google Gemini API (requires `ai` feature)
//! - [`OpenRouterProvider`] - OpenRouter API (requires `ai` feature)

// Traits and prompts are always available (for custom implementations)
pub mod prompts;
mod provider;
pub use provider::{
    AnalysisProvider, CorrectionContext, CorrectionOutcome, CorrectionProvider, CorrectionRequest,
    CorrectionResponse,
};

// Concrete providers require the "ai" feature
#[cfg(feature = "ai")]
mod gemini;
#[cfg(feature = "ai")]
mod openrouter;

#[cfg(feature = "ai")]
pub use gemini::{GeminiConfig, GeminiConfigBuilder, GeminiProvider};

#[cfg(feature = "ai")]
pub use openrouter::{OpenRouterConfig, OpenRouterConfigBuilder, OpenRouterProvider};
