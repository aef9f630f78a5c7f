//! Configuration types for the cleaning pipeline.
//!
//! [`CleaningOptions`] controls every stage of a run. It deserializes from
//! the camelCase JSON shape used by frontends (`handleMissingValues`,
//! `llmTemperature`, ...) and can be assembled with a validating builder.

use serde::{Deserialize, Serialize};

/// Default constant used by [`MissingValueStrategy::Replace`].
pub const DEFAULT_REPLACEMENT_VALUE: &str = "N/A";

/// How null cells are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingValueStrategy {
    /// Fill nulls with the column mean (numeric) or mode (text)
    Impute,
    /// Drop every row that contains at least one null
    #[default]
    Drop,
    /// Fill nulls with a constant replacement value
    Replace,
}

impl MissingValueStrategy {
    /// Human-readable description used in issue reports.
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::Impute => "imputed with mean/mode",
            Self::Drop => "rows dropped",
            Self::Replace => "replaced with custom value",
        }
    }
}

/// How values beyond the z-score threshold are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutlierStrategy {
    /// Null out the outlying cell
    Remove,
    /// Count outliers but leave values unchanged
    #[default]
    Flag,
    /// Winsorize to the threshold bound
    Cap,
}

impl OutlierStrategy {
    /// Human-readable description used in issue reports.
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::Flag => "flagged",
            Self::Remove => "removed",
            Self::Cap => "capped",
        }
    }
}

/// Options for a single cleaning run.
///
/// Use [`CleaningOptions::builder()`] for a validated instance.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::config::{CleaningOptions, MissingValueStrategy, OutlierStrategy};
///
/// let options = CleaningOptions::builder()
///     .handle_missing_values(MissingValueStrategy::Impute)
///     .handle_outliers(OutlierStrategy::Cap)
///     .llm_contextual_cleaning(true)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CleaningOptions {
    /// Strategy for null cells.
    /// Default: Drop
    pub handle_missing_values: MissingValueStrategy,

    /// Constant used when `handle_missing_values` is `Replace`.
    /// Default: "N/A"
    pub replacement_value: String,

    /// Strategy for numeric outliers.
    /// Default: Flag
    pub handle_outliers: OutlierStrategy,

    /// Whether to remove structurally identical rows.
    /// Default: true
    pub remove_duplicates: bool,

    /// Whether to normalize column names.
    /// Default: true
    pub standardize_columns: bool,

    /// Whether to run the LLM contextual correction stage.
    /// Default: false
    pub llm_contextual_cleaning: bool,

    /// Whether to count anomalies the LLM detects but does not fix.
    /// Default: false
    pub llm_detect_anomalies: bool,

    /// Sampling temperature for correction calls (0.0 - 1.0).
    /// Default: 0.2
    pub llm_temperature: f32,

    /// Token budget for each correction call.
    /// Default: 1000
    pub llm_max_tokens: u32,

    /// Rows per correction window.
    /// Default: 10
    pub correction_batch_size: usize,

    /// Correction batches in flight at once.
    /// Default: 1
    pub correction_concurrency: usize,

    /// Outlier threshold in standard deviations.
    /// Default: 3.0
    pub outlier_z_threshold: f64,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            handle_missing_values: MissingValueStrategy::default(),
            replacement_value: DEFAULT_REPLACEMENT_VALUE.to_string(),
            handle_outliers: OutlierStrategy::default(),
            remove_duplicates: true,
            standardize_columns: true,
            llm_contextual_cleaning: false,
            llm_detect_anomalies: false,
            llm_temperature: 0.2,
            llm_max_tokens: 1000,
            correction_batch_size: 10,
            correction_concurrency: 1,
            outlier_z_threshold: 3.0,
        }
    }
}

impl CleaningOptions {
    /// Create a new options builder.
    pub fn builder() -> CleaningOptionsBuilder {
        CleaningOptionsBuilder::default()
    }

    /// Validate the options and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.llm_temperature) {
            return Err(ConfigValidationError::InvalidTemperature(self.llm_temperature));
        }

        if self.llm_max_tokens == 0 {
            return Err(ConfigValidationError::ZeroValue("llmMaxTokens"));
        }

        if self.correction_batch_size == 0 {
            return Err(ConfigValidationError::ZeroValue("correctionBatchSize"));
        }

        if self.correction_concurrency == 0 {
            return Err(ConfigValidationError::ZeroValue("correctionConcurrency"));
        }

        if !self.outlier_z_threshold.is_finite() || self.outlier_z_threshold <= 0.0 {
            return Err(ConfigValidationError::InvalidZThreshold(
                self.outlier_z_threshold,
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during options validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid LLM temperature: {0} (must be between 0.0 and 1.0)")]
    InvalidTemperature(f32),

    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroValue(&'static str),

    #[error("Invalid outlier z-threshold: {0} (must be a positive number)")]
    InvalidZThreshold(f64),
}

/// Builder for [`CleaningOptions`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningOptionsBuilder {
    handle_missing_values: Option<MissingValueStrategy>,
    replacement_value: Option<String>,
    handle_outliers: Option<OutlierStrategy>,
    remove_duplicates: Option<bool>,
    standardize_columns: Option<bool>,
    llm_contextual_cleaning: Option<bool>,
    llm_detect_anomalies: Option<bool>,
    llm_temperature: Option<f32>,
    llm_max_tokens: Option<u32>,
    correction_batch_size: Option<usize>,
    correction_concurrency: Option<usize>,
    outlier_z_threshold: Option<f64>,
}

impl CleaningOptionsBuilder {
    /// Set the missing-value strategy.
    pub fn handle_missing_values(mut self, strategy: MissingValueStrategy) -> Self {
        self.handle_missing_values = Some(strategy);
        self
    }

    /// Set the constant used by the `Replace` strategy.
    pub fn replacement_value(mut self, value: impl Into<String>) -> Self {
        self.replacement_value = Some(value.into());
        self
    }

    /// Set the outlier strategy.
    pub fn handle_outliers(mut self, strategy: OutlierStrategy) -> Self {
        self.handle_outliers = Some(strategy);
        self
    }

    /// Enable or disable duplicate row removal.
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    /// Enable or disable column name standardization.
    pub fn standardize_columns(mut self, standardize: bool) -> Self {
        self.standardize_columns = Some(standardize);
        self
    }

    /// Enable or disable the LLM contextual correction stage.
    ///
    /// The stage also needs a correction provider on the pipeline.
    pub fn llm_contextual_cleaning(mut self, enable: bool) -> Self {
        self.llm_contextual_cleaning = Some(enable);
        self
    }

    /// Enable or disable counting of detected-but-unfixed anomalies.
    pub fn llm_detect_anomalies(mut self, enable: bool) -> Self {
        self.llm_detect_anomalies = Some(enable);
        self
    }

    /// Set the LLM temperature (0.0 - 1.0).
    pub fn llm_temperature(mut self, temperature: f32) -> Self {
        self.llm_temperature = Some(temperature);
        self
    }

    /// Set the LLM token budget per call.
    pub fn llm_max_tokens(mut self, max_tokens: u32) -> Self {
        self.llm_max_tokens = Some(max_tokens);
        self
    }

    /// Set how many rows make up one correction window.
    pub fn correction_batch_size(mut self, size: usize) -> Self {
        self.correction_batch_size = Some(size);
        self
    }

    /// Set how many correction batches may run concurrently.
    pub fn correction_concurrency(mut self, concurrency: usize) -> Self {
        self.correction_concurrency = Some(concurrency);
        self
    }

    /// Set the outlier threshold in standard deviations.
    pub fn outlier_z_threshold(mut self, threshold: f64) -> Self {
        self.outlier_z_threshold = Some(threshold);
        self
    }

    /// Build the options.
    ///
    /// Returns validated `CleaningOptions` or an error if validation fails.
    pub fn build(self) -> Result<CleaningOptions, ConfigValidationError> {
        let defaults = CleaningOptions::default();
        let options = CleaningOptions {
            handle_missing_values: self.handle_missing_values.unwrap_or_default(),
            replacement_value: self
                .replacement_value
                .unwrap_or(defaults.replacement_value),
            handle_outliers: self.handle_outliers.unwrap_or_default(),
            remove_duplicates: self.remove_duplicates.unwrap_or(defaults.remove_duplicates),
            standardize_columns: self
                .standardize_columns
                .unwrap_or(defaults.standardize_columns),
            llm_contextual_cleaning: self
                .llm_contextual_cleaning
                .unwrap_or(defaults.llm_contextual_cleaning),
            llm_detect_anomalies: self
                .llm_detect_anomalies
                .unwrap_or(defaults.llm_detect_anomalies),
            llm_temperature: self.llm_temperature.unwrap_or(defaults.llm_temperature),
            llm_max_tokens: self.llm_max_tokens.unwrap_or(defaults.llm_max_tokens),
            correction_batch_size: self
                .correction_batch_size
                .unwrap_or(defaults.correction_batch_size),
            correction_concurrency: self
                .correction_concurrency
                .unwrap_or(defaults.correction_concurrency),
            outlier_z_threshold: self
                .outlier_z_threshold
                .unwrap_or(defaults.outlier_z_threshold),
        };

        options.validate()?;
        Ok(options)
    }
}
