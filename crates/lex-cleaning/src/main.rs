//! CLI entry point for the dataset cleaning pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use lex_cleaning::analysis::{DatasetAnalysisResult, DatasetAnalyzer};
use lex_cleaning::{
    CleaningOptions, CleaningProfile, CleaningResult, Dataset, MissingValueStrategy,
    OutlierStrategy, Pipeline, PipelineBuilder, load_dataset, profiles, write_cleaned, write_report,
};
use std::fs;
use tracing::{error, info, warn};

#[cfg(feature = "ai")]
use lex_cleaning::ai::{AnalysisProvider, CorrectionProvider, GeminiProvider, OpenRouterProvider};
#[cfg(feature = "ai")]
use std::env;
#[cfg(feature = "ai")]
use std::sync::Arc;

/// CLI-compatible missing value strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMissingStrategy {
    /// Fill with the column mean (numeric) or mode (text)
    Impute,
    /// Drop rows containing a null
    Drop,
    /// Fill with --replacement-value
    Replace,
}

impl From<CliMissingStrategy> for MissingValueStrategy {
    fn from(cli: CliMissingStrategy) -> Self {
        match cli {
            CliMissingStrategy::Impute => MissingValueStrategy::Impute,
            CliMissingStrategy::Drop => MissingValueStrategy::Drop,
            CliMissingStrategy::Replace => MissingValueStrategy::Replace,
        }
    }
}

/// CLI-compatible outlier strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierStrategy {
    /// Null out outlying values
    Remove,
    /// Count outliers but keep values
    Flag,
    /// Clamp to the z-score bound
    Cap,
}

impl From<CliOutlierStrategy> for OutlierStrategy {
    fn from(cli: CliOutlierStrategy) -> Self {
        match cli {
            CliOutlierStrategy::Remove => OutlierStrategy::Remove,
            CliOutlierStrategy::Flag => OutlierStrategy::Flag,
            CliOutlierStrategy::Cap => OutlierStrategy::Cap,
        }
    }
}

/// LLM backend selection
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProvider {
    /// OpenRouter (OPENROUTER_API_KEY)
    Openrouter,
    /// Google Gemini (GEMINI_API_KEY)
    Gemini,
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "LLM-optional tabular dataset cleaning",
    long_about = "Cleans CSV/JSON datasets: missing values, outliers, duplicates, column names \
                  and (optionally) LLM contextual correction of text fields.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  OPENROUTER_API_KEY    API key for OpenRouter (--provider openrouter)\n  \
                  GEMINI_API_KEY        API key for Google Gemini (--provider gemini)\n\n\
                  EXAMPLES:\n  \
                  # Clean with defaults and write the result\n  \
                  lex-cleaning clean -i data.csv -o cleaned.csv\n\n  \
                  # Impute, cap outliers, use the finance profile\n  \
                  lex-cleaning clean -i data.csv --missing impute --outliers cap --profile finance\n\n  \
                  # LLM contextual correction via Gemini\n  \
                  lex-cleaning clean -i data.csv --llm --provider gemini\n\n  \
                  # Advisory analysis as JSON\n  \
                  lex-cleaning analyze -i data.csv --json"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the final result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the JSON document is written.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean a dataset
    Clean(CleanArgs),
    /// Recommend a domain and assess data quality (advisory only)
    Analyze(AnalyzeArgs),
    /// List the predefined cleaning profiles
    Profiles,
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// Path to the .csv or .json dataset
    #[arg(short, long)]
    input: String,

    /// Write the cleaned dataset here (.csv or .json)
    #[arg(short, long)]
    output: Option<String>,

    /// Write the JSON report (summary, issues, insights) here
    #[arg(long)]
    report: Option<String>,

    /// Predefined profile id (general, finance, healthcare, marketing, hr)
    #[arg(long, default_value = "general", conflicts_with = "profile_file")]
    profile: String,

    /// Load a custom profile from a JSON file
    #[arg(long)]
    profile_file: Option<String>,

    /// Strategy for null cells
    #[arg(long, value_enum)]
    missing: Option<CliMissingStrategy>,

    /// Constant used by --missing replace
    #[arg(long)]
    replacement_value: Option<String>,

    /// Strategy for outliers
    #[arg(long, value_enum)]
    outliers: Option<CliOutlierStrategy>,

    /// Keep duplicate rows
    #[arg(long)]
    keep_duplicates: bool,

    /// Keep column names as they are
    #[arg(long)]
    no_standardize: bool,

    /// Enable LLM contextual correction of text columns
    #[arg(long)]
    llm: bool,

    /// Count values the LLM flags but cannot fix
    #[arg(long)]
    detect_anomalies: bool,

    /// LLM backend
    #[arg(long, value_enum, default_value = "openrouter")]
    provider: CliProvider,

    /// LLM temperature (0.0 - 1.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// LLM response token budget
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Rows per correction batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Correction batches in flight at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// z-score beyond which a value is an outlier
    #[arg(long)]
    z_threshold: Option<f64>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Path to the .csv or .json dataset
    #[arg(short, long)]
    input: String,

    /// Use only the rule-based advisor
    #[arg(long)]
    no_ai: bool,

    /// LLM backend
    #[arg(long, value_enum, default_value = "openrouter")]
    provider: CliProvider,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.quiet, cli.json);

    // Load environment variables from .env file
    dotenv().ok();

    match &cli.command {
        Command::Clean(args) => run_clean(&cli, args),
        Command::Analyze(args) => run_analyze(&cli, args),
        Command::Profiles => run_profiles(&cli),
    }
}

// =============================================================================
// clean
// =============================================================================

fn run_clean(cli: &Cli, args: &CleanArgs) -> Result<()> {
    let dataset = load_dataset(&args.input)?;
    let profile = resolve_profile(args)?;
    let options = build_options(args)?;

    let pipeline = build_pipeline(cli, args, options)?;

    info!("{}", "=".repeat(80));
    info!("Cleaning {} with profile '{}'", args.input, profile.id);
    info!("{}", "=".repeat(80));

    let result = match pipeline.process(&dataset, &profile) {
        Ok(result) => result,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    if let Some(output) = &args.output {
        write_cleaned(output, &result)?;
    }
    if let Some(report) = &args.report {
        write_report(report, &result)?;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_cleaning_summary(&result, &dataset, args);
    Ok(())
}

fn resolve_profile(args: &CleanArgs) -> Result<CleaningProfile> {
    if let Some(path) = &args.profile_file {
        let text = fs::read_to_string(path).with_context(|| format!("Reading profile {}", path))?;
        return serde_json::from_str(&text).with_context(|| format!("Parsing profile {}", path));
    }

    profiles::find(&args.profile).ok_or_else(|| {
        let available: Vec<String> = profiles::predefined().into_iter().map(|p| p.id).collect();
        anyhow!(
            "Unknown profile '{}' (available: {})",
            args.profile,
            available.join(", ")
        )
    })
}

fn build_options(args: &CleanArgs) -> Result<CleaningOptions> {
    let mut builder = CleaningOptions::builder()
        .remove_duplicates(!args.keep_duplicates)
        .standardize_columns(!args.no_standardize)
        .llm_contextual_cleaning(args.llm)
        .llm_detect_anomalies(args.detect_anomalies);

    if let Some(strategy) = args.missing {
        builder = builder.handle_missing_values(strategy.into());
    }
    if let Some(value) = &args.replacement_value {
        builder = builder.replacement_value(value);
    }
    if let Some(strategy) = args.outliers {
        builder = builder.handle_outliers(strategy.into());
    }
    if let Some(temperature) = args.temperature {
        builder = builder.llm_temperature(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        builder = builder.llm_max_tokens(max_tokens);
    }
    if let Some(size) = args.batch_size {
        builder = builder.correction_batch_size(size);
    }
    if let Some(concurrency) = args.concurrency {
        builder = builder.correction_concurrency(concurrency);
    }
    if let Some(threshold) = args.z_threshold {
        builder = builder.outlier_z_threshold(threshold);
    }

    Ok(builder.build()?)
}

/// Build the pipeline with optional LLM support
fn build_pipeline(cli: &Cli, args: &CleanArgs, options: CleaningOptions) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().options(options);

    if args.llm {
        builder = attach_correction_provider(builder, args.provider)?;
    }

    if !cli.quiet && !cli.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Print a human-readable summary of a cleaning run.
fn print_cleaning_summary(result: &CleaningResult, dataset: &Dataset, args: &CleanArgs) {
    let summary = &result.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input,
        dataset.row_count(),
        dataset.column_count()
    );
    match &args.output {
        Some(output) => println!(
            "Output: {} ({} rows x {} columns)",
            output,
            summary.rows_remaining,
            result.headers.len()
        ),
        None => println!("Output: not written (use -o to save the cleaned dataset)"),
    }
    println!("Profile: {}", result.profile_id);
    println!();

    println!("Summary:");
    println!(
        "  Rows: {} -> {} ({} removed)",
        summary.rows_processed,
        summary.rows_remaining,
        summary.rows_processed.saturating_sub(summary.rows_remaining)
    );
    println!("  Missing values handled: {}", summary.missing_values_fixed);
    println!("  Outliers detected: {}", summary.outliers_detected);
    println!("  Duplicates removed: {}", summary.duplicates_removed);
    println!("  Columns standardized: {}", summary.columns_standardized);
    if let Some(fields) = summary.llm_cleaning_applied {
        println!("  Fields corrected by LLM: {}", fields);
        println!(
            "  Contextual issues fixed: {}",
            summary.contextual_issues_fixed.unwrap_or(0)
        );
        println!("  Anomalies detected: {}", summary.anomalies_detected.unwrap_or(0));
    }
    println!();

    if !result.issues.is_empty() {
        println!("Issues:");
        for issue in &result.issues {
            println!(
                "  - [{:?}] {}: {} {}",
                issue.kind, issue.column, issue.count, issue.action
            );
            for example in issue.examples.iter().flatten() {
                println!("      {}", example);
            }
        }
        println!();
    }

    if let Some(insights) = result.llm_insights.as_ref().filter(|i| !i.is_empty()) {
        println!("LLM Insights:");
        for insight in insights {
            println!("  - {}", insight);
        }
        println!();
    }

    if !result.warnings.is_empty() {
        println!("Warnings:");
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
        println!();
    }

    println!("{}", "=".repeat(80));
}

// =============================================================================
// analyze
// =============================================================================

fn run_analyze(cli: &Cli, args: &AnalyzeArgs) -> Result<()> {
    let dataset = load_dataset(&args.input)?;
    let analyzer = build_analyzer(args)?;
    let result = analyzer.analyze(&dataset)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_analysis(&result, args);
    Ok(())
}

fn build_analyzer(args: &AnalyzeArgs) -> Result<DatasetAnalyzer> {
    if args.no_ai {
        info!("Running in rule-based mode (AI disabled)");
        return Ok(DatasetAnalyzer::new());
    }

    ai_analyzer(args.provider)
}

fn print_analysis(result: &DatasetAnalysisResult, args: &AnalyzeArgs) {
    let assessment = &result.assessment;
    let quality = &assessment.data_quality_assessment;

    println!();
    println!("{}", "=".repeat(80));
    println!("DATASET ANALYSIS ({:?})", result.source);
    println!("{}", "=".repeat(80));
    println!();

    println!("File: {}", args.input);
    println!(
        "Recommended domain: {} (confidence {:.0}%)",
        assessment.recommended_domain,
        assessment.confidence * 100.0
    );
    println!("Reasoning: {}", assessment.reasoning);
    if !assessment.potential_use_case.is_empty() {
        println!("Potential use case: {}", assessment.potential_use_case);
    }
    println!();

    println!("Data Quality (0-10):");
    println!("  Completeness: {:.1}", quality.completeness_score);
    println!("  Accuracy:     {:.1}", quality.accuracy_score);
    println!("  Consistency:  {:.1}", quality.consistency_score);
    println!("  Overall:      {:.1}", quality.overall_quality_score);
    println!();

    println!("Metrics:");
    println!(
        "  Missing value ratio: {:.2}%",
        result.analysis_metrics.missing_value_ratio * 100.0
    );
    println!(
        "  Estimated duplicate rows: {}",
        result.analysis_metrics.duplicate_rows_estimate
    );
    println!();

    if !assessment.suggested_cleaning_actions.is_empty() {
        println!("Suggested actions:");
        for action in &assessment.suggested_cleaning_actions {
            println!("  - {}", action);
        }
        println!();
    }

    if !assessment.risk_factors.is_empty() {
        println!("Risk factors:");
        for risk in &assessment.risk_factors {
            println!("  - {}", risk);
        }
        println!();
    }

    println!("{}", "=".repeat(80));
}

// =============================================================================
// profiles
// =============================================================================

fn run_profiles(cli: &Cli) -> Result<()> {
    let profiles = profiles::predefined();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    println!("{:<12} {:<20} {:<12} Description", "Id", "Name", "Domain");
    println!("{}", "-".repeat(80));
    for profile in &profiles {
        println!(
            "{:<12} {:<20} {:<12} {}",
            profile.id, profile.name, profile.domain, profile.description
        );
    }
    Ok(())
}

// =============================================================================
// providers
// =============================================================================

/// Open the selected provider as both correction and analysis backend.
///
/// Returns `None` (with a warning) when the API key is not set.
#[cfg(feature = "ai")]
#[allow(clippy::type_complexity)]
fn open_provider(
    kind: CliProvider,
) -> Result<Option<(Arc<dyn CorrectionProvider>, Arc<dyn AnalysisProvider>)>> {
    let var = match kind {
        CliProvider::Openrouter => "OPENROUTER_API_KEY",
        CliProvider::Gemini => "GEMINI_API_KEY",
    };

    let api_key = match env::var(var) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            warn!("{} not set. Continuing without LLM support.", var);
            return Ok(None);
        }
    };

    let providers: (Arc<dyn CorrectionProvider>, Arc<dyn AnalysisProvider>) = match kind {
        CliProvider::Openrouter => {
            let provider = Arc::new(OpenRouterProvider::new(api_key)?);
            info!("Using OpenRouter ({})", provider.model());
            (provider.clone(), provider)
        }
        CliProvider::Gemini => {
            let provider = Arc::new(GeminiProvider::new(api_key)?);
            info!("Using Gemini ({})", provider.model());
            (provider.clone(), provider)
        }
    };
    Ok(Some(providers))
}

#[cfg(feature = "ai")]
fn attach_correction_provider(builder: PipelineBuilder, kind: CliProvider) -> Result<PipelineBuilder> {
    match open_provider(kind)? {
        Some((provider, _)) => {
            info!("Contextual correction via {}", provider.name());
            Ok(builder.correction_provider(provider))
        }
        None => Ok(builder),
    }
}

#[cfg(not(feature = "ai"))]
fn attach_correction_provider(builder: PipelineBuilder, _kind: CliProvider) -> Result<PipelineBuilder> {
    warn!("AI support not compiled in; --llm has no effect.");
    warn!("Compile with --features ai to enable LLM correction.");
    Ok(builder)
}

#[cfg(feature = "ai")]
fn ai_analyzer(kind: CliProvider) -> Result<DatasetAnalyzer> {
    Ok(match open_provider(kind)? {
        Some((_, provider)) => DatasetAnalyzer::with_provider(provider),
        None => DatasetAnalyzer::new(),
    })
}

#[cfg(not(feature = "ai"))]
fn ai_analyzer(_kind: CliProvider) -> Result<DatasetAnalyzer> {
    warn!("AI support not compiled in. Using rule-based mode.");
    Ok(DatasetAnalyzer::new())
}
