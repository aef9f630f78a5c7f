//! Report generation module.
//!
//! This module turns accumulated stage statistics into the issue list of a
//! [`CleaningResult`](crate::types::CleaningResult) and saves cleaned
//! datasets and reports to disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_cleaning::reporting::{write_cleaned, write_report};
//!
//! let result = pipeline.process(&dataset, &profile)?;
//! write_cleaned("output/cleaned.csv", &result)?;
//! write_report("output/report.json", &result)?;
//! ```

pub mod export;
mod issues;

pub use export::{CleaningReport, to_csv_string, to_json_string, write_cleaned, write_report};
pub use issues::{IssueAggregator, MULTIPLE_COLUMNS};
