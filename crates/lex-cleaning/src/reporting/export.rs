use crate::error::{CleaningError, Result, ResultExt};
use crate::types::{CleaningResult, CleaningSummary, Issue, Row};
use chrono::Local;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Report document written next to the cleaned data.
///
/// Everything in a [`CleaningResult`] except the rows themselves.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningReport<'a> {
    pub generated_at: String,
    pub profile_id: &'a str,
    pub processed_at: &'a str,
    pub headers: &'a [String],
    pub summary: &'a CleaningSummary,
    pub issues: &'a [Issue],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_insights: Option<&'a [String]>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub warnings: &'a [String],
}

impl<'a> CleaningReport<'a> {
    pub fn from_result(result: &'a CleaningResult) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            profile_id: &result.profile_id,
            processed_at: &result.processed_at,
            headers: &result.headers,
            summary: &result.summary,
            issues: &result.issues,
            llm_insights: result.llm_insights.as_deref(),
            warnings: &result.warnings,
        }
    }
}

/// Render rows as CSV in `headers` order.
///
/// Nulls become empty fields. Fields containing the delimiter, quotes or
/// line breaks are quoted.
pub fn to_csv_string(headers: &[String], rows: &[Row]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(
            headers
                .iter()
                .map(|h| row.get(h).map(|cell| cell.to_string()).unwrap_or_default()),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CleaningError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| CleaningError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Pretty JSON array of row objects.
pub fn to_json_string(rows: &[Row]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Write the cleaned rows to `path`, choosing CSV or JSON by extension.
pub fn write_cleaned(path: impl AsRef<Path>, result: &CleaningResult) -> Result<()> {
    let path = path.as_ref();
    let content = match extension(path).as_deref() {
        Some("csv") => to_csv_string(&result.headers, &result.cleaned_data)?,
        Some("json") => to_json_string(&result.cleaned_data)?,
        _ => {
            return Err(CleaningError::UnsupportedFormat(format!(
                "cannot export to '{}' (expected .csv or .json)",
                path.display()
            )));
        }
    };

    write_file(path, &content)?;
    info!("Cleaned dataset saved: {} ({} rows)", path.display(), result.cleaned_data.len());
    Ok(())
}

/// Write the JSON report (summary, issues, insights, warnings) to `path`.
pub fn write_report(path: impl AsRef<Path>, result: &CleaningResult) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(&CleaningReport::from_result(result))?;

    write_file(path, &content)?;
    info!("Report saved: {}", path.display());
    Ok(())
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context(format!("Creating {}", parent.display()))?;
    }

    debug!("Writing {} bytes to {}", content.len(), path.display());
    fs::write(path, content).context(format!("Writing {}", path.display()))
}
