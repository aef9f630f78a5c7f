//! Dataset loading from CSV and JSON sources.
//!
//! CSV fields are trimmed and sniffed into [`Cell`]s (see
//! [`sniff_field`](crate::utils::sniff_field)). JSON input is either a
//! serialized [`Dataset`] (`{"headers": [...], "data": [...]}`) or a plain
//! array of flat objects.

use crate::error::{CleaningError, Result, ResultExt};
use crate::types::{Cell, Dataset, Row};
use crate::utils::sniff_field;
use csv::{ReaderBuilder, Trim};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Parse CSV text with a header row.
///
/// Missing trailing fields become nulls and surplus fields are ignored.
pub fn parse_csv(text: &str) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(CleaningError::InvalidDataset(
            "CSV input has no header row".to_string(),
        ));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        // whitespace-only line
        if record.len() == 1 && record.get(0).is_some_and(str::is_empty) && headers.len() > 1 {
            continue;
        }

        if record.len() > headers.len() {
            debug!(
                "CSV line {} has {} fields, expected {}",
                record.position().map_or(0, |p| p.line()),
                record.len(),
                headers.len()
            );
        }

        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).map_or(Cell::Null, sniff_field)))
            .collect();
        rows.push(row);
    }

    Ok(Dataset::new(headers, rows).with_size_bytes(text.len() as u64))
}

/// Parse a JSON dataset document or an array of row objects.
///
/// For a plain array, headers follow first-seen key order and absent keys
/// become nulls.
pub fn parse_json(text: &str) -> Result<Dataset> {
    let value: Value = serde_json::from_str(text)?;

    let (declared_headers, records) = match value {
        Value::Array(items) => (None, items),
        Value::Object(mut object) => {
            let headers = match object.remove("headers") {
                Some(headers) => Some(serde_json::from_value::<Vec<String>>(headers)?),
                None => None,
            };
            let data = object
                .remove("data")
                .or_else(|| object.remove("rows"))
                .ok_or_else(|| {
                    CleaningError::UnsupportedFormat(
                        "JSON object must contain a \"data\" array".to_string(),
                    )
                })?;
            match data {
                Value::Array(items) => (headers, items),
                _ => {
                    return Err(CleaningError::UnsupportedFormat(
                        "\"data\" must be an array of objects".to_string(),
                    ));
                }
            }
        }
        _ => {
            return Err(CleaningError::UnsupportedFormat(
                "expected a JSON array of objects or a dataset object".to_string(),
            ));
        }
    };

    let records = records
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(CleaningError::InvalidDataset(format!(
                "row {} is not a JSON object",
                i
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    let headers = declared_headers.unwrap_or_else(|| collect_headers(&records));

    let rows = records
        .into_iter()
        .map(|mut record| {
            let row: Row = headers
                .iter()
                .map(|h| (h.clone(), record.remove(h).map_or(Cell::Null, cell_from_json)))
                .collect();
            if !record.is_empty() {
                warn!("Ignoring {} field(s) not listed in the dataset headers", record.len());
            }
            row
        })
        .collect();

    Ok(Dataset::new(headers, rows).with_size_bytes(text.len() as u64))
}

/// Load a dataset from a `.csv` or `.json` file.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let parse: fn(&str) -> Result<Dataset> = match extension.as_deref() {
        Some("csv") => parse_csv,
        Some("json") => parse_json,
        _ => {
            return Err(CleaningError::UnsupportedFormat(format!(
                "cannot load '{}' (expected .csv or .json)",
                path.display()
            )));
        }
    };

    let text = fs::read_to_string(path).context(format!("Reading {}", path.display()))?;
    let dataset = parse(&text).context(format!("Parsing {}", path.display()))?;

    info!(
        "Loaded {}: {} rows x {} columns",
        path.display(),
        dataset.row_count(),
        dataset.column_count()
    );
    Ok(dataset)
}

fn collect_headers(records: &[Map<String, Value>]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    headers
}

fn cell_from_json(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(b) => Cell::Bool(b),
        Value::Number(n) => n.as_f64().map_or(Cell::Null, Cell::Number),
        Value::String(s) => Cell::Text(s),
        nested => Cell::Text(nested.to_string()),
    }
}
