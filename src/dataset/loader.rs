// CSV dataset loader: one RawRecord per row, keyed by header.
//
// Cells are typed by content: integers and floats become JSON numbers,
// True/False become booleans, empty cells become null. Columns the
// capability table declares as text or timestamps stay strings, so a tweet
// that happens to read "42" keeps its length.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use crate::features::record::FieldKind;
use crate::features::{RawField, RawRecord};

/// Load a headed CSV file. `sample_limit` keeps only the first N data rows;
/// a limit of 0 means no limit.
pub fn load_csv(path: &Path, sample_limit: Option<usize>) -> Result<Vec<RawRecord>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open dataset {}", path.display()))?;
    let records = read_records(BufReader::new(file), sample_limit)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    info!(
        path = %path.display(),
        rows = records.len(),
        sampled = sample_limit.is_some_and(|n| n > 0),
        "Loaded dataset"
    );
    Ok(records)
}

/// Parse CSV from any reader. Split out for tests.
pub fn read_records<R: Read>(reader: R, sample_limit: Option<usize>) -> Result<Vec<RawRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader.headers().context("CSV has no header row")?.clone();
    debug!(columns = ?headers.iter().collect::<Vec<_>>(), "CSV headers");

    let kinds: Vec<Option<FieldKind>> = headers
        .iter()
        .map(|h| RawField::for_key(h).map(|f| f.spec().kind))
        .collect();

    let limit = sample_limit.filter(|&n| n > 0).unwrap_or(usize::MAX);
    let mut records = Vec::new();
    for (line, row) in reader.records().take(limit).enumerate() {
        let row = row.with_context(|| format!("Malformed CSV row {}", line + 2))?;
        records.push(row_to_record(&row, &headers, &kinds));
    }
    Ok(records)
}

fn row_to_record(row: &StringRecord, headers: &StringRecord, kinds: &[Option<FieldKind>]) -> RawRecord {
    let mut values = Map::with_capacity(headers.len());
    for (i, header) in headers.iter().enumerate() {
        let cell = row.get(i).unwrap_or("");
        let value = match kinds[i] {
            Some(FieldKind::Text) | Some(FieldKind::Timestamp) => text_cell(cell),
            _ => typed_cell(cell),
        };
        values.insert(header.to_string(), value);
    }
    RawRecord::from(values)
}

fn text_cell(cell: &str) -> Value {
    if cell.is_empty() {
        Value::Null
    } else {
        Value::String(cell.to_string())
    }
}

fn typed_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(Number::from(i));
    }
    if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
User ID,Username,Tweet,Retweet Count,Verified,Hashtags,Bot Label
1,alice99,\"Hello, world!\",3,True,,0
2,bob,42,0,False,news tech,1
";

    #[test]
    fn cells_are_typed_by_content() {
        let records = read_records(SAMPLE.as_bytes(), None).unwrap();
        assert_eq!(records.len(), 2);
        let first = records[0].as_map();
        assert_eq!(first["User ID"], Value::from(1));
        assert_eq!(first["Verified"], Value::Bool(true));
        assert_eq!(first["Hashtags"], Value::Null);
        assert_eq!(first["Tweet"], Value::from("Hello, world!"));
    }

    #[test]
    fn text_columns_stay_text() {
        let records = read_records(SAMPLE.as_bytes(), None).unwrap();
        assert_eq!(records[1].as_map()["Tweet"], Value::from("42"));
        assert_eq!(records[1].flag(RawField::BotLabel), Some(true));
    }

    #[test]
    fn sample_limit_keeps_first_rows() {
        let records = read_records(SAMPLE.as_bytes(), Some(1)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text(RawField::Username).as_deref(), Some("alice99"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_csv(Path::new("/nonexistent/botwatch.csv"), None).is_err());
    }
}
