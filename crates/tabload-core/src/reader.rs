//! Tabular Reader: encoding/delimiter detection and value-kind
//! inference for raw delimited extracts.
//!
//! The sweep order is a deliberate precedence, not arbitrary: UTF-8
//! with a comma is the common case and is tried first. A combination
//! is accepted as soon as it decodes without fatal errors and yields
//! a consistent table with more than one column.

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use encoding_rs::Encoding;

use crate::error::CoreError;
use crate::extract::{Cell, Extract, ValueKind};

/// Encoding labels in sweep order. Labels are resolved through
/// `Encoding::for_label`, which maps the latin-1 family of spellings
/// onto one decoder; resolved duplicates are skipped.
const ENCODING_LABELS: &[&str] = &["utf-8", "latin-1", "windows-1252", "iso-8859-1"];

/// Delimiter candidates in sweep order.
const DELIMITERS: &[u8] = &[b',', b'\t', b'|', b';'];

/// How much of an unreadable file to keep for diagnostics.
const SAMPLE_CHARS: usize = 200;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a raw extract into an [`Extract`].
///
/// A malformed file returns `CoreError::ParseFailure` with a short
/// sample of the content; the caller logs and skips it. A single
/// unreadable extract must never halt the batch run.
pub fn parse(bytes: &[u8], file_name: &str) -> Result<Extract, CoreError> {
    let mut seen: Vec<&'static Encoding> = Vec::new();

    for label in ENCODING_LABELS {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            continue;
        };
        if seen.contains(&encoding) {
            continue;
        }
        seen.push(encoding);

        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            // Fatal decoding error: this encoding is out for every
            // delimiter.
            continue;
        }

        for &delimiter in DELIMITERS {
            let (columns, raw_rows) = match read_table(&text, delimiter) {
                Some(table) => table,
                None => continue,
            };
            if columns.len() <= 1 {
                continue;
            }

            if raw_rows.is_empty() {
                return Err(parse_failure(bytes, file_name, "file contains no data rows"));
            }

            log::info!(
                "parsed {} as {}-separated {} ({} rows, {} columns)",
                file_name,
                delimiter_name(delimiter),
                encoding.name(),
                raw_rows.len(),
                columns.len()
            );

            return Ok(build_extract(
                file_name,
                columns,
                raw_rows,
                encoding.name(),
                delimiter,
            ));
        }
    }

    Err(parse_failure(
        bytes,
        file_name,
        "no encoding/delimiter combination produced a table with more than one column",
    ))
}

fn parse_failure(bytes: &[u8], file_name: &str, reason: &str) -> CoreError {
    let sample: String = String::from_utf8_lossy(bytes).chars().take(SAMPLE_CHARS).collect();
    CoreError::ParseFailure {
        file: file_name.to_string(),
        reason: reason.to_string(),
        sample,
    }
}

fn delimiter_name(delimiter: u8) -> &'static str {
    match delimiter {
        b',' => "comma",
        b'\t' => "tab",
        b'|' => "pipe",
        b';' => "semicolon",
        _ => "unknown",
    }
}

/// Read headers and records with one delimiter. Returns `None` when
/// the text is not a consistent table at this delimiter (ragged rows,
/// unbalanced quotes).
fn read_table(text: &str, delimiter: u8) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader.headers().ok()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.ok()?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Some((columns, rows))
}

fn build_extract(
    file_name: &str,
    columns: Vec<String>,
    raw_rows: Vec<Vec<String>>,
    encoding: &'static str,
    delimiter: u8,
) -> Extract {
    let kinds: Vec<ValueKind> = (0..columns.len())
        .map(|idx| infer_column_kind(raw_rows.iter().map(|row| row[idx].as_str())))
        .collect();

    let rows: Vec<Vec<Cell>> = raw_rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(kinds.iter())
                .map(|(raw, kind)| cell_for(raw, *kind))
                .collect()
        })
        .collect();

    Extract {
        file_name: file_name.to_string(),
        columns,
        kinds,
        rows,
        encoding,
        delimiter,
    }
}

/// Most specific kind every non-null value in the column satisfies;
/// text on disagreement. A column with no non-null values at all is
/// treated as float-kind so it resolves to the widest safe numeric
/// type downstream.
fn infer_column_kind<'a>(values: impl Iterator<Item = &'a str>) -> ValueKind {
    let mut kind: Option<ValueKind> = None;
    for value in values {
        let Some(value_kind) = classify(value) else {
            continue;
        };
        kind = Some(match kind {
            Some(current) => current.unify(value_kind),
            None => value_kind,
        });
        if kind == Some(ValueKind::Text) {
            break;
        }
    }
    kind.unwrap_or(ValueKind::Float)
}

/// Kind of a single value: integer parse, else float, else timestamp,
/// else text. `None` for null/empty.
fn classify(raw: &str) -> Option<ValueKind> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if value.parse::<i64>().is_ok() {
        return Some(ValueKind::Integer);
    }
    if value.parse::<f64>().is_ok() {
        return Some(ValueKind::Float);
    }
    if parse_timestamp(value).is_some() {
        return Some(ValueKind::Timestamp);
    }
    Some(ValueKind::Text)
}

/// Materialize one cell with the column's kind. Values that do not
/// satisfy the column kind can only appear in text columns, where
/// they are kept verbatim.
fn cell_for(raw: &str, kind: ValueKind) -> Cell {
    let value = raw.trim();
    if value.is_empty() {
        return Cell::Null;
    }
    match kind {
        ValueKind::Integer => value.parse::<i64>().map(Cell::Int).unwrap_or(Cell::Null),
        ValueKind::Float => value.parse::<f64>().map(Cell::Float).unwrap_or(Cell::Null),
        ValueKind::Timestamp => parse_timestamp(value).map(Cell::Timestamp).unwrap_or(Cell::Null),
        ValueKind::Text => Cell::Text(value.to_string()),
    }
}

/// Timestamp parse over a fixed format list: datetime formats first,
/// then bare dates at midnight.
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    None
}
