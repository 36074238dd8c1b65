//! In-memory dataset representation and the encoding-tolerant reader.
//!
//! A [`Dataset`] is one file's worth of rows: a header and a cell matrix.
//! The reader performs no type inference — every cell arrives as
//! `Some(Value::Text(..))`, empty strings included. Distinguishing "empty"
//! from "absent" is the normalizer's job, not the reader's.

use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251, WINDOWS_1252};

use crate::error::LoadError;

/// Legacy exports are semicolon-delimited across the board.
pub const EXPORT_DELIMITER: u8 = b';';

/// Candidate encodings, tried in order. The upstream systems emit a mix of
/// UTF-8 and Windows code pages; windows-1252 decodes any byte sequence, so
/// the ladder always terminates.
const ENCODINGS: &[&Encoding] = &[UTF_8, WINDOWS_1251, WINDOWS_1252];

/// A typed cell value. Cells start life as `Text`; normalization rewrites
/// date and flag columns into `Date` and `Integer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Text(String),
    Date(NaiveDate),
    Integer(i64),
}

impl Value {
    /// Renders the value the way the COPY stream and log lines expect it.
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Integer(i) => i.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// One file's rows. Columns are unique after normalization; rows keep file
/// order throughout the pipeline.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<Value>>>,
}

impl Dataset {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by name, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Reads a semicolon-delimited export, trying each candidate encoding until
/// one decodes the whole file without error.
pub fn read_export(path: &Path) -> Result<Dataset> {
    let bytes = fs::read(path).with_context(|| format!("Reading input file {path:?}"))?;
    let text = decode_export(&bytes, path)?;
    parse_delimited(&text).with_context(|| format!("Parsing delimited data from {path:?}"))
}

fn decode_export(bytes: &[u8], path: &Path) -> Result<String> {
    for encoding in ENCODINGS {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return Ok(text.into_owned());
        }
    }
    // Unreachable while windows-1252 is in the ladder, but the contract is
    // "first clean decode wins, otherwise fail the file".
    Err(LoadError::Decode {
        path: path.to_path_buf(),
        tried: ENCODINGS
            .iter()
            .map(|e| e.name())
            .collect::<Vec<_>>()
            .join(", "),
    }
    .into())
}

fn parse_delimited(text: &str) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(EXPORT_DELIMITER)
        .double_quote(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let columns = reader
        .headers()
        .context("Reading header row")?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Reading data row")?;
        rows.push(
            record
                .iter()
                .map(|field| Some(Value::Text(field.to_string())))
                .collect(),
        );
    }
    Ok(Dataset { columns, rows })
}
