//! Column-name, string, date, and flag normalization.
//!
//! Applied in a fixed order: headers first (everything downstream keys on the
//! normalized names), then string trimming, then date coercion, then flag
//! coercion. Date and flag coercion are soft: malformed input never aborts a
//! file, it degrades to NULL / zero with the date failures counted.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::dataset::{Dataset, Value};

/// Columns whose normalized name starts with this prefix carry flag
/// semantics; upstream exports decorate them ("1 - Yes", "0 нет").
pub const FLAG_PREFIX: &str = "is_";

/// Day-first format ladder for the free-form dates in the legacy exports.
/// ISO forms come after the day-first ones so "03.04.2024" reads as 3 April.
const DATE_FORMATS: &[&str] = &[
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%y",
];

/// Per-file quality counters surfaced into the audit message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows_deduped: usize,
    pub date_errors: usize,
}

impl LoadStats {
    /// Deterministic, greppable summary carried in the audit END message.
    pub fn summary(&self) -> String {
        format!("deduped={}, date_err={}", self.rows_deduped, self.date_errors)
    }
}

/// Normalizes a dataset in place against its declared date columns and
/// returns the date-parse error count.
pub fn normalize(dataset: &mut Dataset, date_columns: &[&str]) -> usize {
    normalize_headers(dataset);
    trim_text(dataset);
    let date_errors = coerce_dates(dataset, date_columns);
    coerce_flags(dataset);
    date_errors
}

fn normalize_headers(dataset: &mut Dataset) {
    for column in &mut dataset.columns {
        *column = column.trim().to_lowercase();
    }
}

fn trim_text(dataset: &mut Dataset) {
    for row in &mut dataset.rows {
        for cell in row.iter_mut() {
            if let Some(Value::Text(s)) = cell {
                let trimmed = s.trim();
                if trimmed.len() != s.len() {
                    *s = trimmed.to_string();
                }
            }
        }
    }
}

fn coerce_dates(dataset: &mut Dataset, date_columns: &[&str]) -> usize {
    let mut errors = 0;
    for name in date_columns {
        // A declared date column absent from the file is simply skipped;
        // the exports have dropped trailing columns before.
        let Some(idx) = dataset.column_index(name) else {
            continue;
        };
        for row in &mut dataset.rows {
            let Some(cell) = row.get_mut(idx) else {
                continue;
            };
            let raw = match cell {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            if raw.trim().is_empty() {
                *cell = None;
                continue;
            }
            match parse_date_dayfirst(&raw) {
                Some(date) => *cell = Some(Value::Date(date)),
                None => {
                    *cell = None;
                    errors += 1;
                }
            }
        }
    }
    errors
}

/// Parses a free-form date, preferring day-first interpretations. Tolerates
/// a trailing time component by only considering the leading token.
pub fn parse_date_dayfirst(value: &str) -> Option<NaiveDate> {
    let token = value.trim().split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

fn coerce_flags(dataset: &mut Dataset) {
    let flag_indices = dataset
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| name.starts_with(FLAG_PREFIX))
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();
    if flag_indices.is_empty() {
        return;
    }
    for row in &mut dataset.rows {
        for &idx in &flag_indices {
            if let Some(cell) = row.get_mut(idx) {
                let raw = match cell {
                    Some(Value::Text(s)) => s.as_str(),
                    Some(Value::Integer(_)) => continue,
                    _ => "",
                };
                *cell = Some(Value::Integer(extract_flag(raw)));
            }
        }
    }
}

/// First run of digits in the raw text, zero when there is none. Never fails:
/// decorated values like "1 - Yes" are the norm, garbage means "off".
pub fn extract_flag(raw: &str) -> i64 {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("digit pattern"));
    digits
        .find(raw)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Option<Value> {
        Some(Value::Text(s.to_string()))
    }

    fn dataset(columns: &[&str], rows: Vec<Vec<Option<Value>>>) -> Dataset {
        Dataset {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn headers_are_trimmed_and_lowercased() {
        let mut ds = dataset(&["  On_Date ", "ACCOUNT_RK"], vec![]);
        normalize(&mut ds, &[]);
        assert_eq!(ds.columns, vec!["on_date", "account_rk"]);
    }

    #[test]
    fn text_cells_are_trimmed() {
        let mut ds = dataset(&["a"], vec![vec![text("  padded  ")]]);
        normalize(&mut ds, &[]);
        assert_eq!(ds.rows[0][0], text("padded"));
    }

    #[test]
    fn dates_parse_day_first() {
        assert_eq!(
            parse_date_dayfirst("03.04.2024"),
            NaiveDate::from_ymd_opt(2024, 4, 3)
        );
        assert_eq!(
            parse_date_dayfirst("2024-01-31"),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
        assert_eq!(
            parse_date_dayfirst("31/12/2023 00:00:00"),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
        assert_eq!(parse_date_dayfirst("not a date"), None);
    }

    #[test]
    fn blank_dates_are_null_without_counting_an_error() {
        let mut ds = dataset(&["on_date"], vec![vec![text("  ")], vec![text("")]]);
        let errors = normalize(&mut ds, &["on_date"]);
        assert_eq!(errors, 0);
        assert_eq!(ds.rows[0][0], None);
        assert_eq!(ds.rows[1][0], None);
    }

    #[test]
    fn unparseable_dates_count_one_error_each() {
        let mut ds = dataset(
            &["on_date"],
            vec![vec![text("31.12.2023")], vec![text("pending")], vec![text("??")]],
        );
        let errors = normalize(&mut ds, &["on_date"]);
        assert_eq!(errors, 2);
        assert_eq!(
            ds.rows[0][0],
            Some(Value::Date(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()))
        );
        assert_eq!(ds.rows[1][0], None);
        assert_eq!(ds.rows[2][0], None);
    }

    #[test]
    fn declared_date_column_missing_from_file_is_skipped() {
        let mut ds = dataset(&["other"], vec![vec![text("x")]]);
        let errors = normalize(&mut ds, &["on_date"]);
        assert_eq!(errors, 0);
        assert_eq!(ds.rows[0][0], text("x"));
    }

    #[test]
    fn flag_columns_extract_first_digit_run() {
        let mut ds = dataset(
            &["is_active", "name"],
            vec![
                vec![text("1 - Yes"), text("a")],
                vec![text("No"), text("b")],
                vec![text(" 0 нет "), text("c")],
            ],
        );
        normalize(&mut ds, &[]);
        assert_eq!(ds.rows[0][0], Some(Value::Integer(1)));
        assert_eq!(ds.rows[1][0], Some(Value::Integer(0)));
        assert_eq!(ds.rows[2][0], Some(Value::Integer(0)));
        assert_eq!(ds.rows[0][1], text("a"));
    }

    #[test]
    fn flag_prefix_matches_after_header_normalization() {
        let mut ds = dataset(&[" IS_DELETED "], vec![vec![text("10 - removed")]]);
        normalize(&mut ds, &[]);
        assert_eq!(ds.columns, vec!["is_deleted"]);
        assert_eq!(ds.rows[0][0], Some(Value::Integer(10)));
    }

    #[test]
    fn stats_summary_is_deterministic() {
        let stats = LoadStats {
            rows_deduped: 3,
            date_errors: 1,
        };
        assert_eq!(stats.summary(), "deduped=3, date_err=1");
    }
}
