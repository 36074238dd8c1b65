//! Primary-key deduplication, last occurrence wins.
//!
//! Later rows in a legacy export are corrections of earlier ones, so when two
//! rows share a key tuple only the last survives, at its original position.
//! Tables without a declared key are fully replaced each run, so their
//! duplicates are immaterial and the dataset passes through untouched.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;

use crate::dataset::{Dataset, Value};
use crate::error::LoadError;

/// Collapses rows sharing the key tuple, keeping the last occurrence in file
/// order. Returns the number of rows dropped.
pub fn dedup_by_key(dataset: &mut Dataset, key: &[&str], path: &Path) -> Result<usize> {
    if key.is_empty() {
        return Ok(0);
    }
    let mut indices = Vec::with_capacity(key.len());
    for column in key {
        let idx = dataset
            .column_index(column)
            .ok_or_else(|| LoadError::MissingKeyColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            })?;
        indices.push(idx);
    }

    let before = dataset.rows.len();
    let mut seen: HashSet<Vec<Option<Value>>> = HashSet::with_capacity(before);
    let mut kept = Vec::with_capacity(before);
    // Scan from the end so the first sighting of each key is its last
    // occurrence, then restore file order.
    for row in dataset.rows.drain(..).rev() {
        let tuple = indices
            .iter()
            .map(|&i| row.get(i).cloned().flatten())
            .collect::<Vec<_>>();
        if seen.insert(tuple) {
            kept.push(row);
        }
    }
    kept.reverse();
    dataset.rows = kept;
    Ok(before - dataset.rows.len())
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
    fn keeps_last_occurrence_of_duplicate_keys() {
        let mut ds = dataset(
            &["id", "amount"],
            vec![
                vec![text("1"), text("old")],
                vec![text("2"), text("only")],
                vec![text("1"), text("new")],
            ],
        );
        let removed = dedup_by_key(&mut ds, &["id"], Path::new("t.csv")).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(ds.rows.len(), 2);
        assert_eq!(ds.rows[0][1], text("only"));
        assert_eq!(ds.rows[1][1], text("new"));
    }

    #[test]
    fn composite_keys_compare_all_columns() {
        let mut ds = dataset(
            &["d", "rk", "v"],
            vec![
                vec![text("2024-01-01"), text("7"), text("a")],
                vec![text("2024-01-01"), text("8"), text("b")],
                vec![text("2024-01-01"), text("7"), text("c")],
            ],
        );
        let removed = dedup_by_key(&mut ds, &["d", "rk"], Path::new("t.csv")).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(ds.rows[0][2], text("b"));
        assert_eq!(ds.rows[1][2], text("c"));
    }

    #[test]
    fn null_key_cells_collapse_together() {
        let mut ds = dataset(
            &["id", "v"],
            vec![vec![None, text("first")], vec![None, text("second")]],
        );
        let removed = dedup_by_key(&mut ds, &["id"], Path::new("t.csv")).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(ds.rows[0][1], text("second"));
    }

    #[test]
    fn empty_key_passes_through() {
        let mut ds = dataset(&["a"], vec![vec![text("x")], vec![text("x")]]);
        let removed = dedup_by_key(&mut ds, &[], Path::new("t.csv")).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(ds.rows.len(), 2);
    }

    #[test]
    fn missing_key_column_is_a_hard_error() {
        let mut ds = dataset(&["a"], vec![vec![text("x")]]);
        let err = dedup_by_key(&mut ds, &["id"], Path::new("t.csv")).unwrap_err();
        assert!(err.to_string().contains("id"));
    }
}
