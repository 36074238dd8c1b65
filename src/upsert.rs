//! Staging-table bulk load and keyed merge.
//!
//! Everything for one file happens inside the caller's transaction: the
//! delete-and-reload sweep (when the mode calls for it), staging-table
//! creation, the COPY bulk load, and the final merge or insert. A failure at
//! any point leaves the target table untouched once the transaction drops.
//!
//! The SQL builders are pure string functions so the statement shapes are
//! testable without a server.

use anyhow::{Context, Result};
use itertools::Itertools;
use postgres::Transaction;
use std::io::Write;

use crate::catalog::{LoadSpec, TableMode};
use crate::dataset::Dataset;

/// Loads a normalized, deduplicated dataset into its target table. Returns
/// the number of rows staged (which equals the rows merged or inserted).
pub fn load_dataset(tx: &mut Transaction<'_>, dataset: &Dataset, spec: &LoadSpec) -> Result<u64> {
    if spec.mode == TableMode::Replace {
        // Same transaction as the reload: a failure later rolls the delete
        // back instead of leaving the table empty.
        tx.execute(delete_sql(spec.table).as_str(), &[])
            .with_context(|| format!("Clearing {} for reload", spec.table))?;
    }

    tx.batch_execute(create_staging_sql(spec.table).as_str())
        .with_context(|| format!("Creating staging table for {}", spec.table))?;

    let staged = copy_rows(tx, dataset, spec.table)?;

    let merge = match spec.mode {
        TableMode::Merge(key) => merge_sql(spec.table, &dataset.columns, key),
        TableMode::Replace => insert_sql(spec.table),
    };
    tx.execute(merge.as_str(), &[])
        .with_context(|| format!("Merging staged rows into {}", spec.table))?;
    Ok(staged)
}

fn copy_rows(tx: &mut Transaction<'_>, dataset: &Dataset, table: &str) -> Result<u64> {
    let mut writer = tx
        .copy_in(copy_sql(table, &dataset.columns).as_str())
        .with_context(|| format!("Opening COPY stream for {table}"))?;
    let payload = serialize_rows(dataset)?;
    writer
        .write_all(&payload)
        .with_context(|| format!("Writing COPY payload for {table}"))?;
    writer
        .finish()
        .with_context(|| format!("Finishing COPY into staging for {table}"))
}

/// Serializes rows as the CSV the COPY statement expects: minimal quoting,
/// so an unquoted empty field reads back as NULL.
fn serialize_rows(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut buf);
        for row in &dataset.rows {
            let record = row
                .iter()
                .map(|cell| cell.as_ref().map(|v| v.as_display()).unwrap_or_default())
                .collect::<Vec<_>>();
            writer.write_record(&record).context("Serializing COPY row")?;
        }
        writer.flush().context("Flushing COPY payload buffer")?;
    }
    Ok(buf)
}

/// Staging table name for a schema-qualified target, e.g. `ds.ft_balance_f`
/// → `stg_ft_balance_f`. Unqualified: temp tables live in the session schema.
pub fn staging_name(table: &str) -> String {
    let bare = table.rsplit('.').next().unwrap_or(table);
    format!("stg_{bare}")
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_table(table: &str) -> String {
    table.split('.').map(quote_ident).join(".")
}

fn column_list(columns: &[String]) -> String {
    columns.iter().map(|c| quote_ident(c)).join(", ")
}

pub fn create_staging_sql(table: &str) -> String {
    format!(
        "CREATE TEMP TABLE {} (LIKE {}) ON COMMIT DROP",
        quote_ident(&staging_name(table)),
        quote_table(table)
    )
}

pub fn copy_sql(table: &str, columns: &[String]) -> String {
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv)",
        quote_ident(&staging_name(table)),
        column_list(columns)
    )
}

pub fn merge_sql(table: &str, columns: &[String], key: &[&str]) -> String {
    let cols = column_list(columns);
    let conflict = key.iter().map(|c| quote_ident(c)).join(", ");
    let updates = columns
        .iter()
        .filter(|c| !key.contains(&c.as_str()))
        .map(|c| {
            let ident = quote_ident(c);
            format!("{ident} = EXCLUDED.{ident}")
        })
        .join(", ");
    let action = if updates.is_empty() {
        // Every column is part of the key; nothing to overwrite.
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {updates}")
    };
    format!(
        "INSERT INTO {target} ({cols}) SELECT {cols} FROM {staging} ON CONFLICT ({conflict}) {action}",
        target = quote_table(table),
        staging = quote_ident(&staging_name(table)),
    )
}

pub fn insert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {} SELECT * FROM {}",
        quote_table(table),
        quote_ident(&staging_name(table))
    )
}

pub fn delete_sql(table: &str) -> String {
    format!("DELETE FROM {}", quote_table(table))
}
