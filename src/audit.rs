//! Audit trail in `logs.etl_audit`: one row per processed file.
//!
//! Lifecycle is START → exactly one of END or ERROR; a run is never reopened.
//! Audit writes commit on their own, outside the file's load transaction, so
//! a rolled-back load still leaves its ERROR row behind.

use anyhow::{Context, Result};
use postgres::Client;

/// Identifier of one audit run, generated by the audit table on START.
pub type RunId = i64;

const START_SQL: &str =
    "INSERT INTO logs.etl_audit (job_name, status) VALUES ($1, 'START') RETURNING run_id";
const FINISH_SQL: &str = "UPDATE logs.etl_audit \
     SET status = $1, rows_processed = $2, finished_at = now(), message = $3 \
     WHERE run_id = $4";

/// Opens an audit run for one file and returns its generated identifier.
pub fn start(client: &mut Client, job_name: &str) -> Result<RunId> {
    let row = client
        .query_one(START_SQL, &[&job_name])
        .context("Recording audit START")?;
    Ok(row.get(0))
}

/// Closes a run as END with the loaded row count and quality summary.
pub fn finish_ok(client: &mut Client, run_id: RunId, rows: i64, message: &str) -> Result<()> {
    client
        .execute(FINISH_SQL, &[&"END", &Some(rows), &Some(message), &run_id])
        .context("Recording audit END")?;
    Ok(())
}

/// Closes a run as ERROR, carrying the failure text.
pub fn finish_err(client: &mut Client, run_id: RunId, message: &str) -> Result<()> {
    client
        .execute(
            FINISH_SQL,
            &[&"ERROR", &None::<i64>, &Some(message), &run_id],
        )
        .context("Recording audit ERROR")?;
    Ok(())
}
