//! Job runner: discovers exports, processes them in deterministic order, and
//! brackets each file with an audit run.
//!
//! One bad file never blocks the rest: its transaction rolls back, the audit
//! row records the failure, and the loop moves on. Only an empty source
//! directory fails the job outright, before any audit run exists.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info};
use postgres::Client;

use crate::audit;
use crate::catalog::{self, LoadSpec};
use crate::dataset::{self, Dataset};
use crate::dedup;
use crate::error::LoadError;
use crate::normalize::{self, LoadStats};
use crate::upsert;

/// Whole-job summary. Individual failures are visible in the audit trail,
/// not in the process exit status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    pub files_loaded: usize,
    pub files_failed: usize,
}

/// Candidate files in lexicographic order of lowercased name, so reruns are
/// reproducible and audit rows are orderable.
pub fn discover_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(data_dir)
        .with_context(|| format!("Listing source directory {data_dir:?}"))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Reading directory entry in {data_dir:?}"))?
            .path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(LoadError::NoInputFiles(data_dir.to_path_buf()).into());
    }
    files.sort_by_key(|p| file_name_lower(p));
    Ok(files)
}

pub(crate) fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Reads, normalizes, and deduplicates one file against its spec. Pure
/// file-side pipeline; no database involved.
pub fn prepare_file(path: &Path, spec: &LoadSpec) -> Result<(Dataset, LoadStats)> {
    let mut ds = dataset::read_export(path)?;
    let date_errors = normalize::normalize(&mut ds, spec.date_columns);
    let rows_deduped = match spec.mode.key_columns() {
        Some(key) => dedup::dedup_by_key(&mut ds, key, path)?,
        None => 0,
    };
    Ok((
        ds,
        LoadStats {
            rows_deduped,
            date_errors,
        },
    ))
}

fn process_file(client: &mut Client, path: &Path) -> Result<(u64, LoadStats)> {
    let name = file_name_lower(path);
    let spec = catalog::spec_for(&name)?;
    let (ds, stats) = prepare_file(path, spec)?;

    let mut tx = client.transaction().context("Opening load transaction")?;
    let rows = upsert::load_dataset(&mut tx, &ds, spec)?;
    tx.commit()
        .with_context(|| format!("Committing load of {name}"))?;
    Ok((rows, stats))
}

/// Runs the whole job: one audit-bracketed unit of work per discovered file,
/// strictly sequential.
pub fn run_job(client: &mut Client, job_name: &str, data_dir: &Path) -> Result<JobReport> {
    let files = discover_files(data_dir)?;
    info!("Processing {} file(s) from {:?}", files.len(), data_dir);

    let mut report = JobReport::default();
    for path in &files {
        let name = file_name_lower(path);
        let run_id = audit::start(client, job_name)?;
        match process_file(client, path) {
            Ok((rows, stats)) => {
                audit::finish_ok(client, run_id, rows as i64, &stats.summary())?;
                info!(
                    "{name}: OK – {rows} rows (deduped={} date_err={})",
                    stats.rows_deduped, stats.date_errors
                );
                report.files_loaded += 1;
            }
            Err(err) => {
                // The load transaction is already gone (dropped = rolled
                // back); only the audit row is written here.
                audit::finish_err(client, run_id, &format!("{err:#}"))?;
                error!("{name}: FAIL – {err:#}");
                report.files_failed += 1;
            }
        }
    }
    Ok(report)
}
