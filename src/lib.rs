pub mod audit;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod dedup;
pub mod error;
pub mod job;
pub mod normalize;
pub mod upsert;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::catalog::TableMode;
use crate::cli::{Cli, Commands};
use crate::config::Settings;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("ds_loader", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(&args),
        Commands::Plan(args) => handle_plan(&args),
    }
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let settings = Settings::load(&args.config)?;
    let job_name = args
        .job_name
        .clone()
        .unwrap_or_else(|| settings.paths.job_name.clone());
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| settings.paths.data_dir.clone());

    info!("Starting job '{job_name}' over {data_dir:?}");
    let mut client = settings.db.connect()?;
    let report = job::run_job(&mut client, &job_name, &data_dir)
        .with_context(|| format!("Running job '{job_name}'"))?;
    info!(
        "Job '{job_name}' finished: {} loaded, {} failed (see logs.etl_audit)",
        report.files_loaded, report.files_failed
    );
    Ok(())
}

fn handle_plan(args: &cli::PlanArgs) -> Result<()> {
    let files = job::discover_files(&args.data_dir)?;
    for path in &files {
        let name = job::file_name_lower(path);
        match catalog::spec_for(&name) {
            Ok(spec) => {
                let mode = match spec.mode {
                    TableMode::Merge(key) => format!("merge on ({})", key.join(", ")),
                    TableMode::Replace => "delete-and-reload".to_string(),
                };
                println!(
                    "{name} -> {table} [{mode}] dates: {dates}",
                    table = spec.table,
                    dates = spec.date_columns.join(", ")
                );
            }
            Err(err) => println!("{name} -> UNMAPPED ({err})"),
        }
    }
    Ok(())
}
