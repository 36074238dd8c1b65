use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Load legacy delimited exports into the warehouse", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the load job: every export in the source directory, in order
    Run(RunArgs),
    /// Show which table, mode, and key each discovered file would load into
    Plan(PlanArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// YAML config with database credentials and run parameters
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,
    /// Override the source directory from the config
    #[arg(long = "data-dir")]
    pub data_dir: Option<PathBuf>,
    /// Override the job name recorded in the audit trail
    #[arg(long = "job-name")]
    pub job_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Directory holding the candidate *.csv exports
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: PathBuf,
}
