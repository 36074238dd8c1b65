//! YAML settings: database credentials plus run parameters.
//!
//! The document shape matches the legacy `config.yaml` the scheduler already
//! ships: a `db:` section with connection parameters and a `paths:` section
//! with the job name and source directory, both optional with defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use postgres::{Client, NoTls};
use serde::Deserialize;

pub const DEFAULT_JOB_NAME: &str = "csv_load";
pub const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db: DbSettings,
    #[serde(default)]
    pub paths: PathSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_job_name")]
    pub job_name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            job_name: default_job_name(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_job_name() -> String {
    DEFAULT_JOB_NAME.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Opening config file {path:?}"))?;
        serde_yaml::from_str(&raw).with_context(|| format!("Parsing config file {path:?}"))
    }
}

impl DbSettings {
    /// Opens the single long-lived connection the job reuses across files.
    pub fn connect(&self) -> Result<Client> {
        let mut config = postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password);
        config.connect(NoTls).with_context(|| {
            format!(
                "Connecting to database '{}' at {}:{}",
                self.database, self.host, self.port
            )
        })
    }
}
