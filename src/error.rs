use std::path::PathBuf;

use thiserror::Error;

/// Hard failures that abort a single file's load (or, for
/// [`LoadError::NoInputFiles`], the whole job before it starts).
///
/// Soft conditions — unparseable dates, digit-less flag values — never surface
/// here; they are absorbed by the normalizer and reported through
/// [`crate::normalize::LoadStats`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// No candidate encoding produced a clean decode of the file.
    #[error("cannot decode {path:?} with any of: {tried}")]
    Decode { path: PathBuf, tried: String },

    /// A discovered file has no registered load spec. Configuration error,
    /// not a data error; the file is skipped without touching its table.
    #[error("no load spec registered for file '{0}'")]
    UnknownFile(String),

    /// A declared key column is absent from the file's header row.
    #[error("key column '{column}' missing from {path:?}")]
    MissingKeyColumn { column: String, path: PathBuf },

    /// The source directory holds no candidate files at all. Raised before
    /// any audit run is created.
    #[error("no *.csv files found in {0:?}")]
    NoInputFiles(PathBuf),
}
