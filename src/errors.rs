//! Error types for the family ledger.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Corrupt collection {}: {reason}", path.display())]
    CorruptCollection { path: PathBuf, reason: String },

    #[error("Invalid generation: {0:?}")]
    InvalidGeneration(String),

    #[error("Name is required")]
    MissingName,

    #[error("Persist error: {0}")]
    Persist(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tempfile::PersistError> for LedgerError {
    fn from(err: tempfile::PersistError) -> Self {
        LedgerError::Persist(err.error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
