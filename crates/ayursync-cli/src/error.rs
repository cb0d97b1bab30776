//! Error handling for the AYUR-SYNC CLI

use thiserror::Error;

use ayursync_core::{ApiError, ConfirmError, GateError};

use crate::config::ConfigError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Confirm(#[from] ConfirmError),

    #[error("{0}")]
    Gate(#[from] GateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Deep reset error: {0}")]
    OperationFailed(String),

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("UI error: {0}")]
    UI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
