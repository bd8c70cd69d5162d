//! Unified error handling for the replay tool.

use crate::config::ConfigError;
use std::path::PathBuf;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] bough_engine::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid record feed {path}: {source}")]
    Records {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AppError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for the replay tool.
pub type Result<T> = std::result::Result<T, AppError>;
