//! Error types for dataset operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors that can occur while publishing a dataset version.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset CLI '{0}' not found in PATH")]
    ToolNotFound(String),

    #[error("Dataset CLI failed: {message}")]
    CommandFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid file path: {0}")]
    InvalidPath(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatasetError {
    /// Create a CLI failure error.
    pub fn command_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::CommandFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Exit code of the CLI, when it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            DatasetError::CommandFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}
