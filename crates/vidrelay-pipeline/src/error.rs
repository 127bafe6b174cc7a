//! Pipeline error types.

use thiserror::Error;
use vidrelay_dataset::DatasetError;
use vidrelay_webdriver::BrowserError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Dataset update failed: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Browser automation failed: {0}")]
    Browser(#[from] BrowserError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Notebook output is empty")]
    EmptyOutput,
}

impl PipelineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if a browser wait ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::Browser(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_timeout() {
        let err: PipelineError = BrowserError::Timeout {
            locator: "css `#x`".to_string(),
            waited_ms: 30_000,
        }
        .into();
        assert!(err.is_timeout());

        let err: PipelineError = BrowserError::Network("connection refused".to_string()).into();
        assert!(!err.is_timeout());
        assert!(!PipelineError::EmptyOutput.is_timeout());
    }
}
