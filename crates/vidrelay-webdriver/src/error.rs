//! WebDriver error types.

use thiserror::Error;

/// Result type for WebDriver operations.
pub type BrowserResult<T> = Result<T, BrowserError>;

/// W3C error code for a lookup that matched nothing.
pub const NO_SUCH_ELEMENT: &str = "no such element";

/// W3C error code for an element reference that left the DOM.
pub const STALE_ELEMENT: &str = "stale element reference";

/// Errors that can occur while driving a browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("WebDriver error (status {status}) {error}: {message}")]
    WebDriver {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Invalid WebDriver response: {0}")]
    InvalidResponse(String),

    #[error("Invalid WebDriver URL: {0}")]
    InvalidUrl(String),

    #[error("Timed out after {waited_ms}ms waiting for {locator}")]
    Timeout { locator: String, waited_ms: u64 },

    #[error("No element matching {locator} has text '{text}'")]
    TextNotFound { locator: String, text: String },
}

impl BrowserError {
    /// True when a lookup simply found nothing (yet).
    pub fn is_no_such_element(&self) -> bool {
        matches!(self, BrowserError::WebDriver { error, .. } if error == NO_SUCH_ELEMENT)
    }

    /// True when an element handle went stale between lookup and use.
    pub fn is_stale(&self) -> bool {
        matches!(self, BrowserError::WebDriver { error, .. } if error == STALE_ELEMENT)
    }

    /// True when the failure was a bounded wait running out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BrowserError::Timeout { .. })
    }
}

impl From<reqwest::Error> for BrowserError {
    fn from(err: reqwest::Error) -> Self {
        BrowserError::Network(err.to_string())
    }
}
