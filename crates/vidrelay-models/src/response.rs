//! HTTP request and response bodies.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Largest notebook output accepted by the callback endpoint.
pub const MAX_NOTEBOOK_OUTPUT_LENGTH: u64 = 100_000;

/// Body returned by the summary endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: Option<String>,
}

/// Body returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Latest pending summary, if any relay has completed yet.
    pub summary: Option<String>,
    pub notebook_triggered: bool,
    /// User-facing notices collected while handling the upload.
    pub messages: Vec<String>,
}

/// Body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Form posted back by the remote notebook with its text output.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct NotebookOutputForm {
    #[validate(length(min = 1, max = 100000, message = "output must be 1-100000 characters"))]
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_response_serializes_null() {
        let json = serde_json::to_value(SummaryResponse { summary: None }).unwrap();
        assert_eq!(json, serde_json::json!({ "summary": null }));
    }

    #[test]
    fn test_notebook_output_validation() {
        let ok = NotebookOutputForm {
            output: "snippet one. snippet two.".to_string(),
        };
        assert!(ok.validate().is_ok());

        let empty = NotebookOutputForm {
            output: String::new(),
        };
        assert!(empty.validate().is_err());

        let huge = NotebookOutputForm {
            output: "x".repeat(MAX_NOTEBOOK_OUTPUT_LENGTH as usize + 1),
        };
        assert!(huge.validate().is_err());
    }
}
