//! Structured upload logging.
//!
//! Every log line of one upload cycle or summary relay carries the same
//! correlation id, so a partial chain can be traced end to end.

use tracing::{error, info, warn, Span};
use vidrelay_models::UploadId;

/// Logger bound to one upload id and operation.
#[derive(Debug, Clone)]
pub struct UploadLogger {
    upload_id: String,
    operation: String,
}

impl UploadLogger {
    pub fn new(upload_id: &UploadId, operation: &str) -> Self {
        Self {
            upload_id: upload_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Logger for the same upload under a different operation.
    pub fn for_operation(&self, operation: &str) -> Self {
        Self {
            upload_id: self.upload_id.clone(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            upload_id = %self.upload_id,
            operation = %self.operation,
            "Started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            upload_id = %self.upload_id,
            operation = %self.operation,
            "Progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            upload_id = %self.upload_id,
            operation = %self.operation,
            "Warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            upload_id = %self.upload_id,
            operation = %self.operation,
            "Error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            upload_id = %self.upload_id,
            operation = %self.operation,
            "Completed: {}", message
        );
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span carrying the upload id, for instrumenting futures.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "upload",
            upload_id = %self.upload_id,
            operation = %self.operation
        )
    }
}
