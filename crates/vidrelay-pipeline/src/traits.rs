//! Seams between the pipeline and its external collaborators.

use std::path::Path;

use async_trait::async_trait;
use vidrelay_dataset::{DatasetResult, DatasetSync, PublishReceipt};
use vidrelay_models::NotebookRunMode;

use crate::error::PipelineResult;
use crate::logging::UploadLogger;

/// Publishes a file as a new dataset version.
#[async_trait]
pub trait DatasetPublisher: Send + Sync {
    async fn publish(&self, file: &Path) -> DatasetResult<PublishReceipt>;
}

#[async_trait]
impl DatasetPublisher for DatasetSync {
    async fn publish(&self, file: &Path) -> DatasetResult<PublishReceipt> {
        DatasetSync::publish(self, file).await
    }
}

/// Re-runs the hosted notebook against the latest dataset version.
#[async_trait]
pub trait NotebookRunner: Send + Sync {
    /// Whether a logged-in session is held for reuse.
    async fn has_session(&self) -> bool;

    /// Run the trigger along the given path.
    async fn run(&self, mode: NotebookRunMode, log: &UploadLogger) -> PipelineResult<()>;

    /// Quit any held session.
    async fn close(&self);
}

/// Turns a prompt into a summary through the chat assistant.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &str, log: &UploadLogger) -> PipelineResult<String>;
}
