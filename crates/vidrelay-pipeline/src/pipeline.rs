//! Upload pipeline orchestration.
//!
//! One upload cycle is: dataset publish, then notebook trigger, then a
//! counter increment. Cycles are serialized, so the first-upload check and
//! the notebook session can never be raced by a concurrent upload. Summary
//! relays run independently, each in its own browser session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::{Mutex, RwLock};
use vidrelay_dataset::{DatasetConfig, DatasetSync};
use vidrelay_models::{NotebookRunMode, StoredUpload, UploadId, UploadOutcome};
use vidrelay_webdriver::WebDriverClient;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::UploadLogger;
use crate::notebook::BrowserNotebookRunner;
use crate::summary::{build_prompt, BrowserSummarizer};
use crate::traits::{DatasetPublisher, NotebookRunner, Summarizer};

const SUMMARY_RELAYS_TOTAL: &str = "vidrelay_summary_relays_total";
const SUMMARY_RELAY_DURATION_SECONDS: &str = "vidrelay_summary_relay_duration_seconds";

/// Owns the upload counter and the pending summary.
pub struct UploadPipeline {
    publisher: Arc<dyn DatasetPublisher>,
    notebook: Arc<dyn NotebookRunner>,
    summarizer: Arc<dyn Summarizer>,
    /// Held for the whole of an upload cycle
    cycle: Mutex<()>,
    upload_count: AtomicU64,
    pending_summary: RwLock<Option<String>>,
}

impl UploadPipeline {
    pub fn new(
        publisher: Arc<dyn DatasetPublisher>,
        notebook: Arc<dyn NotebookRunner>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            publisher,
            notebook,
            summarizer,
            cycle: Mutex::new(()),
            upload_count: AtomicU64::new(0),
            pending_summary: RwLock::new(None),
        }
    }

    /// Wire the CLI-backed publisher and the browser-backed runners.
    pub fn from_config(dataset: DatasetConfig, config: PipelineConfig) -> PipelineResult<Self> {
        let client = WebDriverClient::new(&config.webdriver_url)?;
        let config = Arc::new(config);

        Ok(Self::new(
            Arc::new(DatasetSync::new(dataset)),
            Arc::new(BrowserNotebookRunner::new(client.clone(), config.clone())),
            Arc::new(BrowserSummarizer::new(client, config)),
        ))
    }

    /// Publish a stored upload and re-run the notebook.
    ///
    /// A dataset failure is an error and leaves the counter untouched. A
    /// notebook failure is reported in the outcome.
    pub async fn process_upload(&self, upload: &StoredUpload) -> PipelineResult<UploadOutcome> {
        let log = UploadLogger::new(&upload.id, "upload_cycle");
        let _cycle = self.cycle.lock().await;

        log.log_start(&format!(
            "Publishing {} ({} bytes)",
            upload.stored_name, upload.size_bytes
        ));

        let receipt = match self.publisher.publish(&upload.path).await {
            Ok(receipt) => receipt,
            Err(e) => {
                log.log_error(&format!("Dataset update failed: {}", e));
                return Err(e.into());
            }
        };
        log.log_progress(&format!(
            "Dataset updated in {:.1}s",
            receipt.duration.as_secs_f64()
        ));

        let count = self.upload_count.load(Ordering::SeqCst);
        let mode = if count == 0 || !self.notebook.has_session().await {
            NotebookRunMode::Fresh
        } else {
            NotebookRunMode::Reuse
        };

        let notebook_log = log.for_operation("notebook_trigger");
        let notebook_triggered = match self.notebook.run(mode, &notebook_log).await {
            Ok(()) => true,
            Err(e) => {
                notebook_log.log_warning(&format!(
                    "Dataset published but notebook run failed: {}",
                    e
                ));
                false
            }
        };

        let upload_count = self.upload_count.fetch_add(1, Ordering::SeqCst) + 1;
        log.log_completion(&format!(
            "Upload #{} processed (mode={}, notebook_triggered={})",
            upload_count, mode, notebook_triggered
        ));

        Ok(UploadOutcome {
            upload_id: upload.id.clone(),
            mode,
            notebook_triggered,
            upload_count,
            summary: self.pending_summary().await,
        })
    }

    /// Turn notebook output into a combined summary and store it.
    ///
    /// A failed relay leaves the previous pending summary in place.
    pub async fn relay_summary(&self, output: &str) -> PipelineResult<String> {
        if output.trim().is_empty() {
            return Err(PipelineError::EmptyOutput);
        }

        let log = UploadLogger::new(&UploadId::new(), "summary_relay");
        log.log_start(&format!("Received {} bytes of notebook output", output.len()));

        let start = Instant::now();
        let result = self.summarizer.summarize(&build_prompt(output), &log).await;

        let outcome = if result.is_ok() { "success" } else { "failure" };
        counter!(SUMMARY_RELAYS_TOTAL, "outcome" => outcome).increment(1);
        histogram!(SUMMARY_RELAY_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        match result {
            Ok(summary) => {
                *self.pending_summary.write().await = Some(summary.clone());
                log.log_completion(&format!("Summary stored ({} chars)", summary.len()));
                Ok(summary)
            }
            Err(e) => {
                log.log_error(&format!("Summary relay failed: {}", e));
                Err(e)
            }
        }
    }

    /// Latest relayed summary. Reading does not clear it.
    pub async fn pending_summary(&self) -> Option<String> {
        self.pending_summary.read().await.clone()
    }

    pub fn upload_count(&self) -> u64 {
        self.upload_count.load(Ordering::SeqCst)
    }

    /// Quit the held notebook session.
    pub async fn shutdown(&self) {
        let _cycle = self.cycle.lock().await;
        self.notebook.close().await;
    }
}
