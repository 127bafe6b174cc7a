//! Copy an upload into the dataset mirror and publish a new version.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{info, warn};

use crate::command::{DatasetCommand, DatasetRunner};
use crate::config::DatasetConfig;
use crate::error::DatasetResult;
use crate::fs_utils::copy_into_dir;

const PUBLISHES_TOTAL: &str = "vidrelay_dataset_publishes_total";
const PUBLISH_DURATION_SECONDS: &str = "vidrelay_dataset_publish_duration_seconds";

/// What a successful publish produced.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReceipt {
    /// Where the file landed in the mirror
    pub mirrored_path: PathBuf,
    /// CLI stdout, usually the new version URL
    pub cli_output: String,
    pub duration: Duration,
}

/// Dataset sync: mirror copy followed by a `datasets version` run.
#[derive(Debug, Clone)]
pub struct DatasetSync {
    config: DatasetConfig,
    runner: DatasetRunner,
}

impl DatasetSync {
    pub fn new(config: DatasetConfig) -> Self {
        let runner = DatasetRunner::new().with_timeout(config.timeout);
        Self { config, runner }
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    fn version_command(&self) -> DatasetCommand {
        let cmd = DatasetCommand::version(
            &self.config.cli,
            &self.config.mirror_dir,
            &self.config.version_message,
        );
        match &self.config.dir_mode {
            Some(mode) => cmd.dir_mode(mode),
            None => cmd,
        }
    }

    /// Copy `file` into the mirror and publish a new dataset version.
    ///
    /// The copy is not rolled back when the CLI fails.
    pub async fn publish(&self, file: &Path) -> DatasetResult<PublishReceipt> {
        let start = Instant::now();
        let result = self.publish_inner(file).await;
        let elapsed = start.elapsed();

        let outcome = if result.is_ok() { "success" } else { "failure" };
        counter!(PUBLISHES_TOTAL, "outcome" => outcome).increment(1);
        histogram!(PUBLISH_DURATION_SECONDS).record(elapsed.as_secs_f64());

        result.map(|(mirrored_path, cli_output)| PublishReceipt {
            mirrored_path,
            cli_output,
            duration: elapsed,
        })
    }

    async fn publish_inner(&self, file: &Path) -> DatasetResult<(PathBuf, String)> {
        let mirrored = copy_into_dir(file, &self.config.mirror_dir).await?;
        info!(
            "Copied {} to {}",
            file.display(),
            self.config.mirror_dir.display()
        );

        let output = match self.runner.run(&self.version_command()).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Dataset version publish failed");
                return Err(e);
            }
        };

        info!("Dataset updated successfully");
        if !output.stdout.is_empty() {
            info!(cli_output = %output.stdout, "Dataset CLI output");
        }

        Ok((mirrored, output.stdout))
    }
}
