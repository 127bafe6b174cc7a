//! Dataset CLI command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{DatasetError, DatasetResult};

/// Builder for `datasets version` commands.
#[derive(Debug, Clone)]
pub struct DatasetCommand {
    /// CLI binary
    program: String,
    /// Dataset folder passed with `-p`
    folder: PathBuf,
    /// Version notes passed with `-m`
    message: String,
    /// Extra trailing arguments
    extra_args: Vec<String>,
}

impl DatasetCommand {
    /// Create a new version command for a dataset folder.
    pub fn version(
        program: impl Into<String>,
        folder: impl AsRef<Path>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            folder: folder.as_ref().to_path_buf(),
            message: message.into(),
            extra_args: Vec::new(),
        }
    }

    /// Add a trailing argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Upload the folder contents as-is instead of letting the CLI zip them.
    pub fn dir_mode(self, mode: impl Into<String>) -> Self {
        self.arg("--dir-mode").arg(mode)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "datasets".to_string(),
            "version".to_string(),
            "-p".to_string(),
            self.folder.to_string_lossy().to_string(),
            "-m".to_string(),
            self.message.clone(),
        ];
        args.extend(self.extra_args.clone());
        args
    }
}

/// Captured output of a finished CLI run.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runner for dataset CLI commands with an optional timeout.
#[derive(Debug, Default, Clone)]
pub struct DatasetRunner {
    timeout: Option<Duration>,
}

impl DatasetRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a command; a non-zero exit status is an error.
    pub async fn run(&self, cmd: &DatasetCommand) -> DatasetResult<CommandOutput> {
        check_cli(cmd.program())?;

        let args = cmd.build_args();
        debug!("Running dataset CLI: {} {}", cmd.program(), args.join(" "));

        let child = Command::new(cmd.program())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    // Dropping the future drops the child, which kills it.
                    warn!(
                        "Dataset CLI timed out after {} seconds, killing process",
                        timeout.as_secs()
                    );
                    return Err(DatasetError::Timeout(timeout.as_secs()));
                }
            },
            None => child.wait_with_output().await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(DatasetError::command_failed(
                "Dataset CLI exited with non-zero status",
                (!stderr.is_empty()).then_some(stderr),
                output.status.code(),
            ))
        }
    }
}

/// Check that the dataset CLI is available.
pub fn check_cli(program: &str) -> DatasetResult<PathBuf> {
    which::which(program).map_err(|_| DatasetError::ToolNotFound(program.to_string()))
}
