//! Dataset sync configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Dataset sync configuration.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Local folder whose contents make up the remote dataset
    pub mirror_dir: PathBuf,
    /// Dataset CLI binary (name on PATH or absolute path)
    pub cli: String,
    /// Version message passed with `-m`
    pub version_message: String,
    /// Value for `--dir-mode` (skip, zip or tar), left to the CLI when unset
    pub dir_mode: Option<String>,
    /// Kill the CLI if it runs longer than this
    pub timeout: Option<Duration>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            mirror_dir: default_mirror_dir(),
            cli: "kaggle".to_string(),
            version_message: "New video upload".to_string(),
            dir_mode: None,
            timeout: None,
        }
    }
}

impl DatasetConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            mirror_dir: std::env::var("DATASET_MIRROR_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_mirror_dir()),
            cli: std::env::var("DATASET_CLI").unwrap_or_else(|_| "kaggle".to_string()),
            version_message: std::env::var("DATASET_VERSION_MESSAGE")
                .unwrap_or_else(|_| "New video upload".to_string()),
            dir_mode: std::env::var("DATASET_DIR_MODE").ok().filter(|s| !s.is_empty()),
            timeout: std::env::var("DATASET_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        }
    }
}

fn default_mirror_dir() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("kaggle_dataset_folder")
}
