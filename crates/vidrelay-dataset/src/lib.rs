//! Dataset CLI wrapper for publishing uploaded videos.
//!
//! This crate provides:
//! - A local mirror directory that holds the dataset contents
//! - Type-safe building of the `datasets version` command
//! - A runner with optional timeout that captures the CLI's output
//! - `DatasetSync`, which copies a file into the mirror and publishes it

pub mod command;
pub mod config;
pub mod error;
pub mod fs_utils;
pub mod sync;

pub use command::{check_cli, CommandOutput, DatasetCommand, DatasetRunner};
pub use config::DatasetConfig;
pub use error::{DatasetError, DatasetResult};
pub use fs_utils::copy_into_dir;
pub use sync::{DatasetSync, PublishReceipt};
