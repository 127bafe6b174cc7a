//! Upload pipeline for vidrelay.
//!
//! This crate provides:
//! - Dataset publish through the CLI-backed [`DatasetPublisher`]
//! - Notebook re-runs through a reusable logged-in browser session
//! - Summary relay through a per-request chat browser session
//! - The [`UploadPipeline`] that owns the upload counter and pending summary

pub mod config;
pub mod error;
pub mod logging;
pub mod notebook;
pub mod pipeline;
pub mod summary;
pub mod traits;

pub use config::{ChatSelectors, NotebookSelectors, Pauses, PipelineConfig, Secret};
pub use error::{PipelineError, PipelineResult};
pub use logging::UploadLogger;
pub use notebook::BrowserNotebookRunner;
pub use pipeline::UploadPipeline;
pub use summary::{build_prompt, BrowserSummarizer};
pub use traits::{DatasetPublisher, NotebookRunner, Summarizer};
