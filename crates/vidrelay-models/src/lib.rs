//! Shared data models for the VidRelay service.
//!
//! This crate provides Serde-serializable types for:
//! - Upload identifiers and stored upload records
//! - Upload filename validation and sanitization
//! - HTTP request/response bodies shared by the API and its tests
//! - Pipeline outcome reporting

pub mod outcome;
pub mod response;
pub mod upload;

// Re-export common types
pub use outcome::{NotebookRunMode, UploadOutcome};
pub use response::{ErrorBody, NotebookOutputForm, SummaryResponse, UploadResponse};
pub use upload::{
    allowed_file, secure_filename, validate_upload_name, StoredUpload, UploadId, UploadRejection,
    ALLOWED_EXTENSIONS,
};
