//! Upload identifiers and filename rules.
//!
//! Uploaded videos are accepted only with an allowed extension, and their
//! names are reduced to a filesystem-safe ASCII form before being written.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

/// Video extensions accepted by the intake endpoint (compared lowercase).
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

/// Characters that survive sanitization.
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("valid filename regex"));

/// Unique identifier for one upload cycle, used to correlate logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(pub String);

impl UploadId {
    /// Generate a new random upload ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why an upload was turned away before anything was written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("No file part in form.")]
    MissingFilePart,

    #[error("No selected file.")]
    EmptyFilename,

    #[error("File type not allowed. Allowed types: mp4, avi, mov.")]
    ExtensionNotAllowed(String),

    #[error("Filename '{0}' does not contain any usable characters.")]
    UnusableFilename(String),
}

impl UploadRejection {
    /// Short machine-readable reason, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            UploadRejection::MissingFilePart => "missing_file_part",
            UploadRejection::EmptyFilename => "empty_filename",
            UploadRejection::ExtensionNotAllowed(_) => "extension_not_allowed",
            UploadRejection::UnusableFilename(_) => "unusable_filename",
        }
    }
}

/// A video that has been written to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUpload {
    pub id: UploadId,
    /// Name as sent by the client.
    pub original_name: String,
    /// Sanitized name the file was stored under.
    pub stored_name: String,
    /// Absolute path of the stored file.
    pub path: PathBuf,
    pub size_bytes: u64,
    pub uploaded_by: String,
    pub received_at: DateTime<Utc>,
}

/// Check whether a filename carries one of the allowed video extensions.
///
/// The extension is whatever follows the last `.`; a name without a dot is
/// never allowed.
pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Reduce a client-supplied filename to a safe, flat ASCII name.
///
/// The name is NFKD-folded and what is still non-ASCII is dropped, so `é`
/// becomes `e`. Path separators become whitespace,
/// whitespace runs collapse into `_`, anything outside `[A-Za-z0-9_.-]` is
/// removed, and leading/trailing `.` and `_` are stripped. The result may be
/// empty.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .nfkd()
        .filter(|c| c.is_ascii())
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let stripped = UNSAFE_CHARS.replace_all(&joined, "");

    stripped.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Validate a raw multipart filename and return the name to store it under.
pub fn validate_upload_name(raw: &str) -> Result<String, UploadRejection> {
    if raw.is_empty() {
        return Err(UploadRejection::EmptyFilename);
    }

    if !allowed_file(raw) {
        return Err(UploadRejection::ExtensionNotAllowed(raw.to_string()));
    }

    let safe = secure_filename(raw);
    if safe.is_empty() || !allowed_file(&safe) {
        return Err(UploadRejection::UnusableFilename(raw.to_string()));
    }

    Ok(safe)
}
