//! Outcome of one upload cycle.

use serde::{Deserialize, Serialize};

use crate::upload::UploadId;

/// How the notebook trigger obtained its browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotebookRunMode {
    /// New browser session with the full login sequence.
    Fresh,
    /// Existing logged-in session, re-run chain only.
    Reuse,
}

impl NotebookRunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotebookRunMode::Fresh => "fresh",
            NotebookRunMode::Reuse => "reuse",
        }
    }
}

impl std::fmt::Display for NotebookRunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of an upload cycle whose dataset publish succeeded.
///
/// A failed dataset publish is reported as an error instead, since the
/// notebook is never touched in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub upload_id: UploadId,
    /// Session path the notebook trigger was asked to take.
    pub mode: NotebookRunMode,
    /// Whether the notebook re-run chain completed.
    pub notebook_triggered: bool,
    /// Upload counter after this cycle.
    pub upload_count: u64,
    /// Pending summary at the time the cycle finished.
    pub summary: Option<String>,
}
