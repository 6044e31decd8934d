//! Error kinds raised by the analysis core.
//!
//! - [`PipelineError::InvalidInput`]: degenerate dimensions or configuration.
//!   Fails fast instead of producing an empty table.
//! - [`PipelineError::SubjectLookup`]: a recording does not match exactly one
//!   subject-log entry.  Group assignment is mandatory, so this stops the run.
//! - [`PipelineError::Estimator`]: one (subject, method) estimate failed.  The
//!   orchestrator records it and moves on.
//! - [`PipelineError::Enumeration`]: a reshaped connectivity matrix violates
//!   the structural property of its estimator (mislabelled rows).
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("recording '{file}' matches {matches} subject-log entries (expected exactly 1)")]
    SubjectLookup { file: String, matches: usize },

    #[error("estimator '{method}' failed for subject '{eegid}': {reason}")]
    Estimator {
        eegid: String,
        method: String,
        reason: String,
    },

    #[error("channel-pair enumeration check failed for '{method}': {reason}")]
    Enumeration { method: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Shorthand for `Err(PipelineError::InvalidInput(..))`.
pub(crate) fn invalid<T>(msg: impl Into<String>) -> Result<T> {
    Err(PipelineError::InvalidInput(msg.into()))
}
