//! Error taxonomy for the repair-and-execute pipeline.
//!
//! | Variant | HTTP | Retried |
//! |---------|------|---------|
//! | [`PipelineError::Validation`] | 400 | never |
//! | [`PipelineError::SafetyRejection`] | 400 | never |
//! | [`PipelineError::Execution`] | 500 | never |
//! | [`PipelineError::ArtifactMissing`] | 400 | never |
//! | [`PipelineError::Internal`] | 500 | never |
//!
//! Rewrite failures never surface here: they degrade into a fix record.
//! Persistence failures are logged by the recorder and swallowed.

use axum::http::StatusCode;

pub const NO_ARTIFACT_MESSAGE: &str = "No PDF file was generated. Check your code for errors.";

pub const BROWSER_ADVISORY: &str =
    "JavaScript execution requires Node.js setup. Please use Python or HTML instead.";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("Code contains potentially dangerous pattern: {pattern}")]
    SafetyRejection { pattern: String },

    #[error("Code execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("{}", artifact_missing_message(.detail.as_deref()))]
    ArtifactMissing { detail: Option<String> },

    #[error("Unexpected error: {0}")]
    Internal(String),
}

fn artifact_missing_message(detail: Option<&str>) -> String {
    match detail {
        Some(d) if !d.trim().is_empty() => format!("{}\n\nOutput:\n{}", NO_ARTIFACT_MESSAGE, d),
        _ => NO_ARTIFACT_MESSAGE.to_string(),
    }
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_)
            | PipelineError::SafetyRejection { .. }
            | PipelineError::ArtifactMissing { .. } => StatusCode::BAD_REQUEST,
            PipelineError::Execution(_) | PipelineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Failure of a dialect's execution strategy.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The snippet or renderer ran and exited unsuccessfully. Carries the
    /// underlying cause verbatim.
    #[error("{0}")]
    Failed(String),

    #[error("execution timed out after {0}s")]
    TimedOut(u64),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Unsupported(&'static str),

    /// The process exited cleanly but left no PDF behind.
    #[error("no PDF artifact produced")]
    NoArtifact { output: Option<String> },

    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecutionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::Failed(_) => "failed",
            ExecutionError::TimedOut(_) => "timeout",
            ExecutionError::Spawn { .. } => "spawn",
            ExecutionError::Unsupported(_) => "unsupported",
            ExecutionError::NoArtifact { .. } => "no_artifact",
            ExecutionError::Io(_) => "io",
        }
    }
}

/// Failure inside a single rewrite rule.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("invalid rule pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("rule panicked: {0}")]
    Panicked(String),
}
