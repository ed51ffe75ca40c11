//! Core data models used throughout inkpress.
//!
//! These types represent the snippets, fix records, and outcomes that flow
//! through the repair-and-execute pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ExecutionError;

/// A supported snippet language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// ReportLab document assembly (`python`).
    Procedural,
    /// HTML/CSS rendered to PDF (`html`).
    Markup,
    /// Matplotlib figures (`matplotlib`).
    Visualization,
    /// jsPDF scripts (`javascript`). Never executed.
    BrowserScript,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Procedural,
        Dialect::Markup,
        Dialect::Visualization,
        Dialect::BrowserScript,
    ];

    /// Wire tag accepted by the HTTP front end and persisted with outcomes.
    pub fn tag(&self) -> &'static str {
        match self {
            Dialect::Procedural => "python",
            Dialect::Markup => "html",
            Dialect::Visualization => "matplotlib",
            Dialect::BrowserScript => "javascript",
        }
    }

    pub fn supported_tags() -> String {
        Self::ALL
            .iter()
            .map(|d| d.tag())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.tag() == tag)
            .ok_or_else(|| {
                format!(
                    "Unsupported language: {}. Supported: {}",
                    tag,
                    Self::supported_tags()
                )
            })
    }
}

/// A validated snippet owned by one pipeline invocation.
#[derive(Debug, Clone)]
pub struct Snippet {
    pub dialect: Dialect,
    pub text: String,
}

impl Snippet {
    /// Length in characters, as recorded in outcomes.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// One automatic repair applied to a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FixRecord(pub String);

impl FixRecord {
    pub fn new(description: impl Into<String>) -> Self {
        Self(description.into())
    }

    pub fn description(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FixRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized snippet text plus the fixes that produced it, in rule order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub text: String,
    pub fixes: Vec<FixRecord>,
}

impl RewriteResult {
    pub fn descriptions(&self) -> Vec<String> {
        self.fixes.iter().map(|f| f.0.clone()).collect()
    }
}

/// PDF located by an execution strategy inside its workspace.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Tail of the snippet's combined output, kept for diagnostics.
    pub output_tail: Option<String>,
}

/// Tagged result of running a dialect's execution strategy.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Success {
        artifact_path: PathBuf,
        artifact_size_bytes: u64,
    },
    Failure {
        error_kind: &'static str,
        message: String,
    },
}

impl From<&Result<Artifact, ExecutionError>> for ExecutionOutcome {
    fn from(result: &Result<Artifact, ExecutionError>) -> Self {
        match result {
            Ok(artifact) => ExecutionOutcome::Success {
                artifact_path: artifact.path.clone(),
                artifact_size_bytes: artifact.size_bytes,
            },
            Err(e) => ExecutionOutcome::Failure {
                error_kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

/// The PDF bytes handed back to the caller.
#[derive(Debug, Clone)]
pub struct GeneratedPdf {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Complete record of one pipeline invocation. Never mutated once built.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    /// Dialect tag as submitted (unknown tags are recorded verbatim).
    pub dialect: String,
    pub input_length: usize,
    pub success: bool,
    pub error_message: Option<String>,
    pub fixes: Vec<String>,
    pub artifact_size: Option<u64>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub caller: Option<String>,
    pub created_at: DateTime<Utc>,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
