//! Pipeline coordinator: one request from raw snippet to PDF bytes.
//!
//! ```text
//! Received ─▶ Validated ─▶ Filtered ─▶ Rewritten ─▶ Executed ─▶ ArtifactLocated
//!     │            │            │                       │               │
//!     └────────────┴────────────┴──── first failure ────┴───────────────┘
//!                                        │
//!                                        ▼
//!                            Recorded ─▶ Responded
//! ```
//!
//! Every run, successful or not, builds exactly one [`PipelineOutcome`] and
//! hands it to the [`Recorder`] exactly once. The coordinator holds no
//! per-request state, so one instance is shared behind an `Arc` by every
//! handler. Each execution happens in a fresh temporary workspace that is
//! removed before [`Pipeline::run`] returns; the PDF bytes are read into
//! memory first.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ExecutionError, PipelineError};
use crate::execute::StrategyRegistry;
use crate::models::{Dialect, ExecutionOutcome, FixRecord, GeneratedPdf, PipelineOutcome, Snippet};
use crate::rewrite;
use crate::safety::{SafetyFilter, Verdict};
use crate::store::Recorder;

pub const EMPTY_SNIPPET_MESSAGE: &str = "Please enter some code to generate PDF";

/// Raw input of one pipeline run, as received from a front end.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub language: String,
    pub code: String,
    /// Best-effort network address of the submitter.
    pub caller: Option<String>,
}

impl GenerateRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            caller: None,
        }
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }
}

/// Everything one run produced.
#[derive(Debug)]
pub struct PipelineRun {
    pub outcome: PipelineOutcome,
    pub result: Result<GeneratedPdf, PipelineError>,
    /// The spawned recorder task. Dropping it does not cancel recording.
    pub recording: JoinHandle<()>,
}

pub struct Pipeline {
    filter: SafetyFilter,
    strategies: StrategyRegistry,
    recorder: Recorder,
    permits: Arc<Semaphore>,
    work_root: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(config: &Config, recorder: Recorder) -> Self {
        Self {
            filter: SafetyFilter::new(config.safety.carve_out),
            strategies: StrategyRegistry::from_config(&config.execution),
            recorder,
            permits: Arc::new(Semaphore::new(config.execution.max_concurrent.max(1))),
            work_root: config.execution.work_root.clone(),
        }
    }

    /// Replaces the execution strategies.
    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Runs `request` to completion and records its outcome.
    pub async fn run(&self, request: GenerateRequest) -> PipelineRun {
        let started = Instant::now();
        let created_at = Utc::now();
        let span = tracing::info_span!(
            "generate",
            request_id = %Uuid::new_v4(),
            language = %request.language.trim(),
        );

        let mut fixes: Vec<FixRecord> = Vec::new();
        let result = self
            .process(&request, &mut fixes)
            .instrument(span.clone())
            .await;
        self.conclude(request, fixes, result, started, created_at, span)
    }

    /// Records a request a front end refused before it reached the
    /// pipeline, such as an unreadable form body.
    pub fn reject(&self, request: GenerateRequest, error: PipelineError) -> PipelineRun {
        let span = tracing::info_span!(
            "generate",
            request_id = %Uuid::new_v4(),
            language = %request.language.trim(),
        );
        self.conclude(request, Vec::new(), Err(error), Instant::now(), Utc::now(), span)
    }

    fn conclude(
        &self,
        request: GenerateRequest,
        fixes: Vec<FixRecord>,
        result: Result<GeneratedPdf, PipelineError>,
        started: Instant,
        created_at: DateTime<Utc>,
        span: tracing::Span,
    ) -> PipelineRun {
        let duration = started.elapsed();

        let (artifact_size, error_message) = match &result {
            Ok(pdf) => (Some(pdf.bytes.len() as u64), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let outcome = PipelineOutcome {
            dialect: request.language.trim().to_lowercase(),
            input_length: request.code.trim().chars().count(),
            success: result.is_ok(),
            error_message,
            fixes: fixes.into_iter().map(|f| f.0).collect(),
            artifact_size,
            duration,
            caller: request.caller,
            created_at,
        };

        span.in_scope(|| match &result {
            Ok(pdf) => tracing::info!(
                file = %pdf.file_name,
                bytes = pdf.bytes.len(),
                secs = %format!("{:.2}", duration.as_secs_f64()),
                "PDF generated"
            ),
            Err(e) => tracing::warn!(status = e.status().as_u16(), error = %e, "generation failed"),
        });

        let recording = self.recorder.record(outcome.clone());
        PipelineRun {
            outcome,
            result,
            recording,
        }
    }

    async fn process(
        &self,
        request: &GenerateRequest,
        fixes: &mut Vec<FixRecord>,
    ) -> Result<GeneratedPdf, PipelineError> {
        let snippet = validate(request)?;

        if let Verdict::Reject { pattern } = self.filter.evaluate(&snippet.text) {
            tracing::warn!(pattern, "snippet rejected by safety filter");
            return Err(PipelineError::SafetyRejection {
                pattern: pattern.to_string(),
            });
        }

        tracing::info!(chars = snippet.len(), "processing snippet");
        let rewritten = rewrite::rewrite(snippet.dialect, &snippet.text);
        fixes.extend(rewritten.fixes);

        let strategy = self.strategies.get(snippet.dialect).ok_or_else(|| {
            PipelineError::Internal(format!("no execution strategy for {}", snippet.dialect))
        })?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))?;

        let workspace = self.workspace()?;
        let execution = strategy.execute(&rewritten.text, workspace.path()).await;
        tracing::debug!(
            strategy = strategy.name(),
            outcome = ?ExecutionOutcome::from(&execution),
            "execution finished"
        );

        let artifact = match execution {
            Ok(artifact) => artifact,
            Err(ExecutionError::NoArtifact { output }) => {
                return Err(PipelineError::ArtifactMissing { detail: output });
            }
            Err(e) => {
                tracing::error!(kind = e.kind(), error = %e, "snippet execution failed");
                return Err(PipelineError::Execution(e));
            }
        };

        let bytes = tokio::fs::read(&artifact.path)
            .await
            .map_err(|e| PipelineError::Internal(format!("failed to read PDF: {}", e)))?;
        if bytes.is_empty() {
            return Err(PipelineError::ArtifactMissing {
                detail: artifact.output_tail,
            });
        }

        let file_name = artifact
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        Ok(GeneratedPdf { file_name, bytes })
    }

    fn workspace(&self) -> Result<tempfile::TempDir, PipelineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("inkpress-");
        let dir = match &self.work_root {
            Some(root) => std::fs::create_dir_all(root).and_then(|_| builder.tempdir_in(root)),
            None => builder.tempdir(),
        };
        dir.map_err(|e| PipelineError::Internal(format!("failed to create workspace: {}", e)))
    }
}

fn validate(request: &GenerateRequest) -> Result<Snippet, PipelineError> {
    let dialect: Dialect = request
        .language
        .parse()
        .map_err(PipelineError::Validation)?;
    let text = request.code.trim();
    if text.is_empty() {
        return Err(PipelineError::Validation(EMPTY_SNIPPET_MESSAGE.to_string()));
    }
    Ok(Snippet {
        dialect,
        text: text.to_string(),
    })
}
