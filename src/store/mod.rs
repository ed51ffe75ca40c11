//! Outcome persistence.
//!
//! The [`OutcomeStore`] trait is the persistence collaborator of the
//! pipeline: it appends one [`PipelineOutcome`] per invocation and answers
//! the aggregate queries behind `GET /stats` and `inkpress stats`.
//!
//! Implementations must be `Send + Sync` so they can be shared across
//! request handlers.
//!
//! The [`Recorder`] sits between the pipeline and the store. It never fails
//! a request: append errors are logged and dropped.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryOutcomeStore;
pub use sqlite::SqliteOutcomeStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::models::PipelineOutcome;

/// Aggregate view over every recorded outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationSummary {
    pub total: i64,
    pub successful: i64,
    /// One entry per dialect tag, ordered by tag.
    pub languages: Vec<LanguageSummary>,
    /// Most recent first.
    pub recent: Vec<RecentGeneration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageSummary {
    pub language: String,
    pub count: i64,
    /// Mean duration in seconds over the outcomes that recorded one.
    pub avg_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentGeneration {
    pub language: String,
    pub success: bool,
    pub created_at: DateTime<Utc>,
    pub file_size: Option<i64>,
    pub generation_time: Option<f64>,
}

/// Persistence backend for pipeline outcomes.
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Appends one outcome. Outcomes are never updated.
    async fn append(&self, outcome: &PipelineOutcome) -> Result<()>;

    /// Totals, per-dialect breakdown and the `recent_limit` newest outcomes.
    async fn summary(&self, recent_limit: i64) -> Result<GenerationSummary>;
}

/// Fire-and-forget front end to an optional [`OutcomeStore`].
#[derive(Clone, Default)]
pub struct Recorder {
    store: Option<Arc<dyn OutcomeStore>>,
}

impl Recorder {
    pub fn new(store: Arc<dyn OutcomeStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A recorder that only logs.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn store(&self) -> Option<&Arc<dyn OutcomeStore>> {
        self.store.as_ref()
    }

    /// Hands `outcome` to the store on a spawned task. The handle may be
    /// awaited or dropped; dropping it does not cancel the append.
    pub fn record(&self, outcome: PipelineOutcome) -> JoinHandle<()> {
        let recorder = self.clone();
        tokio::spawn(async move { recorder.record_now(&outcome).await })
    }

    /// Appends `outcome` in the current task, logging any failure.
    pub async fn record_now(&self, outcome: &PipelineOutcome) {
        match &self.store {
            Some(store) => {
                if let Err(e) = store.append(outcome).await {
                    tracing::error!(
                        language = %outcome.dialect,
                        error = %format!("{:#}", e),
                        "failed to record generation outcome"
                    );
                }
            }
            None => {
                tracing::info!(language = %outcome.dialect, "persistence disabled, skipping outcome log");
            }
        }
    }
}
