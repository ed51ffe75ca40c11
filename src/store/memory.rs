//! In-memory [`OutcomeStore`] for tests and config-less runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::PipelineOutcome;

use super::{GenerationSummary, LanguageSummary, OutcomeStore, RecentGeneration};

pub struct MemoryOutcomeStore {
    outcomes: RwLock<Vec<PipelineOutcome>>,
}

impl MemoryOutcomeStore {
    pub fn new() -> Self {
        Self {
            outcomes: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of every appended outcome, in append order.
    pub fn outcomes(&self) -> Vec<PipelineOutcome> {
        self.outcomes
            .read()
            .map(|o| o.clone())
            .unwrap_or_default()
    }
}

impl Default for MemoryOutcomeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutcomeStore for MemoryOutcomeStore {
    async fn append(&self, outcome: &PipelineOutcome) -> Result<()> {
        self.outcomes
            .write()
            .map_err(|_| anyhow!("outcome store lock poisoned"))?
            .push(outcome.clone());
        Ok(())
    }

    async fn summary(&self, recent_limit: i64) -> Result<GenerationSummary> {
        let outcomes = self
            .outcomes
            .read()
            .map_err(|_| anyhow!("outcome store lock poisoned"))?;

        let mut by_language: BTreeMap<&str, (i64, f64)> = BTreeMap::new();
        for o in outcomes.iter() {
            let entry = by_language.entry(o.dialect.as_str()).or_default();
            entry.0 += 1;
            entry.1 += o.duration.as_secs_f64();
        }

        let mut recent: Vec<&PipelineOutcome> = outcomes.iter().collect();
        // Stable sort keeps append order among equal timestamps; reverse
        // makes the latest append win.
        recent.reverse();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(GenerationSummary {
            total: outcomes.len() as i64,
            successful: outcomes.iter().filter(|o| o.success).count() as i64,
            languages: by_language
                .into_iter()
                .map(|(language, (count, total_secs))| LanguageSummary {
                    language: language.to_string(),
                    count,
                    avg_time: Some(total_secs / count as f64),
                })
                .collect(),
            recent: recent
                .into_iter()
                .take(recent_limit.max(0) as usize)
                .map(|o| RecentGeneration {
                    language: o.dialect.clone(),
                    success: o.success,
                    created_at: o.created_at,
                    file_size: o.artifact_size.map(|s| s as i64),
                    generation_time: Some(o.duration.as_secs_f64()),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;

    fn outcome(dialect: &str, success: bool, secs: f64, age_secs: i64) -> PipelineOutcome {
        PipelineOutcome {
            dialect: dialect.into(),
            input_length: 1,
            success,
            error_message: (!success).then(|| "boom".to_string()),
            fixes: vec![],
            artifact_size: success.then_some(42),
            duration: Duration::from_secs_f64(secs),
            caller: Some("127.0.0.1".into()),
            created_at: Utc::now() - ChronoDuration::seconds(age_secs),
        }
    }

    #[tokio::test]
    async fn test_summary_aggregates() {
        let store = MemoryOutcomeStore::new();
        store.append(&outcome("python", true, 1.0, 30)).await.unwrap();
        store.append(&outcome("python", false, 3.0, 20)).await.unwrap();
        store.append(&outcome("html", true, 0.5, 10)).await.unwrap();

        let s = store.summary(2).await.unwrap();
        assert_eq!(s.total, 3);
        assert_eq!(s.successful, 2);
        assert_eq!(s.languages.len(), 2);
        assert_eq!(s.languages[0].language, "html");
        assert_eq!(s.languages[1].count, 2);
        assert_eq!(s.languages[1].avg_time, Some(2.0));

        assert_eq!(s.recent.len(), 2);
        assert_eq!(s.recent[0].language, "html");
        assert_eq!(s.recent[0].file_size, Some(42));
        assert!(!s.recent[1].success);
    }

    #[tokio::test]
    async fn test_empty_summary() {
        let s = MemoryOutcomeStore::new().summary(10).await.unwrap();
        assert_eq!(s, GenerationSummary::default());
    }
}
