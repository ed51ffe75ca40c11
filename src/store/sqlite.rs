//! SQLite-backed [`OutcomeStore`] over the `pdf_generations` table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::config::DbConfig;
use crate::db;
use crate::migrate;
use crate::models::PipelineOutcome;

use super::{GenerationSummary, LanguageSummary, OutcomeStore, RecentGeneration};

pub struct SqliteOutcomeStore {
    pool: SqlitePool,
}

impl SqliteOutcomeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to the configured database and ensures the schema exists.
    pub async fn open(db_config: &DbConfig) -> Result<Self> {
        let pool = db::connect(db_config).await?;
        migrate::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl OutcomeStore for SqliteOutcomeStore {
    async fn append(&self, outcome: &PipelineOutcome) -> Result<()> {
        let fixes_json = if outcome.fixes.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&outcome.fixes)?)
        };

        sqlx::query(
            r#"
            INSERT INTO pdf_generations
                (language, code_length, success, error_message, fixes_applied,
                 file_size, generation_time, created_at, user_ip)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&outcome.dialect)
        .bind(outcome.input_length as i64)
        .bind(outcome.success)
        .bind(&outcome.error_message)
        .bind(fixes_json)
        .bind(outcome.artifact_size.map(|s| s as i64))
        .bind(outcome.duration.as_secs_f64())
        .bind(outcome.created_at.timestamp_millis())
        .bind(&outcome.caller)
        .execute(&self.pool)
        .await
        .context("Failed to insert generation outcome")?;

        Ok(())
    }

    async fn summary(&self, recent_limit: i64) -> Result<GenerationSummary> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pdf_generations")
            .fetch_one(&self.pool)
            .await?;

        let successful: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pdf_generations WHERE success = 1")
                .fetch_one(&self.pool)
                .await?;

        let language_rows = sqlx::query(
            r#"
            SELECT language, COUNT(*) AS count, AVG(generation_time) AS avg_time
            FROM pdf_generations
            GROUP BY language
            ORDER BY language
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let languages = language_rows
            .iter()
            .map(|row| LanguageSummary {
                language: row.get("language"),
                count: row.get("count"),
                avg_time: row.get("avg_time"),
            })
            .collect();

        let recent_rows = sqlx::query(
            r#"
            SELECT language, success, created_at, file_size, generation_time
            FROM pdf_generations
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(recent_limit)
        .fetch_all(&self.pool)
        .await?;

        let recent = recent_rows
            .iter()
            .map(|row| {
                let millis: i64 = row.get("created_at");
                RecentGeneration {
                    language: row.get("language"),
                    success: row.get("success"),
                    created_at: DateTime::<Utc>::from_timestamp_millis(millis)
                        .unwrap_or_default(),
                    file_size: row.get("file_size"),
                    generation_time: row.get("generation_time"),
                }
            })
            .collect();

        Ok(GenerationSummary {
            total,
            successful,
            languages,
            recent,
        })
    }
}
