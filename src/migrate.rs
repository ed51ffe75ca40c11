use anyhow::{bail, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Creates the outcome database named in `[db]` and its schema.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let Some(db_config) = &config.db else {
        bail!("No [db] section in config; persistence is disabled");
    };
    let pool = db::connect(db_config).await?;
    migrate(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotent schema setup on an open pool.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    // One row per pipeline invocation
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pdf_generations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            language TEXT NOT NULL,
            code_length INTEGER NOT NULL,
            success INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            fixes_applied TEXT,
            file_size INTEGER,
            generation_time REAL,
            created_at INTEGER NOT NULL,
            user_ip TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pdf_generations_created_at ON pdf_generations(created_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pdf_generations_language ON pdf_generations(language)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
