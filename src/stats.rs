//! Generation statistics.
//!
//! Turns a [`GenerationSummary`] into the JSON document served at
//! `GET /stats` and the table printed by `inkpress stats`.

use anyhow::{bail, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::store::{GenerationSummary, OutcomeStore, SqliteOutcomeStore};

/// Body of `GET /stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_generations: i64,
    pub successful_generations: i64,
    /// Percentage with one decimal, e.g. `"66.7%"`; `"0%"` when nothing ran.
    pub success_rate: String,
    pub language_stats: Vec<LanguageStat>,
    pub recent_generations: Vec<RecentStat>,
}

#[derive(Debug, Serialize)]
pub struct LanguageStat {
    pub language: String,
    pub count: i64,
    /// `"1.23s"` or `"N/A"`.
    pub avg_time: String,
}

#[derive(Debug, Serialize)]
pub struct RecentStat {
    pub language: String,
    pub success: bool,
    pub created_at: String,
    pub file_size: Option<i64>,
    pub generation_time: Option<f64>,
}

impl From<&GenerationSummary> for StatsResponse {
    fn from(s: &GenerationSummary) -> Self {
        Self {
            total_generations: s.total,
            successful_generations: s.successful,
            success_rate: format_success_rate(s.successful, s.total),
            language_stats: s
                .languages
                .iter()
                .map(|l| LanguageStat {
                    language: l.language.clone(),
                    count: l.count,
                    avg_time: format_avg_time(l.avg_time),
                })
                .collect(),
            recent_generations: s
                .recent
                .iter()
                .map(|r| RecentStat {
                    language: r.language.clone(),
                    success: r.success,
                    created_at: format_ts_rfc3339(r.created_at),
                    file_size: r.file_size,
                    generation_time: r.generation_time,
                })
                .collect(),
        }
    }
}

pub fn format_success_rate(successful: i64, total: i64) -> String {
    if total > 0 {
        format!("{:.1}%", successful as f64 / total as f64 * 100.0)
    } else {
        "0%".to_string()
    }
}

pub fn format_avg_time(avg: Option<f64>) -> String {
    match avg {
        Some(t) if t > 0.0 => format!("{:.2}s", t),
        _ => "N/A".to_string(),
    }
}

fn format_ts_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Run the stats command: query the outcome database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let Some(db_config) = &config.db else {
        bail!("No [db] section in config; persistence is disabled");
    };
    let store = SqliteOutcomeStore::open(db_config).await?;
    let summary = store.summary(config.stats.recent_limit).await?;
    store.close().await;

    let db_size = std::fs::metadata(&db_config.path)
        .map(|m| m.len())
        .unwrap_or(0);
    let stats = StatsResponse::from(&summary);

    println!("inkpress — Generation Stats");
    println!("===========================");
    println!();
    println!("  Database:    {}", db_config.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Generations: {}", stats.total_generations);
    println!(
        "  Successful:  {} ({})",
        stats.successful_generations, stats.success_rate
    );

    if !stats.language_stats.is_empty() {
        println!();
        println!("  By language:");
        println!("  {:<14} {:>8} {:>10}", "LANGUAGE", "COUNT", "AVG TIME");
        println!("  {}", "-".repeat(34));
        for l in &stats.language_stats {
            println!("  {:<14} {:>8} {:>10}", l.language, l.count, l.avg_time);
        }
    }

    if !summary.recent.is_empty() {
        println!();
        println!("  Recent:");
        println!(
            "  {:<18} {:<14} {:<6} {:>10} {:>8}",
            "WHEN", "LANGUAGE", "OK", "SIZE", "TIME"
        );
        println!("  {}", "-".repeat(60));
        for r in &summary.recent {
            println!(
                "  {:<18} {:<14} {:<6} {:>10} {:>8}",
                r.created_at.format("%Y-%m-%d %H:%M"),
                r.language,
                if r.success { "yes" } else { "no" },
                r.file_size
                    .map(|b| format_bytes(b.max(0) as u64))
                    .unwrap_or_else(|| "-".to_string()),
                format_avg_time(r.generation_time),
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LanguageSummary, RecentGeneration};
    use chrono::TimeZone;

    #[test]
    fn test_success_rate() {
        assert_eq!(format_success_rate(0, 0), "0%");
        assert_eq!(format_success_rate(2, 3), "66.7%");
        assert_eq!(format_success_rate(5, 5), "100.0%");
    }

    #[test]
    fn test_avg_time() {
        assert_eq!(format_avg_time(Some(1.234)), "1.23s");
        assert_eq!(format_avg_time(None), "N/A");
        assert_eq!(format_avg_time(Some(0.0)), "N/A");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_response_shape() {
        let summary = GenerationSummary {
            total: 3,
            successful: 2,
            languages: vec![LanguageSummary {
                language: "html".into(),
                count: 3,
                avg_time: Some(0.5),
            }],
            recent: vec![RecentGeneration {
                language: "html".into(),
                success: true,
                created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
                file_size: Some(1024),
                generation_time: Some(0.5),
            }],
        };
        let json = serde_json::to_value(StatsResponse::from(&summary)).unwrap();
        assert_eq!(json["success_rate"], "66.7%");
        assert_eq!(json["language_stats"][0]["avg_time"], "0.50s");
        assert_eq!(
            json["recent_generations"][0]["created_at"],
            "2024-05-01T12:00:00.000Z"
        );
        assert_eq!(json["recent_generations"][0]["file_size"], 1024);
    }
}
