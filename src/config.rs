use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::safety::CarveOut;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Outcome database. Persistence is disabled when the section is absent.
    #[serde(default)]
    pub db: Option<DbConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutionConfig {
    /// Interpreter used for the `python` and `matplotlib` dialects.
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_python_args")]
    pub python_args: Vec<String>,
    /// Primary markup renderer, invoked as `<renderer> <input.html> <output.pdf>`.
    #[serde(default = "default_markup_renderer")]
    pub markup_renderer: String,
    /// Used only when the primary renderer binary cannot be found.
    #[serde(default = "default_markup_fallback")]
    pub markup_fallback: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Parent directory for per-invocation workspaces. Defaults to the
    /// system temp directory.
    #[serde(default)]
    pub work_root: Option<PathBuf>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            python_args: default_python_args(),
            markup_renderer: default_markup_renderer(),
            markup_fallback: default_markup_fallback(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
            work_root: None,
        }
    }
}

fn default_python() -> String {
    "python3".to_string()
}
fn default_python_args() -> Vec<String> {
    vec!["-I".to_string()]
}
fn default_markup_renderer() -> String {
    "weasyprint".to_string()
}
fn default_markup_fallback() -> String {
    "wkhtmltopdf".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_concurrent() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SafetyConfig {
    #[serde(default)]
    pub carve_out: CarveOut,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_recent_limit")]
    pub recent_limit: i64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_recent_limit() -> i64 {
    10
}

impl Config {
    pub fn persistence_enabled(&self) -> bool {
        self.db.is_some()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    let exec = &config.execution;
    if exec.timeout_secs == 0 {
        anyhow::bail!("execution.timeout_secs must be > 0");
    }
    if exec.max_concurrent == 0 {
        anyhow::bail!("execution.max_concurrent must be >= 1");
    }
    if exec.python.trim().is_empty() {
        anyhow::bail!("execution.python must name an interpreter");
    }
    if exec.markup_renderer.trim().is_empty() && exec.markup_fallback.trim().is_empty() {
        anyhow::bail!("at least one of execution.markup_renderer / markup_fallback must be set");
    }

    if config.stats.recent_limit < 1 {
        anyhow::bail!("stats.recent_limit must be >= 1");
    }

    Ok(())
}
