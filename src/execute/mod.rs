//! Execution strategies: run a rewritten snippet and locate its PDF.
//!
//! Every strategy receives a private workspace directory owned by a single
//! pipeline invocation. Strategies write their input file there, run the
//! interpreter or renderer as a separate process with that directory as its
//! working directory, and look for the PDF only inside it.
//!
//! # Registry
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │             StrategyRegistry               │
//! │  python ──┐                                │
//! │           ├─▶ PythonStrategy (interpreter) │
//! │  matplotlib┘                               │
//! │  html ─────▶ MarkupStrategy (renderer)     │
//! │  javascript ▶ UnsupportedStrategy          │
//! └────────────────────────────────────────────┘
//! ```
//!
//! Tests replace entries with [`StrategyRegistry::register`].

mod markup;
mod python;

pub use markup::MarkupStrategy;
pub use python::PythonStrategy;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

use crate::config::ExecutionConfig;
use crate::error::{ExecutionError, BROWSER_ADVISORY};
use crate::models::{Artifact, Dialect};

/// Lines of process output kept for diagnostics.
const OUTPUT_TAIL_LINES: usize = 20;

/// Runs a rewritten snippet of one dialect.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Executes `text` inside `workspace` and returns the PDF it produced.
    async fn execute(&self, text: &str, workspace: &Path) -> Result<Artifact, ExecutionError>;
}

/// Dialect → strategy table shared by every pipeline invocation.
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<Dialect, Arc<dyn ExecutionStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// The built-in strategies configured from `[execution]`.
    pub fn from_config(config: &ExecutionConfig) -> Self {
        let python: Arc<dyn ExecutionStrategy> = Arc::new(PythonStrategy::new(config));
        let mut registry = Self::new();
        registry.register(Dialect::Procedural, python.clone());
        registry.register(Dialect::Visualization, python);
        registry.register(Dialect::Markup, Arc::new(MarkupStrategy::new(config)));
        registry.register(Dialect::BrowserScript, Arc::new(UnsupportedStrategy));
        registry
    }

    /// Installs `strategy` for `dialect`, replacing any previous entry.
    pub fn register(&mut self, dialect: Dialect, strategy: Arc<dyn ExecutionStrategy>) {
        self.strategies.insert(dialect, strategy);
    }

    pub fn get(&self, dialect: Dialect) -> Option<Arc<dyn ExecutionStrategy>> {
        self.strategies.get(&dialect).cloned()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Strategy for dialects the service accepts but cannot run.
pub struct UnsupportedStrategy;

#[async_trait]
impl ExecutionStrategy for UnsupportedStrategy {
    fn name(&self) -> &str {
        "unsupported"
    }

    async fn execute(&self, _text: &str, _workspace: &Path) -> Result<Artifact, ExecutionError> {
        Err(ExecutionError::Unsupported(BROWSER_ADVISORY))
    }
}

/// Spawns `cmd` in `workspace` and waits for it. The child leads its own
/// process group on unix; once `timeout` elapses the whole group is killed,
/// so processes the snippet forked cannot outlive the request.
pub(crate) async fn run_with_timeout(
    cmd: &mut tokio::process::Command,
    program: &str,
    workspace: &Path,
    timeout: Duration,
) -> Result<Output, ExecutionError> {
    cmd.current_dir(workspace)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|source| ExecutionError::Spawn {
        program: program.to_string(),
        source,
    })?;
    let pid = child.id();

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(ExecutionError::Spawn {
            program: program.to_string(),
            source,
        }),
        Err(_) => {
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            Err(ExecutionError::TimedOut(timeout.as_secs()))
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    // ESRCH means every member already exited.
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        if e != nix::errno::Errno::ESRCH {
            tracing::warn!(pgid, error = %e, "failed to kill timed-out process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

/// Environment handed to child processes. Everything else is cleared.
pub(crate) fn sandbox_env(workspace: &Path) -> Vec<(&'static str, std::ffi::OsString)> {
    let mut env = vec![
        ("HOME", workspace.as_os_str().to_os_string()),
        ("MPLBACKEND", "Agg".into()),
    ];
    if let Some(path) = std::env::var_os("PATH") {
        env.push(("PATH", path));
    }
    env
}

/// Message for a non-zero exit: the last non-empty stderr line, verbatim.
pub(crate) fn failure_cause(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .rev()
        .map(str::trim_end)
        .find(|l| !l.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match output.status.code() {
            Some(code) => format!("process exited with status {}", code),
            None => "process terminated by signal".to_string(),
        })
}

/// Last lines of stdout followed by stderr, or `None` when both are blank.
pub(crate) fn output_tail(output: &Output) -> Option<String> {
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let lines: Vec<&str> = combined.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return None;
    }
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    Some(lines[start..].join("\n"))
}

/// The most recently written `*.pdf` under `workspace`.
pub(crate) fn newest_pdf(workspace: &Path) -> Option<(PathBuf, u64)> {
    WalkDir::new(workspace)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|x| x.to_str())
                .is_some_and(|x| x.eq_ignore_ascii_case("pdf"))
        })
        .filter_map(|e| {
            let meta = e.metadata().ok()?;
            let stamp = meta
                .created()
                .or_else(|_| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            Some((stamp, e.into_path(), meta.len()))
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path, size)| (path, size))
}

/// Removes an input file the strategy wrote, logging instead of failing.
pub(crate) async fn remove_input(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove snippet input");
        }
    }
}
