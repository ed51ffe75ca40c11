use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::{
    failure_cause, newest_pdf, output_tail, remove_input, run_with_timeout, sandbox_env,
    ExecutionStrategy,
};
use crate::config::ExecutionConfig;
use crate::error::ExecutionError;
use crate::models::Artifact;

const SOURCE_FILE: &str = "snippet.py";

/// Runs `python` and `matplotlib` snippets with the configured interpreter.
pub struct PythonStrategy {
    interpreter: String,
    args: Vec<String>,
    timeout: Duration,
}

impl PythonStrategy {
    pub fn new(config: &ExecutionConfig) -> Self {
        Self {
            interpreter: config.python.clone(),
            args: config.python_args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl ExecutionStrategy for PythonStrategy {
    fn name(&self) -> &str {
        "python"
    }

    async fn execute(&self, text: &str, workspace: &Path) -> Result<Artifact, ExecutionError> {
        let source = workspace.join(SOURCE_FILE);
        tokio::fs::write(&source, text).await?;

        let mut cmd = tokio::process::Command::new(&self.interpreter);
        cmd.args(&self.args)
            .arg(SOURCE_FILE)
            .env_clear()
            .envs(sandbox_env(workspace));

        let result = run_with_timeout(&mut cmd, &self.interpreter, workspace, self.timeout).await;
        remove_input(&source).await;
        let output = result?;

        if !output.status.success() {
            return Err(ExecutionError::Failed(failure_cause(&output)));
        }

        let tail = output_tail(&output);
        match newest_pdf(workspace) {
            Some((path, size_bytes)) => Ok(Artifact {
                path,
                size_bytes,
                output_tail: tail,
            }),
            None => Err(ExecutionError::NoArtifact { output: tail }),
        }
    }
}
