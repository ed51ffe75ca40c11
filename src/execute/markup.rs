use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use super::{
    failure_cause, output_tail, remove_input, run_with_timeout, sandbox_env, ExecutionStrategy,
};
use crate::config::ExecutionConfig;
use crate::error::ExecutionError;
use crate::models::Artifact;

const INPUT_FILE: &str = "document.html";
const OUTPUT_FILE: &str = "html_document.pdf";

/// Renders `html` snippets with an external HTML-to-PDF command.
///
/// Both renderers are invoked as `<program> document.html html_document.pdf`.
/// The fallback is tried only when the primary binary cannot be found.
pub struct MarkupStrategy {
    renderer: String,
    fallback: String,
    timeout: Duration,
}

impl MarkupStrategy {
    pub fn new(config: &ExecutionConfig) -> Self {
        Self {
            renderer: config.markup_renderer.clone(),
            fallback: config.markup_fallback.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn render(&self, program: &str, workspace: &Path) -> Result<Output, ExecutionError> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args([INPUT_FILE, OUTPUT_FILE])
            .env_clear()
            .envs(sandbox_env(workspace));
        run_with_timeout(&mut cmd, program, workspace, self.timeout).await
    }

    async fn render_with_fallback(&self, workspace: &Path) -> Result<Output, ExecutionError> {
        match self.render(&self.renderer, workspace).await {
            Err(ExecutionError::Spawn { source, .. }) if source.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    renderer = %self.renderer,
                    fallback = %self.fallback,
                    "markup renderer not found, using fallback"
                );
                self.render(&self.fallback, workspace).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl ExecutionStrategy for MarkupStrategy {
    fn name(&self) -> &str {
        "markup"
    }

    async fn execute(&self, text: &str, workspace: &Path) -> Result<Artifact, ExecutionError> {
        let input = workspace.join(INPUT_FILE);
        tokio::fs::write(&input, text).await?;

        let result = self.render_with_fallback(workspace).await;
        remove_input(&input).await;
        let output = result?;

        if !output.status.success() {
            return Err(ExecutionError::Failed(failure_cause(&output)));
        }

        let path = workspace.join(OUTPUT_FILE);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Artifact {
                path,
                size_bytes: meta.len(),
                output_tail: output_tail(&output),
            }),
            _ => Err(ExecutionError::NoArtifact {
                output: output_tail(&output),
            }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn stub_renderer(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn strategy(renderer: String, fallback: String) -> MarkupStrategy {
        MarkupStrategy {
            renderer,
            fallback,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_renders_fixed_output_and_removes_input() {
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let renderer = stub_renderer(bin.path(), "render", "cat \"$1\" > \"$2\"");
        let artifact = strategy(renderer, "unused".into())
            .execute("<html>hi</html>", work.path())
            .await
            .unwrap();
        assert_eq!(artifact.path, work.path().join(OUTPUT_FILE));
        assert_eq!(artifact.size_bytes, 15);
        assert!(!work.path().join(INPUT_FILE).exists());
    }

    #[tokio::test]
    async fn test_falls_back_when_primary_missing() {
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let fallback = stub_renderer(bin.path(), "fallback", "printf '%%PDF' > \"$2\"");
        let artifact = strategy("inkpress-missing-renderer".into(), fallback)
            .execute("<html></html>", work.path())
            .await
            .unwrap();
        assert_eq!(artifact.size_bytes, 4);
    }

    #[tokio::test]
    async fn test_renderer_failure_keeps_primary_error() {
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let renderer = stub_renderer(bin.path(), "render", "echo 'bad markup' >&2; exit 2");
        let fallback = stub_renderer(bin.path(), "fallback", "printf '%%PDF' > \"$2\"");
        let err = strategy(renderer, fallback)
            .execute("<html></html>", work.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Failed(ref m) if m == "bad markup"));
        assert!(!work.path().join(INPUT_FILE).exists());
    }
}
