//! Shared fixtures: shell scripts standing in for the Python interpreter and
//! the HTML renderer, plus a config pointing at them.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use inkpress::config::{Config, DbConfig};

/// Interpreter stub. Writes `output.pdf` holding a PDF header followed by
/// the snippet it was given, so tests can inspect the rewritten text.
/// Marker comments in the snippet select other behaviours.
const FAKE_PYTHON: &str = r#"#!/bin/sh
src="$1"
if grep -q "SLEEP_FOREVER" "$src"; then sleep 30; fi
if grep -q "RAISE_ERROR" "$src"; then
    echo "Traceback (most recent call last):" >&2
    echo "ValueError: boom" >&2
    exit 1
fi
if grep -q "NO_PDF" "$src"; then
    echo "Error: nothing was built" >&2
    exit 0
fi
{ printf '%%PDF-1.4\n'; cat "$src"; } > output.pdf
echo "PDF generated successfully!"
"#;

/// Renderer stub, invoked as `<stub> input.html output.pdf`.
const FAKE_RENDERER: &str = r#"#!/bin/sh
{ printf '%%PDF-1.4\n'; cat "$1"; } > "$2"
"#;

pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Creates the stubs under `tmp/bin` and returns a config using them. The
/// primary markup renderer does not exist, so the fallback path is taken.
pub fn test_config(tmp: &TempDir) -> Config {
    let bin = tmp.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let python = bin.join("fake-python");
    let renderer = bin.join("fake-render");
    write_script(&python, FAKE_PYTHON);
    write_script(&renderer, FAKE_RENDERER);

    let mut config = Config::default();
    config.execution.python = python.to_string_lossy().into_owned();
    config.execution.python_args = vec![];
    config.execution.markup_renderer = "inkpress-no-such-renderer".to_string();
    config.execution.markup_fallback = renderer.to_string_lossy().into_owned();
    config.execution.timeout_secs = 2;
    config.execution.work_root = Some(tmp.path().join("work"));
    config
}

pub fn with_db(mut config: Config, tmp: &TempDir) -> Config {
    config.db = Some(DbConfig {
        path: tmp.path().join("data/inkpress.sqlite"),
    });
    config
}

/// TOML rendering of [`test_config`] for the CLI tests.
pub fn write_config_file(tmp: &TempDir, with_database: bool) -> PathBuf {
    let config = test_config(tmp);
    let mut content = String::new();
    if with_database {
        content.push_str(&format!(
            "[db]\npath = \"{}/data/inkpress.sqlite\"\n\n",
            tmp.path().display()
        ));
    }
    content.push_str(&format!(
        r#"[execution]
python = "{}"
python_args = []
markup_renderer = "{}"
markup_fallback = "{}"
timeout_secs = 2
work_root = "{}/work"
"#,
        config.execution.python,
        config.execution.markup_renderer,
        config.execution.markup_fallback,
        tmp.path().display()
    ));

    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let path = config_dir.join("inkpress.toml");
    fs::write(&path, content).unwrap();
    path
}

pub fn pdf_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
