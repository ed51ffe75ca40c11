//! # inkpress CLI
//!
//! The `inkpress` binary runs the snippet-to-PDF service and exposes the
//! pipeline stages locally for debugging.
//!
//! ## Usage
//!
//! ```bash
//! inkpress --config ./config/inkpress.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `inkpress init` | Create the outcome database and run schema migrations |
//! | `inkpress serve` | Start the HTTP server |
//! | `inkpress fix --dialect <tag> <FILE>` | Show the safety verdict and repaired snippet |
//! | `inkpress generate --dialect <tag> <FILE>` | Run the full pipeline and write the PDF |
//! | `inkpress stats` | Print generation statistics |
//!
//! ## Examples
//!
//! ```bash
//! # See what the rewrite rules would change
//! inkpress fix --dialect python report.py
//!
//! # Pipe a snippet through stdin
//! cat chart.py | inkpress fix --dialect matplotlib -
//!
//! # Render an HTML fragment to PDF without the server
//! inkpress generate --dialect html page.html --output page.pdf
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use inkpress::config::{self, Config};
use inkpress::models::Dialect;
use inkpress::pipeline::{GenerateRequest, Pipeline};
use inkpress::rewrite;
use inkpress::safety::{SafetyFilter, Verdict};
use inkpress::store::{Recorder, SqliteOutcomeStore};
use inkpress::{migrate, server, stats};

/// inkpress: repair and execute PDF-generating code snippets.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/inkpress.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "inkpress",
    about = "inkpress — repair and execute PDF-generating code snippets",
    version,
    long_about = "inkpress accepts ReportLab, HTML, Matplotlib and jsPDF snippets, screens them \
    for disallowed constructs, applies automatic repairs, runs them in a private sandbox \
    directory and returns the resulting PDF."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/inkpress.toml`.
    #[arg(long, global = true, default_value = "./config/inkpress.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the outcome database.
    ///
    /// Creates the SQLite file named in `[db]` and the `pdf_generations`
    /// table. Safe to run repeatedly.
    Init,

    /// Start the HTTP server.
    ///
    /// Serves `POST /generate`, `GET /stats` and `GET /health` on
    /// `[server].bind`.
    Serve,

    /// Show the safety verdict and the repaired snippet without running it.
    ///
    /// Works without a config file; defaults are used when it is missing.
    Fix {
        /// Snippet language: python, html, matplotlib or javascript.
        #[arg(long, default_value = "python")]
        dialect: String,

        /// Snippet file, or `-` for stdin.
        file: PathBuf,
    },

    /// Run the full pipeline locally and write the PDF.
    Generate {
        /// Snippet language: python, html, matplotlib or javascript.
        #[arg(long, default_value = "python")]
        dialect: String,

        /// Snippet file, or `-` for stdin.
        file: PathBuf,

        /// Where to write the PDF. Defaults to the artifact's own file name
        /// in the current directory.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show generation statistics from the outcome database.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkpress=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require a config file
    if let Commands::Fix { dialect, file } = &cli.command {
        let cfg = load_or_default(&cli.config)?;
        return run_fix(&cfg, dialect, file);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Generate {
            dialect,
            file,
            output,
        } => {
            run_generate(&cfg, &dialect, &file, output).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Fix { .. } => {
            // Handled above (before config loading)
        }
    }

    Ok(())
}

fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        Ok(Config::default())
    }
}

fn read_snippet(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read snippet from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read snippet: {}", file.display()))
    }
}

fn run_fix(cfg: &Config, dialect: &str, file: &Path) -> Result<()> {
    let dialect: Dialect = dialect.parse().map_err(anyhow::Error::msg)?;
    let text = read_snippet(file)?;
    let text = text.trim();

    match SafetyFilter::new(cfg.safety.carve_out).evaluate(text) {
        Verdict::Accept => println!("Safety:  accepted"),
        Verdict::Reject { pattern } => {
            println!("Safety:  rejected (pattern: {})", pattern);
            return Ok(());
        }
    }

    let result = rewrite::rewrite(dialect, text);
    println!("Fixes:   {}", result.fixes.len());
    for fix in &result.fixes {
        println!("  - {}", fix);
    }
    println!();
    println!("{}", result.text);
    Ok(())
}

async fn run_generate(
    cfg: &Config,
    dialect: &str,
    file: &Path,
    output: Option<PathBuf>,
) -> Result<()> {
    let code = read_snippet(file)?;
    let recorder = match &cfg.db {
        Some(db_config) => Recorder::new(Arc::new(SqliteOutcomeStore::open(db_config).await?)),
        None => Recorder::disabled(),
    };
    let pipeline = Pipeline::new(cfg, recorder);

    let run = pipeline
        .run(GenerateRequest::new(dialect, code).with_caller("cli"))
        .await;
    // Let the outcome land before the runtime shuts down
    let _ = run.recording.await;

    for fix in &run.outcome.fixes {
        println!("  fix: {}", fix);
    }

    match run.result {
        Ok(pdf) => {
            let path = output.unwrap_or_else(|| PathBuf::from(&pdf.file_name));
            std::fs::write(&path, &pdf.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Wrote {} ({} bytes, {:.2}s)",
                path.display(),
                pdf.bytes.len(),
                run.outcome.duration.as_secs_f64()
            );
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("{} (status {})", e, e.status().as_u16())),
    }
}
