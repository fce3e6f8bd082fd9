//! # Quire - A Small Terminal Text Editor
//!
//! ## Quick Start
//!
//! ```bash
//! # Edit a file
//! cargo run -- path/to/file.rs
//!
//! # Open two files, the second at line 40
//! cargo run -- notes.txt +40 src/main.rs
//!
//! # Log to a file while debugging
//! cargo run -- -vv --log-file quire.log file.txt
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use quire_core::{Config, Editor, EditorContext};

/// Quire - a small terminal text editor
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Files to open; `+N` before a file starts at line N
    #[arg(value_name = "FILE")]
    files: Vec<String>,

    /// Config file to use instead of the default one
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// A file to open and the line to start on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    path: Option<PathBuf>,
    line: Option<i64>,
}

/// Pairs each `+N` with the file after it. A trailing `+N` applies to the
/// empty buffer opened when no file is given.
fn targets(args: &[String]) -> Vec<Target> {
    let mut targets = Vec::new();
    let mut line = None;
    for arg in args {
        match arg.strip_prefix('+').and_then(|n| n.parse::<i64>().ok()) {
            Some(n) => line = Some(n),
            None => targets.push(Target {
                path: Some(PathBuf::from(arg)),
                line: line.take(),
            }),
        }
    }
    if targets.is_empty() || line.is_some() {
        targets.push(Target { path: None, line });
    }
    targets
}

/// Installs the file logger. Nothing is logged without `--log-file` or `-v`.
fn init_logging(args: &Args) -> anyhow::Result<Option<WorkerGuard>> {
    let path = match (&args.log_file, args.verbose) {
        (Some(path), _) => path.clone(),
        (None, 0) => return Ok(None),
        (None, _) => Config::data_dir()?.join("quire.log"),
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("not a file: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false),
        )
        .with(filter)
        .try_init()
        .context("cannot install logger")?;
    Ok(Some(guard))
}

/// Opens every target. Fails only if files were named and none could be
/// opened.
fn open_targets(editor: &mut Editor, targets: &[Target]) -> anyhow::Result<()> {
    let mut errors = Vec::new();
    let mut named = 0;
    for target in targets {
        let opened = match &target.path {
            Some(path) => {
                named += 1;
                match editor.open(path) {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!("{e}");
                        errors.push(e.to_string());
                        false
                    }
                }
            }
            None => {
                editor.new_document();
                true
            }
        };
        if let (true, Some(line)) = (opened, target.line) {
            editor.goto_line(line);
        }
    }

    if editor.session().is_empty() {
        if named > 0 {
            bail!("{}", errors.join("\n"));
        }
        editor.new_document();
    }
    editor.switch_to(0);
    if let Some(first) = errors.first() {
        editor.set_status(first.clone());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&args)?;
    tracing::info!("Starting quire v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(args.config.as_deref()).context("cannot load config")?;
    let ctx = EditorContext::load(config);
    let mut editor = Editor::new(ctx, 24, 80);
    open_targets(&mut editor, &targets(&args.files))?;

    quire_term::run(editor)?;
    tracing::info!("exiting");
    Ok(())
}
