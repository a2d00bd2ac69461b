use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Where and how job logs are written.
#[derive(Debug, Clone)]
pub struct LogOptions {
    pub dir: Utf8PathBuf,
    /// File name prefix of the daily log files
    pub prefix: String,
    pub debug: bool,
    /// Mirror records to stderr with colors
    pub console: bool,
    /// One JSON object per line in the log file instead of plain text
    pub json: bool,
}

impl LogOptions {
    pub fn new(dir: impl Into<Utf8PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            debug: false,
            console: false,
            json: false,
        }
    }

    pub fn from_settings(settings: &Settings, prefix: impl Into<String>) -> Self {
        Self {
            debug: settings.debug_mode,
            json: settings.json_logs,
            ..Self::new(&settings.log_dir, prefix)
        }
    }

    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }
}

fn level_filter(debug: bool) -> EnvFilter {
    // RUST_LOG overrides the configured level
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }))
}

fn ensure_dir(dir: &Utf8Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir))?;
    }
    Ok(())
}

/// Install the global subscriber: a daily rolling file plus, optionally, the console.
///
/// Returns the file writer's guard, which must be held for the lifetime of the program.
/// Fails if a global subscriber is already installed.
pub fn setup_logging(options: &LogOptions) -> Result<WorkerGuard> {
    ensure_dir(&options.dir)?;

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&options.dir, &options.prefix));

    let file_layer: BoxedLayer = if options.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let console_layer: Option<BoxedLayer> = options.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    });

    let mut layers = vec![file_layer];
    layers.extend(console_layer);

    tracing_subscriber::registry()
        .with(layers)
        .with(level_filter(options.debug))
        .try_init()
        .context("Logging already initialized")?;

    tracing::info!(
        "Logging to {}/{}.* (debug={}, console={}, json={})",
        options.dir,
        options.prefix,
        options.debug,
        options.console,
        options.json
    );

    Ok(guard)
}
