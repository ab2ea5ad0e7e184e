//! # Logging Setup
//!
//! `tracing` subscriber with two sinks: a session log file (cleared at startup,
//! written through a non-blocking appender) and the console.
//! `RUST_LOG` overrides the configured filter.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::domain::config::LoggingConfig;

/// Installs the global subscriber. Keep the returned guard alive for the whole
/// process, dropping it flushes and stops the file writer.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let directory = Path::new(&config.directory);
    fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    // Clear previous session log
    let log_path = directory.join(&config.file);
    if log_path.exists() {
        let _ = fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(directory, &config.file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(env_filter(&config.filter))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(fallback).unwrap_or_else(|e| {
            eprintln!("Invalid log filter {:?} ({}), using \"info\"", fallback, e);
            EnvFilter::new("info")
        })
    })
}
