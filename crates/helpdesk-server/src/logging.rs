use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "helpdesk=debug,helpdesk_api=debug,helpdesk_db=info,tower_http=debug";

/// Console output for everything the filter lets through, plus a plain-text
/// file that only receives warnings and errors.
pub fn init() -> Result<PathBuf> {
    let log_dir = std::env::var("HELPDESK_LOG_DIR").unwrap_or_else(|_| "logs".into());
    let log_file = std::env::var("HELPDESK_LOG_FILE").unwrap_or_else(|_| "helpdesk.log".into());

    fs::create_dir_all(&log_dir).with_context(|| format!("creating log directory {log_dir}"))?;
    let path = PathBuf::from(log_dir).join(log_file);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .with_filter(LevelFilter::WARN),
        )
        .init();

    Ok(path)
}
