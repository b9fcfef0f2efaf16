use crate::utils::error::Result;
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Year-MonthName-Day-Hour:Minute:Second, e.g. `2024-Sep-08-09:16:35`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%b-%d-%H:%M:%S";

pub fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("market_cap_etl=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("market_cap_etl=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Append-only progress log. Every call opens the file, writes one line and
/// closes it again, so nothing is buffered between stages.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&self, message: &str) -> Result<()> {
        tracing::info!("{}", message);
        self.append(message)
    }

    /// Writes the entry without echoing it to the tracing output.
    pub fn append(&self, message: &str) -> Result<()> {
        self.append_at(Local::now(), message)
    }

    pub fn append_at(&self, now: DateTime<Local>, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", format_entry(now, message))?;
        Ok(())
    }
}

pub fn format_entry(now: DateTime<Local>, message: &str) -> String {
    format!("{},{}", now.format(TIMESTAMP_FORMAT), message)
}
