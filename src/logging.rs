//! File-based tracing setup; the terminal is reserved for the views.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const LOG_ENV: &str = "SEGVIEW_LOG";

/// Install the global subscriber writing to a daily rolling file.
///
/// When the log file can't be opened a warning goes to stderr and the
/// subscriber runs without a file layer; startup carries on either way.
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
  let env_filter = EnvFilter::try_from_env(LOG_ENV)
    .unwrap_or_else(|_| EnvFilter::new(config.level.as_deref().unwrap_or("info")));

  match open_log_writer(config) {
    Ok((directory, writer, guard)) => {
      let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
          tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false),
        )
        .try_init();

      tracing::info!(directory = %directory.display(), "logging initialized");
      Some(guard)
    }
    Err(e) => {
      eprintln!("Warning: {}; continuing without a log file", e);
      let _ = tracing_subscriber::registry().with(env_filter).try_init();
      None
    }
  }
}

fn open_log_writer(config: &LoggingConfig) -> Result<(PathBuf, NonBlocking, WorkerGuard)> {
  let directory = match &config.directory {
    Some(dir) => dir.clone(),
    None => default_log_dir()?,
  };
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let appender = RollingFileAppender::builder()
    .rotation(Rotation::DAILY)
    .filename_prefix("segview.log")
    .build(&directory)
    .map_err(|e| eyre!("Failed to open log file in {}: {}", directory.display(), e))?;
  let (writer, guard) = tracing_appender::non_blocking(appender);

  Ok((directory, writer, guard))
}

fn default_log_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("segview").join("logs"))
}
