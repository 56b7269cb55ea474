//! Tracing subscriber setup for the binary.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level; `verbose` forces
/// `debug` for this crate. Logs go to stderr, or to a daily-rolling file when
/// `config.dir` is set. Keep the returned guard alive until exit so buffered
/// lines get flushed.
pub fn init(config: &LogConfig, verbose: bool) -> Result<WorkerGuard> {
  let filter = if verbose {
    EnvFilter::new("ghsync=debug")
  } else {
    EnvFilter::try_from_default_env()
      .or_else(|_| EnvFilter::try_new(&config.level))
      .map_err(|e| eyre!("Invalid log level {:?}: {}", config.level, e))?
  };

  let (writer, guard) = match &config.dir {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "ghsync.log"))
    }
    None => tracing_appender::non_blocking(std::io::stderr()),
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_writer(writer)
        .with_ansi(config.dir.is_none()),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  Ok(guard)
}
