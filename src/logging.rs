//! Tracing setup.

use std::sync::OnceLock;

use autoheal_api::RecentLogs;
use autoheal_config::{ConfigLoader, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install console, daily file and recent-lines layers.
///
/// `RUST_LOG` overrides `logging.level`. With `to_file` unset only the
/// console and in-memory layers are installed.
pub(crate) fn init_tracing(
    config: &LoggingConfig,
    to_file: bool,
) -> Result<RecentLogs, Box<dyn std::error::Error>> {
    let recent = RecentLogs::new(config.recent_lines);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = if to_file {
        let log_dir = ConfigLoader::expand_dir(&config.dir);
        std::fs::create_dir_all(&log_dir)?;
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("autoheal")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = GUARD.set(guard);
        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .with(recent.layer())
        .try_init()?;

    Ok(recent)
}
