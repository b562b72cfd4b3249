//! Optional `tracing` subscriber setup for embedders.
//!
//! The client only emits `tracing` events. An application that has no
//! subscriber of its own can install this one: a compact console layer,
//! plus a daily-rolled file when a directory is given.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::constants;
use crate::error::TraqResult;

/// Keeps the non-blocking file writer alive. Dropping it flushes the file.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install console logging, and file logging when `log_dir` is set.
///
/// `level` is an `EnvFilter` directive such as `"info"` or
/// `"traq_ws=debug"`; an invalid directive falls back to `info`. If a
/// global subscriber is already installed it is left in place.
pub fn init_logging(level: &str, log_dir: Option<&Path>, json: bool) -> TraqResult<LogGuard> {
    let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, constants::LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            let layer: Box<dyn Layer<Registry> + Send + Sync> = if json {
                layer.json().boxed()
            } else {
                layer.boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(fmt::layer().with_target(true).compact())
        .with(env_filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level, file = log_dir.is_some(), "logging initialized");
    }

    Ok(LogGuard { _file: file_guard })
}
