//! Tracing subscriber setup: console layer on stderr plus an optional
//! rolling JSON file from `[logging]`.

use eyre::WrapErr;
use rpmlab_config::Logging;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Precedence: `RUST_LOG`, then `--log-level`, then `[logging] level`, then "info".
pub fn init_tracing(
    json: bool,
    level: Option<&str>,
    logging: Option<&Logging>,
) -> eyre::Result<Option<WorkerGuard>> {
    let level = level
        .or_else(|| logging.and_then(|l| l.level.as_deref()))
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match logging.and_then(|l| l.file.as_deref()) {
        Some(file) => {
            let rotation = logging.and_then(|l| l.rotation.as_deref());
            let (writer, guard) = file_writer(Path::new(file), rotation)?;
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().compact().with_writer(std::io::stderr)))
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(guard)
}

fn file_writer(
    path: &Path,
    rotation: Option<&str>,
) -> eyre::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let rotation = match rotation.unwrap_or("never") {
        "daily" => Rotation::DAILY,
        "hourly" => Rotation::HOURLY,
        _ => Rotation::NEVER,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("log file path has no file name: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .wrap_err_with(|| format!("create log directory {}", dir.display()))?;
    let appender = RollingFileAppender::new(rotation, dir, name);
    Ok(tracing_appender::non_blocking(appender))
}
