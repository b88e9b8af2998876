//! Tracing setup: console layer on stderr plus an optional rolling JSON file.

use std::path::Path;

use eyre::{Result, WrapErr, bail};
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::FILE_GUARD;

fn rotation(name: Option<&str>) -> Result<Rotation> {
    Ok(match name.unwrap_or("daily") {
        "never" => Rotation::NEVER,
        "daily" => Rotation::DAILY,
        "hourly" => Rotation::HOURLY,
        other => bail!("unknown log rotation '{other}'"),
    })
}

/// `RUST_LOG` wins over `level`.
pub fn init_tracing(json: bool, level: &str, logging: &switcher_config::Logging) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let prefix = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("switcher.log");
            let appender = Builder::new()
                .rotation(rotation(logging.rotation.as_deref())?)
                .filename_prefix(prefix)
                .max_log_files(logging.max_files.unwrap_or(5))
                .build(dir)
                .wrap_err_with(|| format!("open log file {file}"))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
