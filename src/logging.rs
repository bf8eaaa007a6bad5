use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE: &str = "subtitles.log";

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`
/// level. The returned guard flushes the file log when dropped, so it has to
/// outlive the run.
pub fn init(verbose: bool, file_folder: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
    });

    let (file_layer, guard) = match file_folder {
        Some(folder) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE)
                .build(folder)
                .with_context(|| format!("Could not open log folder {}", folder.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
