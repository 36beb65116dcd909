use chrono::Local;
use std::io;
use std::path::PathBuf;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

use crate::utils::paths::AppPaths;

/// Initialize the tracing system with a file logger that appends to a timestamp-named file.
/// Configuration is loaded from the RUST_LOG environment variable. Returns the
/// log file path, or `None` when logging to stderr because no data directory exists.
pub fn init_tracing() -> io::Result<Option<PathBuf>> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(log_dir) = AppPaths::log_dir() {
        std::fs::create_dir_all(&log_dir)?;

        let file_name = format!("{timestamp}.log");
        let file_appender = rolling::never(&log_dir, &file_name);

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::Layer::new()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(EnvFilter::from_default_env());

        tracing::subscriber::set_global_default(subscriber).map_err(io::Error::other)?;

        let path = log_dir.join(file_name);
        tracing::debug!(
            target: "runwatch::utils::tracing",
            path = %path.display(),
            "Tracing initialized with file output. Filter configured via RUST_LOG env var."
        );
        Ok(Some(path))
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::Layer::default()
                    .with_writer(io::stderr)
                    .with_ansi(true)
                    .with_target(true),
            )
            .with(EnvFilter::from_default_env());

        tracing::subscriber::set_global_default(subscriber).map_err(io::Error::other)?;

        tracing::debug!(
            target: "runwatch::utils::tracing",
            "Tracing initialized with stderr output. Filter configured via RUST_LOG env var."
        );
        Ok(None)
    }
}
