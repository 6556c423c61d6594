use music_indexer::Error;
use std::env;
use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Stdout plus optional file logging. The returned guard must outlive all logging.
pub fn init_logger(
    level: Option<&str>,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>, Error> {
    let filter = level
        .map(str::to_string)
        .or_else(|| env::var("TRACING_LEVEL").ok())
        .unwrap_or_else(|| "info".to_string());
    let filter_layer = EnvFilter::new(filter);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(open_appender(path)?);
            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .with_ansi(true),
        )
        .with(file_layer)
        .with(filter_layer)
        .init();

    match log_file {
        Some(path) => info!("Logging to stdout and {}", path.display()),
        None => info!("Logging to stdout"),
    }

    Ok(guard)
}

fn open_appender(path: &Path) -> Result<RollingFileAppender, Error> {
    let log_error = |message: String| Error::LogDestination {
        path: path.to_path_buf(),
        message,
    };

    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| log_error("no file name".to_string()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy().into_owned())
        .build(directory)
        .map_err(|e| log_error(e.to_string()))
}
