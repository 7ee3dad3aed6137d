use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const FILE_FILTER: &str =
    "debug,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn,sqlx=warn";

/// Installs the global subscriber: stdout filtered by `RUST_LOG` (default
/// `info`), plus `<process>.log` and `<process>_error.log` under `log_dir`.
pub fn init_logging(process: &str, log_dir: Option<&Path>) -> Result<(), LoggingError> {
    let stdout = fmt::layer().with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );

    let (file, error_file) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|e| LoggingError::Io(dir.to_path_buf(), e))?;
            let all = open_append(&dir.join(format!("{}.log", process)))?;
            let errors = open_append(&dir.join(format!("{}_error.log", process)))?;
            (
                Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(all))
                        .with_filter(EnvFilter::new(FILE_FILTER)),
                ),
                Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(errors))
                        .with_filter(LevelFilter::ERROR),
                ),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout)
        .with(file)
        .with(error_file)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}

fn open_append(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LoggingError::Io(path.to_path_buf(), e))
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Cannot open log destination {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Tracing subscriber already installed: {0}")]
    Init(String),
}
