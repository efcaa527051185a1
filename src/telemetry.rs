use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LogFormat};

/// Install the global subscriber for a binary.
///
/// `RUST_LOG` overrides `default_filter`. With `log_dir` set, output goes to
/// a daily-rolling `lexflow.log` there; otherwise to stderr. Keep the
/// returned guard alive until exit so buffered lines get flushed.
pub fn init(config: &Config, default_filter: &str) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "lexflow.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(writer)).try_init(),
        LogFormat::Plain => registry
            .with(fmt::layer().with_target(false).with_writer(writer))
            .try_init(),
    };
    if installed.is_err() {
        // Already installed (tests, embedding); keep the existing one.
        return None;
    }
    guard
}
