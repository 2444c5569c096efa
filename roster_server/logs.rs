use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use roster_app::config::Config;

/// Sets up the logging configuration for the application.
///
/// Two layers are installed: one writing to stdout and one writing to a daily
/// rotating file under `logs/`.
///
/// Log levels are controlled by the `RUST_LOG` environment variable. When it
/// is not set, everything logs at `info`, and the `roster` crates at `debug`
/// if `config.debug` is on.
///
/// The returned guard flushes the file writer when dropped, so keep it alive
/// for as long as the process logs.
pub fn setup_logging(config: &Config) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "roster.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_thread_ids(true)
        .with_target(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(true);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config.debug)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}

fn default_filter(debug: bool) -> &'static str {
    if debug { "info,roster=debug" } else { "info" }
}
