
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with both stdout and rolling file output.
/// Format: human-readable logfmt OR JSON if desired.
///
/// Keep the returned guard alive for the whole process, dropping it stops the file writer.
pub fn init_logging(log_dir: &str, json_format: bool) -> WorkerGuard {
    // Log file = <log_dir>/aggregator.log.{date}
    let file_appender = rolling::daily(log_dir, "aggregator.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG wins, otherwise info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Console layer on stderr; stdout carries command output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    let file_layer = if json_format {
        fmt::layer()
            .json()
            .with_writer(non_blocking_file)
            .with_current_span(false)
            .with_span_list(false)
            .with_level(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_target(false)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}
