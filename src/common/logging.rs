use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use super::config::Config;

/// Install the global tracing subscriber.
///
/// Logs go to stderr so JSON on stdout stays parseable. `RUST_LOG` wins over
/// the `verbose` default. When `to_file` is set, a daily-rolling file under
/// `~/.mole/logs` is added; keep the returned guard alive until exit or the
/// tail of the log is lost.
pub fn init(verbose: bool, to_file: bool) -> Result<Option<WorkerGuard>> {
    let default_directive = if verbose { "mole=debug" } else { "mole=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .boxed();

    let (file_layer, guard) = if to_file {
        let dir = Config::logs_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log dir: {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(&dir, "mole.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
