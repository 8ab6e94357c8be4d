use crate::error::ConfigError;
use crate::settings::Settings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when present; otherwise the level is `debug` in debug mode and
/// `info` elsewhere. When `log_dir` is configured a daily rolling file layer is
/// added next to stdout. The returned guard must be held for the lifetime of the
/// process or buffered file output is lost.
pub fn init_tracing(settings: &Settings) -> Result<Option<WorkerGuard>, ConfigError> {
    let default_level = if settings.debug_mode { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match &settings.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "wellness.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| ConfigError::LoggingError(e.to_string()))?;

    Ok(guard)
}
