//! Структурированное логирование на `tracing`.
//!
//! - `config`: `LoggingConfig` — уровень, формат, файловый sink.
//! - `filters`: `EnvFilter` с приоритетом `RUST_LOG`.
//! - `formatter`: fmt-слои json/pretty/compact.
//! - `handle`: `LoggingHandle`, владеющий guard'ом файлового writer'а.

pub mod config;
mod filters;
pub(crate) mod formatter;
pub mod handle;

pub use config::{FileLogConfig, LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use tracing_appender::{non_blocking, rolling::daily};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::BusError;

/// Инициализация глобального subscriber'а по конфигурации.
///
/// Консольный слой есть всегда; файловый (ежедневная ротация, без ANSI)
/// добавляется, если задан `config.file`. Повторный вызов в одном процессе
/// возвращает [`BusError::Logging`].
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle, BusError> {
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter(config);
    let mut layers = vec![formatter::build_formatter(
        config,
        config.format,
        config.with_ansi,
        std::io::stdout,
    )];

    let file_guard = match &config.file {
        Some(file) => {
            let appender = daily(&file.dir, &file.prefix);
            let (writer, guard) = non_blocking(appender);
            layers.push(formatter::build_formatter(config, config.format, false, writer));
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| BusError::Logging(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.build_filter_directive(),
        format = ?config.format,
        file_enabled = file_guard.is_some(),
        "Logging system initialized"
    );

    let log_dir = config.file.as_ref().map(|file| file.dir.clone());
    Ok(LoggingHandle::new(file_guard, log_dir))
}
