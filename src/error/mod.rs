use std::{any::Any, io};

use thiserror::Error;

pub use widgetbus_error::{
    AckError, ErrorExt, LogLevel, RecvError, StatusCode, StorageError, StorageResult,
};

/// Startup failures of the binary and the ambient layers.
///
/// Bus operations themselves never return this: outcomes of sends go to
/// callbacks and storage failures degrade to `None`.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Logging initialization failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type BusResult<T> = Result<T, BusError>;

/// Logs an [`ErrorExt`] error at the level its status code maps to.
///
/// The error goes out as the `error` field together with `status`; the
/// remaining arguments are regular `tracing` fields and the message.
macro_rules! log_by_status {
    ($err:expr, $($rest:tt)+) => {{
        let err = &$err;
        let status = $crate::error::ErrorExt::status_code(err);
        match status.log_level() {
            $crate::error::LogLevel::Info => {
                tracing::info!(status = status.code(), error = %err, $($rest)+)
            }
            $crate::error::LogLevel::Warn => {
                tracing::warn!(status = status.code(), error = %err, $($rest)+)
            }
            $crate::error::LogLevel::Error => {
                tracing::error!(status = status.code(), error = %err, $($rest)+)
            }
        }
    }};
}

pub(crate) use log_by_status;

impl ErrorExt for BusError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::InvalidArgs,
            Self::Storage(e) => e.status_code(),
            Self::Logging(_) => StatusCode::Internal,
            Self::Io(_) => StatusCode::Io,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_source() {
        let err = BusError::from(StorageError::Backend("gone".into()));
        assert_eq!(err.status_code(), StatusCode::StorageUnavailable);
        assert_eq!(err.to_string(), "Storage error: Storage backend error: gone");

        let err = BusError::from(config::ConfigError::Message("bad".into()));
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
        assert_eq!(err.client_message(), err.to_string());
    }

    /// Тест проверяет, что уровень записи в лог берётся из кода статуса.
    #[test]
    fn test_log_by_status_picks_level_from_code() {
        use tracing_subscriber::{layer::SubscriberExt, Registry};

        use crate::logging::{
            formatter::{build_formatter, tests::BufferWriter},
            LogFormat, LoggingConfig,
        };

        let writer = BufferWriter::default();
        let layer = build_formatter::<Registry, _>(
            &LoggingConfig::default(),
            LogFormat::Json,
            false,
            writer.clone(),
        );
        tracing::subscriber::with_default(Registry::default().with(layer), || {
            let timeout = AckError::Timeout {
                id: "k-1".to_string(),
                attempts: 3,
            };
            log_by_status!(timeout, id = "k-1", "ack failed");
            log_by_status!(RecvError::Lagged { count: 5 }, "lagged");
        });

        let lines: Vec<serde_json::Value> = writer
            .contents()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "ERROR");
        assert_eq!(lines[0]["fields"]["status"], 6003);
        assert_eq!(lines[0]["fields"]["id"], "k-1");
        assert_eq!(lines[1]["level"], "WARN");
        assert_eq!(lines[1]["fields"]["status"], 4000);
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err = BusError::Logging("subscriber already set".into());
        assert_eq!(err.status_code(), StatusCode::Internal);
        assert_eq!(err.client_message(), "Internal error");
    }
}
