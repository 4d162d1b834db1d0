use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки получения событий из широковещательного канала.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecvError {
    /// Все отправители канала закрыты.
    #[error("Channel is closed")]
    Closed,
    /// Получатель отстал, часть событий потеряна.
    #[error("Receiver lagged behind by {count} events")]
    Lagged { count: u64 },
}

/// Неуспешный исход отправки с подтверждением.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AckError {
    /// Подтверждение не пришло за отведённое число повторов.
    #[error("Failed to receive acknowledgement for message: {id}")]
    Timeout { id: String, attempts: u32 },
}

impl AckError {
    /// Идентификатор сообщения, которое не было подтверждено.
    pub fn id(&self) -> &str {
        match self {
            Self::Timeout { id, .. } => id,
        }
    }
}

impl ErrorExt for RecvError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Closed => StatusCode::ChannelClosed,
            Self::Lagged { .. } => StatusCode::Lagged,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "channel_recv".to_string()),
            ("status_code", self.status_code().to_string()),
        ];
        if let Self::Lagged { count } = self {
            tags.push(("lagged_count", count.to_string()));
        }
        tags
    }
}

impl ErrorExt for AckError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Timeout { .. } => StatusCode::NotAcknowledged,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Timeout { id, attempts } => vec![
                ("error_type", "ack_timeout".to_string()),
                ("status_code", self.status_code().to_string()),
                ("message_id", id.clone()),
                ("attempts", attempts.to_string()),
            ],
        }
    }
}

/// Конвертация из tokio::sync::broadcast::error::RecvError
#[cfg(feature = "tokio")]
impl From<tokio::sync::broadcast::error::RecvError> for RecvError {
    fn from(err: tokio::sync::broadcast::error::RecvError) -> Self {
        match err {
            tokio::sync::broadcast::error::RecvError::Closed => RecvError::Closed,
            tokio::sync::broadcast::error::RecvError::Lagged(n) => RecvError::Lagged { count: n },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recv_error() {
        let err = RecvError::Lagged { count: 42 };
        assert_eq!(err.status_code(), StatusCode::Lagged);
        assert!(err.to_string().contains("42 events"));
        assert!(err
            .metrics_tags()
            .iter()
            .any(|(k, v)| *k == "lagged_count" && v == "42"));
    }

    /// Тест проверяет текст ошибки и доступ к идентификатору сообщения.
    #[test]
    fn test_ack_timeout() {
        let err = AckError::Timeout {
            id: "abc-1".to_string(),
            attempts: 3,
        };
        assert_eq!(err.id(), "abc-1");
        assert_eq!(err.status_code(), StatusCode::NotAcknowledged);
        assert_eq!(
            err.to_string(),
            "Failed to receive acknowledgement for message: abc-1"
        );
        let tags = err.metrics_tags();
        assert!(tags.iter().any(|(k, v)| *k == "attempts" && v == "3"));
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn test_broadcast_conversion() {
        let err = tokio::sync::broadcast::error::RecvError::Lagged(7);
        let converted: RecvError = err.into();
        assert_eq!(converted, RecvError::Lagged { count: 7 });
    }
}
