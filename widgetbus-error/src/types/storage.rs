use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

pub type StorageResult<T> = Result<T, StorageError>;

/// Ошибки key/value хранилища.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize item '{key}': {reason}")]
    Serialize { key: String, reason: String },

    #[error("Failed to parse item '{key}': {reason}")]
    Deserialize { key: String, reason: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl ErrorExt for StorageError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Io(_) => StatusCode::Io,
            Self::Serialize { .. } => StatusCode::SerializationFailed,
            Self::Deserialize { .. } => StatusCode::DeserializationFailed,
            Self::Backend(_) => StatusCode::StorageUnavailable,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "storage".to_string()),
            ("status_code", self.status_code().to_string()),
        ];
        match self {
            Self::Serialize { key, .. } | Self::Deserialize { key, .. } => {
                tags.push(("key", key.clone()));
            }
            _ => {}
        }
        tags
    }
}
