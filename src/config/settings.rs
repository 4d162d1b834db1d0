use std::{path::Path, path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    channel::{ChannelHub, DEFAULT_CAPACITY, DEFAULT_CHANNEL_NAME},
    error::StorageResult,
    logging::LoggingConfig,
    pubsub::{BrokerConfig, RetryPolicy, DEFAULT_RETRY_ATTEMPTS, DEFAULT_WIDGET},
    storage::{StorageKind, StorageManager},
};

/// Storage Configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub kind: StorageKind,
    /// File of the local store; ignored for session storage.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub channel_name: String,
    pub page_path: String,
    pub widget_name: String,
    pub channel_capacity: usize,
    pub retry_attempts: u32,
    pub retry_interval_ms: u64,
    pub storage: StorageSettings,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            page_path: "/".to_string(),
            widget_name: DEFAULT_WIDGET.to_string(),
            channel_capacity: DEFAULT_CAPACITY,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_interval_ms: 1500,
            storage: StorageSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Defaults overlaid with `WIDGETBUS_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Defaults, then the file at `path` (format by extension), then the
    /// environment. Nested keys use `__`: `WIDGETBUS_STORAGE__KIND=local`.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // Adding default values
            .set_default("channel_name", DEFAULT_CHANNEL_NAME)?
            .set_default("page_path", "/")?
            .set_default("widget_name", DEFAULT_WIDGET)?
            .set_default("channel_capacity", DEFAULT_CAPACITY as i64)?
            .set_default("retry_attempts", i64::from(DEFAULT_RETRY_ATTEMPTS))?
            .set_default("retry_interval_ms", 1500)?
            .set_default("storage.kind", "session")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "compact")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            // Add environment variables with the WIDGETBUS_ prefix
            .add_source(
                Environment::with_prefix("WIDGETBUS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = cfg.try_deserialize()?;
        if settings.page_path.is_empty() {
            return Err(ConfigError::Message("page_path must not be empty".into()));
        }
        Ok(settings)
    }

    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            channel_name: Some(self.channel_name.clone()).filter(|name| !name.is_empty()),
            page_path: self.page_path.clone(),
            widget_name: self.widget_name.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            interval: Duration::from_millis(self.retry_interval_ms),
        }
    }

    pub fn channel_hub(&self) -> ChannelHub {
        ChannelHub::new(self.channel_capacity)
    }

    pub fn open_storage(&self) -> StorageResult<StorageManager> {
        StorageManager::open(self.storage.kind, self.storage.path.as_deref())
    }
}
