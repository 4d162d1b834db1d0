use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// Формат вывода событий.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    #[default]
    Compact,
}

/// Файловый sink с ежедневной ротацией.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    pub dir: PathBuf,
    /// Префикс имени файла; к нему добавляется дата.
    pub prefix: String,
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            prefix: "widgetbus.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень или полная директива `EnvFilter` (`"info"`,
    /// `"warn,widgetbus=debug"`). `RUST_LOG` имеет приоритет.
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    /// `None` — только консоль.
    pub file: Option<FileLogConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn build_filter_directive(&self) -> String {
        let level = self.level.trim();
        if level.is_empty() {
            "info".to_string()
        } else {
            level.to_string()
        }
    }

    pub fn validate(&self) -> Result<(), BusError> {
        let directive = self.build_filter_directive();
        tracing_subscriber::EnvFilter::try_new(&directive)
            .map(|_| ())
            .map_err(|e| BusError::Logging(format!("invalid filter '{directive}': {e}")))?;
        if let Some(file) = &self.file {
            if file.prefix.is_empty() {
                return Err(BusError::Logging("log file prefix is empty".to_string()));
            }
        }
        Ok(())
    }

    /// Создаёт каталог для файлового sink'а, если он включён.
    pub fn ensure_log_dir(&self) -> Result<(), BusError> {
        if let Some(file) = &self.file {
            std::fs::create_dir_all(&file.dir)?;
        }
        Ok(())
    }
}
