use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde")]
use serde_repr::{Deserialize_repr, Serialize_repr};
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 1xxx: Общие ошибки
/// - 4xxx: Перегрузка (отставание получателя)
/// - 5xxx: Хранилище
/// - 6xxx: Транспорт / доставка
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[cfg_attr(feature = "serde", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 1xxx: Общие ошибки ===
    Internal = 1002,
    InvalidArgs = 1003,

    // === 4xxx: Перегрузка ===
    Lagged = 4000,

    // === 5xxx: Хранилище ===
    StorageUnavailable = 5000,
    SerializationFailed = 5001,
    DeserializationFailed = 5002,

    // === 6xxx: Транспорт ===
    Io = 6000,
    ChannelClosed = 6001,
    NotAcknowledged = 6003,
}

/// Уровень, на котором ошибка с данным кодом попадает в лог.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::InvalidArgs => LogLevel::Info,
            Self::Lagged | Self::ChannelClosed | Self::Io => LogLevel::Warn,
            Self::NotAcknowledged
            | Self::Internal
            | Self::StorageUnavailable
            | Self::SerializationFailed
            | Self::DeserializationFailed => LogLevel::Error,
        }
    }
}

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}
