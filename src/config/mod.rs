//! Runtime configuration: defaults, an optional file, then `WIDGETBUS_*`
//! environment variables.

pub mod settings;

pub use settings::{Settings, StorageSettings};
