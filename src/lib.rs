/// Named broadcast channels shared by brokers (hub, endpoints).
pub mod channel;
/// Runtime configuration loading.
pub mod config;
/// Error types re-exported from `widgetbus-error` plus startup errors.
pub mod error;
/// Structured logging (filters, formats, file sink).
pub mod logging;
/// Pub/Sub: MessageBroker, AckBroker, events and identities.
pub mod pubsub;
/// Key/value persistence: in-memory and file stores, StorageManager.
pub mod storage;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Broadcast transport.
pub use channel::{BroadcastChannel, ChannelHub, ChannelPoster, DEFAULT_CHANNEL_NAME};
/// config
pub use crate::config::{Settings, StorageSettings};
/// Operation errors and result types.
pub use error::{AckError, BusError, BusResult, ErrorExt, RecvError, StatusCode, StorageError};
/// Logging setup.
pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingHandle};
/// Pub/Sub API.
pub use pubsub::{
    AckBroker, AckEvent, BrokerConfig, ChannelEvent, Identity, MessageBroker, MessageId,
    RetryPolicy, Subscriber,
};
/// Storage.
pub use storage::{FileStore, InMemoryStore, KeyValueStore, StorageKind, StorageManager};
