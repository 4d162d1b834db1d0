pub mod pubsub;
pub mod storage;

// Публичный экспорт всех типов ошибок из вложенных модулей.
pub use pubsub::*;
pub use storage::*;
