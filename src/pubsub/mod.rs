//! Подсистема Publish–Subscribe для виджетов.
//!
//! Брокеры на одном именованном канале образуют общую шину: событие,
//! опубликованное одним брокером, доставляется подписчикам всех остальных.
//!
//! - `broker`: `MessageBroker` — подписки, публикация, хранение и повторная
//!   выдача истории поздним подписчикам.
//! - `ack`: `AckBroker` — отправка с подтверждением и повторами.
//! - `event`: формат событий на канале.
//! - `identity`: идентичность `"{widget}-{page}"` и фильтрация собственных
//!   событий.
//! - `subscriber`: обработчики событий.
//! - `id`: генерация идентификаторов сообщений.
//! - `registry` (приватный): таблица подписок и сохранённых событий.

pub mod ack;
pub mod broker;
pub mod event;
pub mod id;
pub mod identity;
mod registry;
pub mod subscriber;

pub use ack::{AckBroker, AckCallback, RetryPolicy, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_INTERVAL};
pub use broker::{BrokerConfig, History, MessageBroker};
pub use event::{AckEvent, AckHeader, ChannelEvent};
pub use id::{MessageId, MessageIdGenerator};
pub use identity::{Identity, DEFAULT_WIDGET};
pub use subscriber::Subscriber;
