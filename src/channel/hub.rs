use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::DashMap;
use tokio::sync::broadcast;

use super::{BroadcastChannel, Envelope};

/// Channel name used when the caller does not supply one.
pub const DEFAULT_CHANNEL_NAME: &str = "widget-message-channel";

/// Default per-channel buffer capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

type ChannelKey = Arc<str>;

/// Registry of named broadcast channels.
///
/// Every endpoint opened on the same name joins the same
/// `tokio::sync::broadcast` channel. A hub is an ordinary value: construct
/// one per scope that should share channels and hand it to the brokers.
#[derive(Debug)]
pub struct ChannelHub {
    /// Имя канала → `Sender`
    channels: DashMap<ChannelKey, broadcast::Sender<Envelope>>,
    /// Ёмкость буфера каждого `broadcast::channel`
    capacity: usize,
    next_endpoint: AtomicU64,
}

impl ChannelHub {
    /// Создаёт хаб с заданной ёмкостью буфера каналов.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
            next_endpoint: AtomicU64::new(1),
        }
    }

    /// Opens a new endpoint on `name` (or [`DEFAULT_CHANNEL_NAME`]).
    pub fn open(
        &self,
        name: Option<&str>,
    ) -> BroadcastChannel {
        let name = name.filter(|n| !n.is_empty()).unwrap_or(DEFAULT_CHANNEL_NAME);
        let key: ChannelKey = Arc::from(name);
        let tx = self
            .channels
            .entry(key.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone();
        let endpoint = self.next_endpoint.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(channel = %key, endpoint, "opened channel endpoint");
        BroadcastChannel::new(key, endpoint, tx)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Количество зарегистрированных каналов.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Количество живых endpoint'ов на канале.
    pub fn listener_count(
        &self,
        name: &str,
    ) -> usize {
        self.channels
            .get(name)
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Удаляет каналы, на которых не осталось ни одного endpoint'а.
    /// Returns the number of removed channels.
    pub fn prune_idle(&self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, tx| tx.receiver_count() > 0);
        before - self.channels.len()
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_uses_default_name() {
        let hub = ChannelHub::default();
        let a = hub.open(None);
        let b = hub.open(Some(""));
        assert_eq!(a.name(), DEFAULT_CHANNEL_NAME);
        assert_eq!(b.name(), DEFAULT_CHANNEL_NAME);
        assert_eq!(hub.channel_count(), 1);
        assert_eq!(hub.listener_count(DEFAULT_CHANNEL_NAME), 2);
    }

    /// Тест проверяет, что endpoint'ы получают разные идентификаторы.
    #[test]
    fn test_endpoints_are_distinct() {
        let hub = ChannelHub::new(8);
        let a = hub.open(Some("x"));
        let b = hub.open(Some("x"));
        assert_ne!(a.endpoint(), b.endpoint());
    }

    /// Тест проверяет удаление каналов без слушателей.
    #[test]
    fn test_prune_idle_channels() {
        let hub = ChannelHub::new(8);
        let keep = hub.open(Some("keep"));
        {
            let _gone = hub.open(Some("gone"));
        }
        assert_eq!(hub.channel_count(), 2);
        assert_eq!(hub.prune_idle(), 1);
        assert_eq!(hub.channel_count(), 1);
        assert_eq!(hub.listener_count("keep"), 1);
        assert_eq!(hub.listener_count("gone"), 0);
        drop(keep);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let hub = ChannelHub::new(0);
        assert_eq!(hub.capacity(), 1);
    }
}
