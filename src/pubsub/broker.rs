use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::{registry::Registry, ChannelEvent, Identity, Subscriber, DEFAULT_WIDGET};
use crate::{
    channel::{BroadcastChannel, ChannelHub, ChannelPoster},
    error::{log_by_status, RecvError},
    storage::StorageManager,
};

/// Stored history keyed by topic.
pub type History = HashMap<String, Vec<ChannelEvent>>;

/// Construction parameters of a [`MessageBroker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Channel to join; `None` means the default channel.
    pub channel_name: Option<String>,
    /// Path of the page hosting the widgets, part of every identity.
    pub page_path: String,
    /// Widget label used to stamp events published without an override.
    pub widget_name: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            channel_name: None,
            page_path: "/".to_string(),
            widget_name: DEFAULT_WIDGET.to_string(),
        }
    }
}

impl BrokerConfig {
    pub fn new(page_path: impl Into<String>) -> Self {
        Self {
            page_path: page_path.into(),
            ..Self::default()
        }
    }

    pub fn channel(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.channel_name = Some(name.into());
        self
    }

    pub fn widget(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.widget_name = name.into();
        self
    }
}

/// State shared between the broker handle and its listener task.
///
/// The registry lock is never held while a callback runs.
struct Shared {
    registry: Mutex<Registry>,
}

/// Topic-based publish/subscribe over one broadcast channel endpoint.
///
/// Supports:
/// - Idempotent subscription (the same callback is registered once per topic)
/// - Per-topic message history replayed to late subscribers
/// - Echo suppression by sender identity
///
/// Events published here reach every *other* broker on the same channel.
/// Incoming events for a topic without subscribers are discarded and leave
/// no history.
///
/// Must be created inside a Tokio runtime: the constructor spawns the task
/// that listens on the channel. Dropping the broker stops that task.
pub struct MessageBroker {
    poster: ChannelPoster,
    identity: Identity,
    page_path: Arc<str>,
    shared: Arc<Shared>,
    listener: JoinHandle<()>,
}

impl MessageBroker {
    /// Joins the configured channel on `hub` and starts listening.
    ///
    /// # Panics
    /// Вне контекста Tokio runtime (слушатель запускается через
    /// `tokio::spawn`).
    pub fn new(
        hub: &ChannelHub,
        config: BrokerConfig,
    ) -> Self {
        let channel = hub.open(config.channel_name.as_deref());
        let poster = channel.poster();
        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry::new()),
        });
        let listener = tokio::spawn(listen(channel, Arc::clone(&shared)));
        let identity = Identity::derive(&config.widget_name, &config.page_path);

        tracing::debug!(
            channel = poster.name(),
            identity = %identity,
            "message broker started"
        );

        Self {
            poster,
            identity,
            page_path: Arc::from(config.page_path),
            shared,
            listener,
        }
    }

    /// Registers `subscriber` on `topic`.
    ///
    /// Returns `false` if this subscriber is already registered on the topic.
    /// On a new registration every stored message for the topic not sent by
    /// the subscriber's identity is replayed to it before returning, in
    /// arrival order. Live events that arrive meanwhile are queued and
    /// delivered right after the replay, so the subscriber sees one ordered
    /// stream.
    pub fn subscribe(
        &self,
        topic: &str,
        subscriber: Subscriber,
    ) -> bool {
        let identity = self.identity_for(subscriber.name());
        let replay = self
            .shared
            .registry
            .lock()
            .subscribe(topic, subscriber.clone(), identity);

        let Some(replay) = replay else {
            tracing::debug!(topic, subscriber = subscriber.name(), "duplicate subscription ignored");
            return false;
        };

        tracing::debug!(
            topic,
            subscriber = subscriber.name(),
            replayed = replay.events.len(),
            "subscribed"
        );
        let mut batch = replay.events;
        loop {
            for event in &batch {
                deliver(&subscriber, event);
            }
            let queued = self.shared.registry.lock().drain(topic, replay.ticket);
            match queued {
                Some(next) => batch = next,
                None => break,
            }
        }
        true
    }

    /// Removes `subscriber` from `topic`. Returns `false` if it was not
    /// registered there.
    pub fn unsubscribe(
        &self,
        topic: &str,
        subscriber: &Subscriber,
    ) -> bool {
        let removed = self.shared.registry.lock().unsubscribe(topic, subscriber);
        if removed {
            tracing::debug!(topic, subscriber = subscriber.name(), "unsubscribed");
        }
        removed
    }

    /// Broadcasts `message` on `topic`.
    ///
    /// The event's sender is `sender_override` when given, otherwise this
    /// broker's own identity.
    pub fn publish(
        &self,
        topic: &str,
        message: impl Into<String>,
        sender_override: Option<&str>,
    ) {
        let sender = match sender_override {
            Some(sender) if !sender.is_empty() => sender.to_owned(),
            _ => self.identity.to_string(),
        };
        self.publish_event(ChannelEvent::new(topic, sender, message));
    }

    /// Broadcasts a prebuilt event verbatim. Returns the number of other
    /// endpoints that were listening.
    pub fn publish_event(
        &self,
        event: ChannelEvent,
    ) -> usize {
        let event = Arc::new(event);
        let listeners = self.poster.post_message(Arc::clone(&event));
        tracing::debug!(
            channel = self.poster.name(),
            topic = %event.topic,
            sender = %event.sender,
            listeners,
            "published"
        );
        listeners
    }

    /// Name of the channel this broker is joined to.
    pub fn channel_name(&self) -> &str {
        self.poster.name()
    }

    /// Identity stamped on events published without a sender override.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Identity of a widget on this broker's page.
    pub fn identity_for(
        &self,
        widget: &str,
    ) -> Identity {
        Identity::derive(widget, &self.page_path)
    }

    pub fn page_path(&self) -> &str {
        &self.page_path
    }

    pub fn subscriber_count(
        &self,
        topic: &str,
    ) -> usize {
        self.shared.registry.lock().subscriber_count(topic)
    }

    /// Stored messages for `topic`, oldest first.
    pub fn stored_messages(
        &self,
        topic: &str,
    ) -> Vec<ChannelEvent> {
        self.shared.registry.lock().stored(topic)
    }

    /// Snapshot of the stored-message log of every topic.
    pub fn history(&self) -> History {
        self.shared.registry.lock().history()
    }

    /// Appends saved events to the stored-message log. Returns how many
    /// events were added.
    pub fn restore_history(
        &self,
        history: History,
    ) -> usize {
        self.shared.registry.lock().restore(history)
    }

    /// Saves the stored-message log under `key`.
    pub fn persist_history(
        &self,
        storage: &StorageManager,
        key: &str,
    ) {
        storage.set_item(key, &self.history());
    }

    /// Restores a log previously saved with
    /// [`persist_history`](Self::persist_history). Missing or unreadable
    /// entries restore nothing.
    pub fn load_history(
        &self,
        storage: &StorageManager,
        key: &str,
    ) -> usize {
        storage
            .get_item::<History>(key)
            .map_or(0, |history| self.restore_history(history))
    }

    /// Runs the incoming-event path for `event` as if it had arrived on the
    /// channel.
    #[cfg(test)]
    pub(crate) fn handle_incoming_message(
        &self,
        event: ChannelEvent,
    ) {
        dispatch(&self.shared, &Arc::new(event));
    }
}

impl Drop for MessageBroker {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl std::fmt::Debug for MessageBroker {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("MessageBroker")
            .field("channel", &self.poster.name())
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

async fn listen(
    mut channel: BroadcastChannel,
    shared: Arc<Shared>,
) {
    loop {
        match channel.recv().await {
            Ok(event) => dispatch(&shared, &event),
            Err(err @ RecvError::Lagged { .. }) => {
                log_by_status!(
                    err,
                    channel = channel.name(),
                    "broker lagged behind the channel, events were lost"
                );
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::debug!(channel = channel.name(), "broker listener stopped");
}

fn dispatch(
    shared: &Shared,
    event: &Arc<ChannelEvent>,
) {
    let recipients = shared.registry.lock().accept(event);
    tracing::trace!(
        topic = %event.topic,
        sender = %event.sender,
        recipients = recipients.len(),
        "incoming event"
    );
    for subscriber in &recipients {
        deliver(subscriber, event);
    }
}

fn deliver(
    subscriber: &Subscriber,
    event: &ChannelEvent,
) {
    if !subscriber.deliver(event) {
        tracing::warn!(
            topic = %event.topic,
            subscriber = subscriber.name(),
            "subscriber panicked while handling an event"
        );
    }
}
