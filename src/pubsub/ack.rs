use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::{
    task::AbortHandle,
    time::{self, Instant, MissedTickBehavior},
};

use super::{
    AckEvent, BrokerConfig, ChannelEvent, MessageBroker, MessageId, MessageIdGenerator, Subscriber,
};
use crate::{
    channel::ChannelHub,
    error::{log_by_status, AckError},
};

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(1500);

/// Outcome callback of [`AckBroker::send`].
pub type AckCallback = Box<dyn FnOnce(Result<AckEvent, AckError>) + Send + 'static>;

/// Fixed-interval retry budget. No backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-publishes after the initial one.
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Outstanding send. Present in the table while unacknowledged.
struct PendingAck {
    event: AckEvent,
    subscriber: Subscriber,
    callback: Mutex<AckCallback>,
    retry: Option<AbortHandle>,
}

struct AckInner {
    broker: MessageBroker,
    pending: DashMap<MessageId, PendingAck>,
    policy: RetryPolicy,
    ids: MessageIdGenerator,
}

/// Delivery with acknowledgment on top of a [`MessageBroker`].
///
/// [`send`](Self::send) publishes an event flagged `needs_ack` and re-publishes
/// it on a fixed interval until a peer echoes it back through
/// [`received`](Self::received) or the retry budget runs out. The callback
/// fires exactly once with either outcome.
///
/// Each send goes `Pending -> Acknowledged` or `Pending -> Failed`; both are
/// terminal. The retry task and the internal echo subscription are torn down
/// on the transition.
pub struct AckBroker {
    inner: Arc<AckInner>,
}

impl AckBroker {
    pub fn new(
        hub: &ChannelHub,
        config: BrokerConfig,
    ) -> Self {
        Self::with_policy(hub, config, RetryPolicy::default())
    }

    pub fn with_policy(
        hub: &ChannelHub,
        config: BrokerConfig,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(AckInner {
                broker: MessageBroker::new(hub, config),
                pending: DashMap::new(),
                policy,
                ids: MessageIdGenerator::new(),
            }),
        }
    }

    /// Acknowledges an incoming event.
    ///
    /// Events carrying an id and still flagged `needs_ack` are re-published
    /// verbatim; the original sender takes the echo as proof of delivery.
    /// Anything else is ignored.
    pub fn received(
        &self,
        event: &ChannelEvent,
    ) {
        if !event.needs_ack() {
            return;
        }
        if let Some(header) = &event.ack {
            tracing::debug!(id = %header.id, topic = %event.topic, "acknowledging message");
        }
        self.inner.broker.publish_event(event.clone());
    }

    /// Publishes `event` and waits for an acknowledgment.
    ///
    /// The sender defaults to the broker identity when empty. `callback`
    /// receives the sent event with `needs_ack` cleared once a peer echoes
    /// it, or [`AckError::Timeout`] after the retry budget is spent.
    ///
    /// Returns the id assigned to this send. Must be called within a Tokio
    /// runtime: the retry timer is a spawned task.
    pub fn send<F>(
        &self,
        event: ChannelEvent,
        callback: F,
    ) -> MessageId
    where
        F: FnOnce(Result<AckEvent, AckError>) + Send + 'static,
    {
        let inner = &self.inner;
        let id = inner.ids.next_id();
        let sender = if event.sender.is_empty() {
            inner.broker.identity().to_string()
        } else {
            event.sender
        };
        let ack_event = AckEvent {
            topic: event.topic,
            sender,
            message: event.message,
            id: id.clone(),
            needs_ack: true,
        };

        let subscriber = echo_subscriber(Arc::downgrade(inner), &id);
        inner.pending.insert(
            id.clone(),
            PendingAck {
                event: ack_event.clone(),
                subscriber: subscriber.clone(),
                callback: Mutex::new(Box::new(callback)),
                retry: None,
            },
        );
        // Слушаем эхо до первой публикации, чтобы не пропустить быстрый ack
        inner.broker.subscribe(&ack_event.topic, subscriber);

        let wire: ChannelEvent = ack_event.into();
        inner.broker.publish_event(wire.clone());
        tracing::debug!(id = %id, topic = %wire.topic, "sent message awaiting acknowledgement");

        let task = tokio::spawn(retry_loop(Arc::downgrade(inner), id.clone(), wire));
        match inner.pending.get_mut(&id) {
            Some(mut entry) => entry.retry = Some(task.abort_handle()),
            // Уже подтверждено
            None => task.abort(),
        }
        id
    }

    /// Returns `true` while the send with `id` awaits acknowledgment.
    pub fn is_pending(
        &self,
        id: &str,
    ) -> bool {
        self.inner.pending.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// The underlying broker, for plain subscriptions and publishes on the
    /// same channel.
    pub fn broker(&self) -> &MessageBroker {
        &self.inner.broker
    }

    pub fn policy(&self) -> RetryPolicy {
        self.inner.policy
    }
}

impl std::fmt::Debug for AckBroker {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AckBroker")
            .field("broker", &self.inner.broker)
            .field("policy", &self.inner.policy)
            .field("pending", &self.inner.pending.len())
            .finish()
    }
}

impl AckInner {
    fn acknowledge(
        &self,
        id: &str,
    ) {
        let Some((_, pending)) = self.pending.remove(id) else {
            return;
        };
        if let Some(retry) = &pending.retry {
            retry.abort();
        }
        self.broker
            .unsubscribe(&pending.event.topic, &pending.subscriber);
        tracing::debug!(id, topic = %pending.event.topic, "message acknowledged");

        let outcome = pending.event.acknowledged();
        (pending.callback.into_inner())(Ok(outcome));
    }

    fn fail(
        &self,
        id: &str,
        attempts: u32,
    ) {
        let Some((_, pending)) = self.pending.remove(id) else {
            return;
        };
        self.broker
            .unsubscribe(&pending.event.topic, &pending.subscriber);
        let err = AckError::Timeout {
            id: id.to_owned(),
            attempts,
        };
        log_by_status!(
            err,
            id,
            topic = %pending.event.topic,
            attempts,
            "failed to receive acknowledgement for message"
        );

        (pending.callback.into_inner())(Err(err));
    }
}

impl Drop for AckInner {
    fn drop(&mut self) {
        for entry in self.pending.iter() {
            if let Some(retry) = &entry.retry {
                retry.abort();
            }
        }
        if !self.pending.is_empty() {
            tracing::debug!(
                pending = self.pending.len(),
                "ack broker dropped with unresolved sends"
            );
        }
    }
}

/// Internal subscriber that watches a topic for the echo of `id`.
///
/// Its widget label is unique to the send, so its identity never matches
/// the sender stamped on the echo.
fn echo_subscriber(
    inner: Weak<AckInner>,
    id: &str,
) -> Subscriber {
    let expected = id.to_owned();
    Subscriber::new(format!("ack-{id}"), move |event| {
        if !event.is_ack_for(&expected) {
            return;
        }
        if let Some(inner) = inner.upgrade() {
            inner.acknowledge(&expected);
        }
    })
}

async fn retry_loop(
    weak: Weak<AckInner>,
    id: MessageId,
    event: ChannelEvent,
) {
    let Some(policy) = weak.upgrade().map(|inner| inner.policy) else {
        return;
    };
    let mut ticker = time::interval_at(Instant::now() + policy.interval, policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts = 0;

    loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else {
            break;
        };
        if !inner.pending.contains_key(&id) {
            break;
        }
        if attempts < policy.attempts {
            attempts += 1;
            tracing::debug!(id = %id, attempt = attempts, "re-sending unacknowledged message");
            inner.broker.publish_event(event.clone());
        } else {
            inner.fail(&id, attempts);
            break;
        }
    }
}
