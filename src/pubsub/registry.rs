use std::{collections::HashMap, mem, sync::Arc};

use super::{ChannelEvent, Identity, Subscriber};

/// A subscriber together with the identity it was registered under.
#[derive(Debug, Clone)]
pub(crate) struct Registration {
    pub subscriber: Subscriber,
    pub identity: Identity,
    ticket: u64,
    /// `Some` while the stored history is still being replayed: live events
    /// are queued here instead of being handed out for delivery.
    backlog: Option<Vec<Arc<ChannelEvent>>>,
}

/// Stored events a fresh registration must receive, plus the ticket used to
/// drain live events that arrive while they are being delivered.
#[derive(Debug)]
pub(crate) struct Replay {
    pub ticket: u64,
    pub events: Vec<Arc<ChannelEvent>>,
}

/// Per-broker subscription registry and stored-message log.
///
/// Owned by exactly one broker. Methods never call user code: they return
/// the work to do (events to replay, subscribers to notify) so the caller
/// can run callbacks after releasing its lock.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    subscriptions: HashMap<String, Vec<Registration>>,
    stored: HashMap<String, Vec<Arc<ChannelEvent>>>,
    next_ticket: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `subscriber` on `topic`.
    ///
    /// Returns `None` for a duplicate. Otherwise returns the stored events the
    /// new subscriber must be replayed, in arrival order, with its own
    /// messages filtered out. Until [`drain`](Self::drain) reports the
    /// registration live, events accepted for it are held back.
    pub fn subscribe(
        &mut self,
        topic: &str,
        subscriber: Subscriber,
        identity: Identity,
    ) -> Option<Replay> {
        let entries = self.subscriptions.entry(topic.to_owned()).or_default();
        if entries.iter().any(|r| r.subscriber.same_as(&subscriber)) {
            return None;
        }

        let events = self
            .stored
            .get(topic)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| !identity.is_sender(&event.sender))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        entries.push(Registration {
            subscriber,
            identity,
            ticket,
            backlog: Some(Vec::new()),
        });
        Some(Replay { ticket, events })
    }

    /// Takes the events queued for the registration `ticket` on `topic`.
    ///
    /// Returns `None` once nothing is queued, and from then on the
    /// registration receives events directly from [`accept`](Self::accept).
    /// Also returns `None` if the registration is gone.
    pub fn drain(
        &mut self,
        topic: &str,
        ticket: u64,
    ) -> Option<Vec<Arc<ChannelEvent>>> {
        let registration = self
            .subscriptions
            .get_mut(topic)?
            .iter_mut()
            .find(|r| r.ticket == ticket)?;
        match registration.backlog.as_mut() {
            Some(backlog) if !backlog.is_empty() => Some(mem::take(backlog)),
            _ => {
                registration.backlog = None;
                None
            }
        }
    }

    /// Removes `subscriber` from `topic`. The topic entry goes away with its
    /// last subscriber; stored history stays.
    pub fn unsubscribe(
        &mut self,
        topic: &str,
        subscriber: &Subscriber,
    ) -> bool {
        let Some(entries) = self.subscriptions.get_mut(topic) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|r| !r.subscriber.same_as(subscriber));
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.subscriptions.remove(topic);
        }
        removed
    }

    /// Accepts an incoming event.
    ///
    /// Topics nobody listens to are dropped without touching the log and an
    /// empty list is returned. Otherwise the event is appended to the topic
    /// log and the subscribers that must receive it now (everyone except the
    /// sender and registrations still replaying) are returned.
    pub fn accept(
        &mut self,
        event: &Arc<ChannelEvent>,
    ) -> Vec<Subscriber> {
        let Some(entries) = self.subscriptions.get_mut(&event.topic) else {
            return Vec::new();
        };

        let mut recipients = Vec::with_capacity(entries.len());
        for registration in entries.iter_mut() {
            if registration.identity.is_sender(&event.sender) {
                continue;
            }
            match registration.backlog.as_mut() {
                Some(backlog) => backlog.push(Arc::clone(event)),
                None => recipients.push(registration.subscriber.clone()),
            }
        }

        self.stored
            .entry(event.topic.clone())
            .or_default()
            .push(Arc::clone(event));

        recipients
    }

    pub fn subscriber_count(
        &self,
        topic: &str,
    ) -> usize {
        self.subscriptions.get(topic).map_or(0, Vec::len)
    }

    pub fn stored(
        &self,
        topic: &str,
    ) -> Vec<ChannelEvent> {
        self.stored
            .get(topic)
            .map(|events| events.iter().map(|e| (**e).clone()).collect())
            .unwrap_or_default()
    }

    pub fn history(&self) -> HashMap<String, Vec<ChannelEvent>> {
        self.stored
            .iter()
            .map(|(topic, events)| {
                (
                    topic.clone(),
                    events.iter().map(|e| (**e).clone()).collect(),
                )
            })
            .collect()
    }

    /// Appends previously saved events to the log, topic by topic.
    pub fn restore(
        &mut self,
        history: HashMap<String, Vec<ChannelEvent>>,
    ) -> usize {
        let mut restored = 0;
        for (topic, events) in history {
            restored += events.len();
            self.stored
                .entry(topic)
                .or_default()
                .extend(events.into_iter().map(Arc::new));
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const PAGE: &str = "/page";

    fn sub(name: &str) -> (Subscriber, Identity) {
        (Subscriber::new(name, |_| {}), Identity::derive(name, PAGE))
    }

    fn event(
        topic: &str,
        sender: &str,
        message: &str,
    ) -> Arc<ChannelEvent> {
        Arc::new(ChannelEvent::new(topic, sender, message))
    }

    /// Подписывает и сразу переводит регистрацию в "живой" режим.
    fn join(
        registry: &mut Registry,
        topic: &str,
        subscriber: Subscriber,
        identity: Identity,
    ) {
        let replay = registry.subscribe(topic, subscriber, identity).unwrap();
        assert!(registry.drain(topic, replay.ticket).is_none());
    }

    /// Тест проверяет идемпотентность подписки.
    #[test]
    fn test_duplicate_subscribe_is_noop() {
        let mut registry = Registry::new();
        let (a, id) = sub("A");

        assert!(registry.subscribe("topicA", a.clone(), id.clone()).is_some());
        assert!(registry.subscribe("topicA", a, id).is_none());
        assert_eq!(registry.subscriber_count("topicA"), 1);
    }

    #[test]
    fn test_same_subscriber_on_two_topics() {
        let mut registry = Registry::new();
        let (a, id) = sub("A");

        assert!(registry.subscribe("t1", a.clone(), id.clone()).is_some());
        assert!(registry.subscribe("t2", a, id).is_some());
        assert_eq!(registry.subscriber_count("t1"), 1);
        assert_eq!(registry.subscriber_count("t2"), 1);
    }

    /// Тест проверяет, что сообщения без подписчиков не сохраняются.
    #[test]
    fn test_accept_without_subscribers_discards() {
        let mut registry = Registry::new();
        assert!(registry.accept(&event("nobody", "X-/page", "m")).is_empty());
        assert!(registry.stored("nobody").is_empty());
    }

    /// Тест проверяет подавление собственного эха при прямой доставке.
    #[test]
    fn test_accept_skips_sender() {
        let mut registry = Registry::new();
        let (a, a_id) = sub("A");
        let (b, b_id) = sub("B");
        join(&mut registry, "chat", a, a_id);
        join(&mut registry, "chat", b.clone(), b_id);

        let recipients = registry.accept(&event("chat", "A-/page", "hi"));
        assert_eq!(recipients.len(), 1);
        assert!(recipients[0].same_as(&b));
        assert_eq!(registry.stored("chat").len(), 1);
    }

    #[test]
    fn test_replay_excludes_own_messages() {
        let mut registry = Registry::new();
        let (watcher, watcher_id) = sub("W");
        registry.subscribe("chat", watcher, watcher_id);
        registry.accept(&event("chat", "A-/page", "from a"));
        registry.accept(&event("chat", "B-/page", "from b"));

        let (a, a_id) = sub("A");
        let replay = registry.subscribe("chat", a, a_id).unwrap().events;
        assert_eq!(replay.len(), 1);
        assert_eq!(replay[0].message, "from b");
    }

    /// Тест проверяет, что после ухода последнего подписчика новые сообщения
    /// отбрасываются, а история остаётся.
    #[test]
    fn test_unsubscribe_last_keeps_history() {
        let mut registry = Registry::new();
        let (a, a_id) = sub("A");
        registry.subscribe("chat", a.clone(), a_id);
        registry.accept(&event("chat", "B-/page", "kept"));

        assert!(registry.unsubscribe("chat", &a));
        assert!(!registry.unsubscribe("chat", &a));
        assert_eq!(registry.subscriber_count("chat"), 0);

        registry.accept(&event("chat", "B-/page", "dropped"));
        let stored = registry.stored("chat");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message, "kept");
    }

    /// Тест проверяет, что события, пришедшие во время воспроизведения
    /// истории, ставятся в очередь и выдаются после неё по порядку.
    #[test]
    fn test_events_during_replay_are_queued() {
        let mut registry = Registry::new();
        let (w, w_id) = sub("W");
        join(&mut registry, "t", w.clone(), w_id);
        registry.accept(&event("t", "A-/page", "stored"));

        let (late, late_id) = sub("L");
        let replay = registry.subscribe("t", late.clone(), late_id).unwrap();
        assert_eq!(replay.events.len(), 1);

        let recipients = registry.accept(&event("t", "A-/page", "live 1"));
        assert_eq!(recipients.len(), 1);
        assert!(recipients[0].same_as(&w));
        registry.accept(&event("t", "L-/page", "own"));
        registry.accept(&event("t", "A-/page", "live 2"));

        let queued = registry.drain("t", replay.ticket).unwrap();
        let messages: Vec<_> = queued.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["live 1", "live 2"]);
        assert!(registry.drain("t", replay.ticket).is_none());

        let recipients = registry.accept(&event("t", "A-/page", "live 3"));
        assert_eq!(recipients.len(), 2);
        assert!(recipients.iter().any(|r| r.same_as(&late)));
    }

    #[test]
    fn test_drain_after_unsubscribe_stops() {
        let mut registry = Registry::new();
        let (a, a_id) = sub("A");
        let replay = registry.subscribe("t", a.clone(), a_id).unwrap();
        registry.accept(&event("t", "B-/page", "queued"));

        assert!(registry.unsubscribe("t", &a));
        assert!(registry.drain("t", replay.ticket).is_none());
    }

    #[test]
    fn test_restore_appends_history() {
        let mut registry = Registry::new();
        let mut history = HashMap::new();
        history.insert(
            "chat".to_string(),
            vec![
                ChannelEvent::new("chat", "A-/page", "1"),
                ChannelEvent::new("chat", "A-/page", "2"),
            ],
        );

        assert_eq!(registry.restore(history), 2);
        assert_eq!(registry.history()["chat"].len(), 2);

        let (b, b_id) = sub("B");
        let replay = registry.subscribe("chat", b, b_id).unwrap().events;
        let messages: Vec<_> = replay.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["1", "2"]);
    }

    proptest! {
        /// Сообщения в темы без подписчиков никогда не попадают в лог.
        #[test]
        fn prop_no_subscriber_topics_store_nothing(
            topics in proptest::collection::vec("[a-z]{1,6}", 1..20),
        ) {
            let mut registry = Registry::new();
            for topic in &topics {
                registry.accept(&event(topic, "X-/page", "m"));
            }
            for topic in &topics {
                prop_assert!(registry.stored(topic).is_empty());
            }
        }

        /// Поздний подписчик получает каждое чужое сообщение ровно один раз и
        /// в порядке поступления, а свои не получает никогда.
        #[test]
        fn prop_replay_preserves_order_and_filters_self(
            senders in proptest::collection::vec(prop_oneof![Just("A"), Just("B"), Just("C")], 0..40),
        ) {
            let mut registry = Registry::new();
            let (watcher, watcher_id) = sub("W");
            registry.subscribe("t", watcher, watcher_id);

            for (i, sender) in senders.iter().enumerate() {
                registry.accept(&event("t", &format!("{sender}-{PAGE}"), &i.to_string()));
            }

            let (late, late_id) = sub("B");
            let replay = registry.subscribe("t", late, late_id).unwrap().events;

            let expected: Vec<String> = senders
                .iter()
                .enumerate()
                .filter(|(_, s)| **s != "B")
                .map(|(i, _)| i.to_string())
                .collect();
            let got: Vec<String> = replay.iter().map(|e| e.message.clone()).collect();
            prop_assert_eq!(got, expected);
            prop_assert!(replay.iter().all(|e| e.sender != "B-/page"));
        }
    }
}
