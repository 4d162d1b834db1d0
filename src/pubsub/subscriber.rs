use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use super::ChannelEvent;

type Handler = dyn Fn(&ChannelEvent) + Send + Sync;

/// Named callback registered with a [`MessageBroker`](super::MessageBroker).
///
/// The name is the widget label the subscriber's identity is derived from.
/// Clones share the handler and count as the same subscriber, so registering
/// a clone on a topic that already holds the original is a no-op.
#[derive(Clone)]
pub struct Subscriber {
    name: Arc<str>,
    handler: Arc<Handler>,
}

impl Subscriber {
    pub fn new<F>(
        name: impl AsRef<str>,
        handler: F,
    ) -> Self
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.as_ref()),
            handler: Arc::new(handler),
        }
    }

    /// Widget label of this subscriber.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if both handles wrap the same callback.
    pub fn same_as(
        &self,
        other: &Subscriber,
    ) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }

    /// Invokes the callback. A panic inside the callback is contained and
    /// reported as `false`.
    pub(crate) fn deliver(
        &self,
        event: &ChannelEvent,
    ) -> bool {
        panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(event))).is_ok()
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("name", &self.name)
            .field("handler", &Arc::as_ptr(&self.handler).cast::<()>())
            .finish()
    }
}
