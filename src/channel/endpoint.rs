use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{error::RecvError, pubsub::ChannelEvent};

/// Unit carried by the underlying broadcast channel.
#[derive(Debug, Clone)]
pub(crate) struct Envelope {
    pub(crate) origin: u64,
    pub(crate) event: Arc<ChannelEvent>,
}

/// Send-only handle bound to one endpoint.
#[derive(Debug, Clone)]
pub struct ChannelPoster {
    name: Arc<str>,
    endpoint: u64,
    tx: broadcast::Sender<Envelope>,
}

/// One endpoint of a named broadcast channel.
///
/// Events posted here reach every other endpoint on the same name; the
/// posting endpoint never sees its own events. Dropping the endpoint leaves
/// the channel.
#[derive(Debug)]
pub struct BroadcastChannel {
    poster: ChannelPoster,
    rx: broadcast::Receiver<Envelope>,
}

impl ChannelPoster {
    /// Fire-and-forget broadcast. Returns how many other endpoints were
    /// listening; zero is not an error.
    pub fn post_message(
        &self,
        event: impl Into<Arc<ChannelEvent>>,
    ) -> usize {
        let envelope = Envelope {
            origin: self.endpoint,
            event: event.into(),
        };
        match self.tx.send(envelope) {
            // Собственный receiver тоже в счётчике
            Ok(receivers) => receivers.saturating_sub(1),
            Err(_) => 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl BroadcastChannel {
    pub(crate) fn new(
        name: Arc<str>,
        endpoint: u64,
        tx: broadcast::Sender<Envelope>,
    ) -> Self {
        let rx = tx.subscribe();
        Self {
            poster: ChannelPoster { name, endpoint, tx },
            rx,
        }
    }

    /// See [`ChannelPoster::post_message`].
    pub fn post_message(
        &self,
        event: impl Into<Arc<ChannelEvent>>,
    ) -> usize {
        self.poster.post_message(event)
    }

    /// Waits for the next event posted by another endpoint.
    ///
    /// # Возвращает
    /// - `Ok(event)` при успешном получении
    /// - `Err(RecvError::Lagged { count })` если endpoint отстал; следующий
    ///   вызов продолжит с самого старого сохранённого события
    /// - `Err(RecvError::Closed)` если канал закрыт
    pub async fn recv(&mut self) -> Result<Arc<ChannelEvent>, RecvError> {
        loop {
            let envelope = self.rx.recv().await?;
            if envelope.origin != self.poster.endpoint {
                return Ok(envelope.event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv). Returns `Ok(None)` when
    /// nothing from other endpoints is queued.
    pub fn try_recv(&mut self) -> Result<Option<Arc<ChannelEvent>>, RecvError> {
        use broadcast::error::TryRecvError;

        loop {
            match self.rx.try_recv() {
                Ok(envelope) if envelope.origin == self.poster.endpoint => continue,
                Ok(envelope) => return Ok(Some(envelope.event)),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(RecvError::Closed),
                Err(TryRecvError::Lagged(count)) => return Err(RecvError::Lagged { count }),
            }
        }
    }

    /// Cloneable send-only handle for this endpoint.
    pub fn poster(&self) -> ChannelPoster {
        self.poster.clone()
    }

    pub fn name(&self) -> &str {
        self.poster.name()
    }

    pub fn endpoint(&self) -> u64 {
        self.poster.endpoint
    }
}
