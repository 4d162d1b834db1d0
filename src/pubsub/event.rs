use serde::{Deserialize, Serialize};

/// Acknowledgment fields carried by an [`AckEvent`] on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckHeader {
    pub id: String,
    #[serde(rename = "needsAck")]
    pub needs_ack: bool,
}

/// The event widgets exchange over a channel.
///
/// `sender` is the identity of the logical origin (see
/// [`Identity`](super::Identity)); brokers use it to drop their own echoes.
/// Events published through the acknowledgment protocol also carry an
/// [`AckHeader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub topic: String,
    pub sender: String,
    pub message: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub ack: Option<AckHeader>,
}

/// A [`ChannelEvent`] that takes part in the acknowledgment protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckEvent {
    pub topic: String,
    pub sender: String,
    pub message: String,
    pub id: String,
    #[serde(rename = "needsAck")]
    pub needs_ack: bool,
}

impl ChannelEvent {
    pub fn new(
        topic: impl Into<String>,
        sender: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            sender: sender.into(),
            message: message.into(),
            ack: None,
        }
    }

    /// Views this event as an [`AckEvent`] if it carries an ack header.
    pub fn as_ack(&self) -> Option<AckEvent> {
        self.ack.as_ref().map(|header| AckEvent {
            topic: self.topic.clone(),
            sender: self.sender.clone(),
            message: self.message.clone(),
            id: header.id.clone(),
            needs_ack: header.needs_ack,
        })
    }

    /// Returns `true` for an event with a non-empty id still waiting for an
    /// acknowledgment.
    pub fn needs_ack(&self) -> bool {
        self.ack
            .as_ref()
            .is_some_and(|header| !header.id.is_empty() && header.needs_ack)
    }

    /// Returns `true` when the event carries the given ack id and still needs
    /// an acknowledgment.
    pub(crate) fn is_ack_for(
        &self,
        id: &str,
    ) -> bool {
        self.ack
            .as_ref()
            .is_some_and(|header| header.id == id && header.needs_ack)
    }
}

impl AckEvent {
    /// Copy of this event with `needs_ack` cleared.
    pub fn acknowledged(&self) -> Self {
        Self {
            needs_ack: false,
            ..self.clone()
        }
    }
}

impl From<AckEvent> for ChannelEvent {
    fn from(event: AckEvent) -> Self {
        Self {
            topic: event.topic,
            sender: event.sender,
            message: event.message,
            ack: Some(AckHeader {
                id: event.id,
                needs_ack: event.needs_ack,
            }),
        }
    }
}
