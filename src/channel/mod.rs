//! Named many-to-many broadcast transport.
//!
//! - `hub`: registry of named channels; endpoints are opened from it.
//! - `endpoint`: one participant of a channel. Posting is fire-and-forget and
//!   reaches every other endpoint on the same name.

pub mod endpoint;
pub mod hub;

pub(crate) use endpoint::Envelope;
pub use endpoint::{BroadcastChannel, ChannelPoster};
pub use hub::{ChannelHub, DEFAULT_CAPACITY, DEFAULT_CHANNEL_NAME};
