use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

static INSTANCES: AtomicU64 = AtomicU64::new(0);

/// Identifier of one acknowledged send.
pub type MessageId = String;

/// Generates message ids unique within the process.
///
/// An id is `"{tag}-{counter}"`. A generated tag is 8 random hex digits
/// followed by a process-wide instance number in hex: the instance number
/// keeps tags of one process distinct, the random part keeps peers in other
/// processes from clashing. The counter never repeats within one generator.
#[derive(Debug)]
pub struct MessageIdGenerator {
    tag: String,
    counter: AtomicU64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        let instance = INSTANCES.fetch_add(1, Ordering::Relaxed);
        let mut tag = Uuid::new_v4().simple().to_string();
        tag.truncate(8);
        Self::with_tag(format!("{tag}{instance:x}"))
    }

    /// Uses a fixed tag. Uniqueness across generators is then up to the
    /// caller.
    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn next_id(&self) -> MessageId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n:x}", self.tag)
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
