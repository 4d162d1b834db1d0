use std::{fmt, sync::Arc};

/// Widget label used when none is given.
pub const DEFAULT_WIDGET: &str = "default";

/// Logical origin of an event: a widget label scoped to a page path.
///
/// Rendered as `"{widget}-{page_path}"`. The same scheme stamps outgoing
/// `sender` fields and filters incoming echoes, so two widgets on one page
/// still see each other while neither sees itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(Arc<str>);

impl Identity {
    pub fn derive(
        widget: &str,
        page_path: &str,
    ) -> Self {
        let widget = if widget.is_empty() {
            DEFAULT_WIDGET
        } else {
            widget
        };
        Self(Arc::from(format!("{widget}-{page_path}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if an event stamped with `sender` originates from this
    /// identity.
    pub fn is_sender(
        &self,
        sender: &str,
    ) -> bool {
        &*self.0 == sender
    }
}

impl fmt::Display for Identity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Identity {
    fn eq(
        &self,
        other: &str,
    ) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Identity {
    fn eq(
        &self,
        other: &&str,
    ) -> bool {
        &*self.0 == *other
    }
}
