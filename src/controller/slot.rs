/// Monotonic id handed to every issued request.
pub type Ticket = u64;

/// One independently tracked remote load, keyed by the selection value it
/// was issued for.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<K, T> {
    Idle,
    Loading { key: K, ticket: Ticket },
    Loaded { key: K, value: T },
    Errored { key: K, message: String },
}

impl<K, T> Default for Slot<K, T> {
    fn default() -> Self {
        Slot::Idle
    }
}

impl<K: PartialEq, T> Slot<K, T> {
    pub fn key(&self) -> Option<&K> {
        match self {
            Slot::Idle => None,
            Slot::Loading { key, .. } | Slot::Loaded { key, .. } | Slot::Errored { key, .. } => {
                Some(key)
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Slot::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Slot::Loading { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Slot::Loaded { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Slot::Errored { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    /// True only for the response to the latest request, and only while that
    /// request's key is still the one being loaded.
    pub fn accepts(&self, key: &K, ticket: Ticket) -> bool {
        matches!(self, Slot::Loading { key: k, ticket: t } if k == key && *t == ticket)
    }

    /// Loading or loaded for `key`: nothing to do on reselecting it.
    pub fn is_current_for(&self, key: &K) -> bool {
        match self {
            Slot::Loading { key: k, .. } | Slot::Loaded { key: k, .. } => k == key,
            _ => false,
        }
    }
}
