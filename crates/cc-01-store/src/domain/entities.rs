//! # Store Key Entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifetime class of a storage partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoreKind {
    /// Committed and included in the app hash.
    Persistent,
    /// Cleared on every commit.
    Transient,
    /// Survives commits but is never hashed or written to disk.
    InMemory,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persistent => write!(f, "persistent"),
            Self::Transient => write!(f, "transient"),
            Self::InMemory => write!(f, "memory"),
        }
    }
}

/// Handle to one storage partition.
///
/// Only the allocator creates these, and it never issues the same
/// `(name, kind)` twice, so holding a key is proof of exclusive ownership of
/// that partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreKey {
    name: String,
    kind: StoreKind,
}

impl StoreKey {
    pub(crate) fn new(name: impl Into<String>, kind: StoreKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_display() {
        let key = StoreKey::new("params", StoreKind::Transient);
        assert_eq!(key.to_string(), "params(transient)");
    }

    #[test]
    fn test_same_name_different_kind_not_equal() {
        let a = StoreKey::new("capability", StoreKind::Persistent);
        let b = StoreKey::new("capability", StoreKind::InMemory);
        assert_ne!(a, b);
    }
}
