//! # Domain Errors
//!
//! Error types for store key allocation and store access.

use super::entities::{StoreKey, StoreKind};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The same `(name, kind)` was requested twice. Fatal at startup.
    #[error("Duplicate store key: {name} ({kind}) already allocated")]
    DuplicateKey {
        /// Requested name
        name: String,
        /// Requested kind
        kind: StoreKind,
    },

    /// Store key names must be non-empty.
    #[error("Store key name must not be empty")]
    EmptyName,

    /// A key was mounted twice. Fatal at startup.
    #[error("Store already mounted: {0}")]
    AlreadyMounted(StoreKey),

    /// Access through a key that was never mounted.
    #[error("Store not mounted: {0}")]
    NotMounted(StoreKey),

    /// A stored value could not be encoded or decoded.
    #[error("Codec error for key {key}: {message}")]
    Codec {
        /// Hex encoded raw key
        key: String,
        /// Serializer message
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_error() {
        let err = StoreError::DuplicateKey {
            name: "bank".to_string(),
            kind: StoreKind::Persistent,
        };
        assert!(err.to_string().contains("bank"));
        assert!(err.to_string().contains("persistent"));
    }

    #[test]
    fn test_not_mounted_error() {
        let err = StoreError::NotMounted(StoreKey::new("gov", StoreKind::Persistent));
        assert!(err.to_string().contains("gov(persistent)"));
    }
}
