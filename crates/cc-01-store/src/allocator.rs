//! # Store Key Allocator
//!
//! Issues store keys during application assembly. Every `(name, kind)`
//! pair is issued at most once.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::domain::{StoreError, StoreKey, StoreKind};

/// Issues unique store keys.
#[derive(Debug, Default)]
pub struct StoreKeyAllocator {
    issued: BTreeSet<StoreKey>,
}

impl StoreKeyAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a key for `(name, kind)`.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if the pair was already issued, `EmptyName` for an
    /// empty name.
    pub fn new_store_key(&mut self, name: &str, kind: StoreKind) -> Result<StoreKey, StoreError> {
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }

        let key = StoreKey::new(name, kind);
        if !self.issued.insert(key.clone()) {
            return Err(StoreError::DuplicateKey {
                name: name.to_string(),
                kind,
            });
        }

        debug!("[Store] Allocated {}", key);
        Ok(key)
    }

    /// Issue one persistent key per name.
    pub fn new_kv_store_keys(
        &mut self,
        names: &[&str],
    ) -> Result<BTreeMap<String, StoreKey>, StoreError> {
        self.batch(names, StoreKind::Persistent)
    }

    /// Issue one transient key per name.
    pub fn new_transient_store_keys(
        &mut self,
        names: &[&str],
    ) -> Result<BTreeMap<String, StoreKey>, StoreError> {
        self.batch(names, StoreKind::Transient)
    }

    /// Issue one in-memory key per name.
    pub fn new_memory_store_keys(
        &mut self,
        names: &[&str],
    ) -> Result<BTreeMap<String, StoreKey>, StoreError> {
        self.batch(names, StoreKind::InMemory)
    }

    /// Every key issued so far, ordered by `(name, kind)`.
    pub fn issued(&self) -> impl Iterator<Item = &StoreKey> {
        self.issued.iter()
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    fn batch(
        &mut self,
        names: &[&str],
        kind: StoreKind,
    ) -> Result<BTreeMap<String, StoreKey>, StoreError> {
        let mut keys = BTreeMap::new();
        for name in names {
            let key = self.new_store_key(name, kind)?;
            keys.insert((*name).to_string(), key);
        }
        Ok(keys)
    }
}
