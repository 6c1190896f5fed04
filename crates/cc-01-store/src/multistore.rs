//! # In-Memory MultiStore
//!
//! One ordered key-value partition per mounted store key. The real
//! persistent engine sits outside this workspace; this store gives module
//! hooks something deterministic to read and write, and computes an app
//! hash over the persistent partitions on commit.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::{StoreError, StoreKey, StoreKind};

/// A single ordered key-value partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl KvStore {
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn delete(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.remove(key)
    }

    /// Entries whose key starts with `prefix`, in key order.
    pub fn iter_prefix<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Decode a JSON value stored under `key`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, StoreError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(raw) => serde_json::from_slice(raw)
                .map(Some)
                .map_err(|e| codec_error(key, e)),
        }
    }

    /// Store `value` as JSON under `key`.
    pub fn set_json<T: Serialize>(&mut self, key: &[u8], value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(value).map_err(|e| codec_error(key, e))?;
        self.entries.insert(key.to_vec(), raw);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

fn codec_error(key: &[u8], err: serde_json::Error) -> StoreError {
    StoreError::Codec {
        key: hex::encode(key),
        message: err.to_string(),
    }
}

/// Result of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitInfo {
    /// Version after the commit (starts at 1).
    pub version: u64,
    /// SHA-256 over all persistent partitions.
    pub app_hash: [u8; 32],
}

/// The set of mounted partitions.
#[derive(Debug, Default)]
pub struct MultiStore {
    stores: BTreeMap<StoreKey, KvStore>,
    version: u64,
    last_app_hash: [u8; 32],
}

impl MultiStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a partition for `key`.
    pub fn mount(&mut self, key: StoreKey) -> Result<(), StoreError> {
        if self.stores.contains_key(&key) {
            return Err(StoreError::AlreadyMounted(key));
        }
        debug!("[Store] Mounted {}", key);
        self.stores.insert(key, KvStore::default());
        Ok(())
    }

    /// Mount every key yielded by `keys`.
    pub fn mount_all<'a>(
        &mut self,
        keys: impl IntoIterator<Item = &'a StoreKey>,
    ) -> Result<(), StoreError> {
        for key in keys {
            self.mount(key.clone())?;
        }
        Ok(())
    }

    pub fn is_mounted(&self, key: &StoreKey) -> bool {
        self.stores.contains_key(key)
    }

    pub fn store(&self, key: &StoreKey) -> Result<&KvStore, StoreError> {
        self.stores
            .get(key)
            .ok_or_else(|| StoreError::NotMounted(key.clone()))
    }

    pub fn store_mut(&mut self, key: &StoreKey) -> Result<&mut KvStore, StoreError> {
        self.stores
            .get_mut(key)
            .ok_or_else(|| StoreError::NotMounted(key.clone()))
    }

    /// Latest committed version (0 before the first commit).
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn last_app_hash(&self) -> [u8; 32] {
        self.last_app_hash
    }

    /// Commit the working state.
    ///
    /// Transient partitions are cleared; in-memory partitions are kept but
    /// not hashed.
    pub fn commit(&mut self) -> CommitInfo {
        let mut hasher = Sha256::new();
        for (key, store) in &self.stores {
            if key.kind() != StoreKind::Persistent {
                continue;
            }
            hasher.update(key.name().as_bytes());
            hasher.update((store.len() as u64).to_be_bytes());
            for (k, v) in &store.entries {
                hasher.update((k.len() as u64).to_be_bytes());
                hasher.update(k);
                hasher.update((v.len() as u64).to_be_bytes());
                hasher.update(v);
            }
        }

        for (key, store) in self.stores.iter_mut() {
            if key.kind() == StoreKind::Transient {
                store.clear();
            }
        }

        self.version += 1;
        self.last_app_hash = hasher.finalize().into();

        debug!(
            "[Store] Committed version {} app_hash={}",
            self.version,
            hex::encode(&self.last_app_hash[..8])
        );

        CommitInfo {
            version: self.version,
            app_hash: self.last_app_hash,
        }
    }
}
