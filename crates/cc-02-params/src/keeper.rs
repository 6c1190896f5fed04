//! # Params Keeper
//!
//! Registry of parameter subspaces. Asking for a subspace by name creates
//! it once; later requests return the same instance. Clones share the
//! subspaces that existed when they were taken.

use std::collections::BTreeMap;

use cc_01_store::StoreKey;
use tracing::debug;

use crate::domain::ParamsError;
use crate::subspace::Subspace;

#[derive(Debug, Clone)]
pub struct ParamsKeeper {
    store_key: StoreKey,
    tstore_key: StoreKey,
    spaces: BTreeMap<String, Subspace>,
}

impl ParamsKeeper {
    pub fn new(store_key: StoreKey, tstore_key: StoreKey) -> Self {
        Self {
            store_key,
            tstore_key,
            spaces: BTreeMap::new(),
        }
    }

    /// Get or create the subspace for `name`.
    ///
    /// Names may not contain `/`, which separates subspace and key in the
    /// store.
    pub fn subspace(&mut self, name: &str) -> Result<Subspace, ParamsError> {
        if name.is_empty() {
            return Err(ParamsError::EmptyName);
        }
        if name.contains('/') {
            return Err(ParamsError::InvalidSubspaceName(name.to_string()));
        }

        if let Some(existing) = self.spaces.get(name) {
            return Ok(existing.clone());
        }

        let space = Subspace::new(name, self.store_key.clone(), self.tstore_key.clone());
        self.spaces.insert(name.to_string(), space.clone());
        debug!("[Params] Created subspace {}", name);
        Ok(space)
    }

    /// Look up an existing subspace without creating one.
    pub fn get_subspace(&self, name: &str) -> Result<Subspace, ParamsError> {
        self.spaces
            .get(name)
            .cloned()
            .ok_or_else(|| ParamsError::UnknownSubspace(name.to_string()))
    }

    pub fn subspace_names(&self) -> impl Iterator<Item = &str> {
        self.spaces.keys().map(String::as_str)
    }
}
