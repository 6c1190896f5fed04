//! # Subspace
//!
//! A cloneable handle onto one module's parameter namespace. Every clone
//! refers to the same subspace, so sealing through one handle seals all.

use std::fmt;
use std::sync::{Arc, OnceLock};

use cc_01_store::{Context, StoreKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{KeyTable, ParamsError};

struct SubspaceInner {
    name: String,
    store_key: StoreKey,
    tstore_key: StoreKey,
    key_table: OnceLock<KeyTable>,
}

#[derive(Clone)]
pub struct Subspace {
    inner: Arc<SubspaceInner>,
}

impl Subspace {
    pub(crate) fn new(name: &str, store_key: StoreKey, tstore_key: StoreKey) -> Self {
        Self {
            inner: Arc::new(SubspaceInner {
                name: name.to_string(),
                store_key,
                tstore_key,
                key_table: OnceLock::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Seal the subspace to `table`.
    ///
    /// Returns a handle to the same subspace so calls can be chained at
    /// assembly time.
    ///
    /// # Errors
    ///
    /// `AlreadySealed` if a key table was already set.
    pub fn with_key_table(&self, table: KeyTable) -> Result<Self, ParamsError> {
        let keys = table.len();
        self.inner
            .key_table
            .set(table)
            .map_err(|_| ParamsError::AlreadySealed(self.inner.name.clone()))?;
        info!("[Params] Sealed subspace {} with {} keys", self.inner.name, keys);
        Ok(self.clone())
    }

    pub fn has_key_table(&self) -> bool {
        self.inner.key_table.get().is_some()
    }

    /// Whether two handles refer to the same subspace.
    pub fn same_as(&self, other: &Subspace) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read a parameter.
    pub fn get<T: DeserializeOwned>(
        &self,
        ctx: &Context<'_>,
        key: &str,
    ) -> Result<Option<T>, ParamsError> {
        self.check_declared(key)?;
        Ok(ctx.kv(&self.inner.store_key)?.get_json(&self.storage_key(key))?)
    }

    /// Read a parameter, falling back to `default` when unset.
    pub fn get_or<T: DeserializeOwned>(
        &self,
        ctx: &Context<'_>,
        key: &str,
        default: T,
    ) -> Result<T, ParamsError> {
        Ok(self.get(ctx, key)?.unwrap_or(default))
    }

    pub fn has(&self, ctx: &Context<'_>, key: &str) -> Result<bool, ParamsError> {
        self.check_declared(key)?;
        Ok(ctx.kv(&self.inner.store_key)?.has(&self.storage_key(key)))
    }

    /// Write a parameter, running the key table validator when sealed.
    pub fn set<T: Serialize>(
        &self,
        ctx: &mut Context<'_>,
        key: &str,
        value: &T,
    ) -> Result<(), ParamsError> {
        let json = serde_json::to_value(value).map_err(|e| self.invalid(key, e.to_string()))?;
        self.write(ctx, key, &json)
    }

    /// Write a parameter from its raw JSON encoding.
    ///
    /// Used by parameter change proposals, where the new value arrives as
    /// text from outside the chain.
    pub fn update(&self, ctx: &mut Context<'_>, key: &str, raw: &str) -> Result<(), ParamsError> {
        let json: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| self.invalid(key, e.to_string()))?;
        self.write(ctx, key, &json)
    }

    /// Whether `key` was written since the last commit.
    pub fn modified(&self, ctx: &Context<'_>, key: &str) -> Result<bool, ParamsError> {
        Ok(ctx.kv(&self.inner.tstore_key)?.has(&self.storage_key(key)))
    }

    fn write(
        &self,
        ctx: &mut Context<'_>,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), ParamsError> {
        self.check_declared(key)?;
        if let Some(validate) = self.inner.key_table.get().and_then(|t| t.validator(key)) {
            validate(value).map_err(|reason| self.invalid(key, reason))?;
        }

        let storage_key = self.storage_key(key);
        ctx.kv_mut(&self.inner.store_key)?.set_json(&storage_key, value)?;
        ctx.kv_mut(&self.inner.tstore_key)?.set(storage_key, Vec::new());

        debug!("[Params] {}/{} = {}", self.inner.name, key, value);
        Ok(())
    }

    fn check_declared(&self, key: &str) -> Result<(), ParamsError> {
        match self.inner.key_table.get() {
            Some(table) if !table.contains(key) => Err(ParamsError::UndeclaredKey {
                subspace: self.inner.name.clone(),
                key: key.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn storage_key(&self, key: &str) -> Vec<u8> {
        format!("{}/{}", self.inner.name, key).into_bytes()
    }

    fn invalid(&self, key: &str, reason: String) -> ParamsError {
        ParamsError::InvalidValue {
            subspace: self.inner.name.clone(),
            key: key.to_string(),
            reason,
        }
    }
}

impl fmt::Debug for Subspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subspace")
            .field("name", &self.inner.name)
            .field("key_table", &self.inner.key_table.get())
            .finish()
    }
}
