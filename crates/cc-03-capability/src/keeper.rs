//! # Capability Keeper
//!
//! Owns the persistent owner records and the in-memory reverse lookup
//! table, hands out scoped keepers, and seals itself once at startup.
//!
//! ## Store Layout
//!
//! ```text
//! persistent  index                      -> next index (u64)
//! persistent  owners/{index:020}         -> BTreeSet<Owner>
//! memory      rev/{module}/{name}        -> index (u64)
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use cc_01_store::{Context, StoreKey};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::{CapabilityError, CapabilityGenesis, Owner, OwnerEntry};
use crate::scoped::ScopedCapabilityKeeper;

const INDEX_KEY: &[u8] = b"index";
const OWNERS_PREFIX: &str = "owners/";
const REV_PREFIX: &str = "rev/";

#[derive(Debug, Default)]
struct KeeperState {
    sealed: bool,
    scoped: Vec<String>,
}

/// Root capability keeper.
///
/// Cheap to clone; all clones share the sealing state.
#[derive(Debug, Clone)]
pub struct CapabilityKeeper {
    store_key: StoreKey,
    mem_key: StoreKey,
    state: Arc<RwLock<KeeperState>>,
}

impl CapabilityKeeper {
    pub fn new(store_key: StoreKey, mem_key: StoreKey) -> Self {
        Self {
            store_key,
            mem_key,
            state: Arc::new(RwLock::new(KeeperState::default())),
        }
    }

    /// Create a scoped keeper for `module`.
    ///
    /// Scoping the same module twice is allowed and yields two handles over
    /// the same namespace.
    ///
    /// # Errors
    ///
    /// `ScopeSealed` once `initialize_and_seal` has run, `InvalidModuleName`
    /// when the name contains the reverse-index separator `/`.
    pub fn scope_to_module(&self, module: &str) -> Result<ScopedCapabilityKeeper, CapabilityError> {
        if module.is_empty() {
            return Err(CapabilityError::EmptyModuleName);
        }
        if module.contains('/') {
            return Err(CapabilityError::InvalidModuleName(module.to_string()));
        }

        let mut state = self.state.write();
        if state.sealed {
            return Err(CapabilityError::ScopeSealed(module.to_string()));
        }
        state.scoped.push(module.to_string());
        drop(state);

        info!("[Capability] Scoped keeper created for {}", module);
        Ok(ScopedCapabilityKeeper::new(module, self.clone()))
    }

    /// Rebuild the in-memory lookup table from persistent owners and seal.
    ///
    /// # Errors
    ///
    /// `AlreadySealed` on a second call.
    pub fn initialize_and_seal(&self, ctx: &mut Context<'_>) -> Result<(), CapabilityError> {
        if self.state.read().sealed {
            return Err(CapabilityError::AlreadySealed);
        }

        let entries = self.owner_entries(ctx)?;

        let mem = ctx.kv_mut(&self.mem_key)?;
        let stale: Vec<Vec<u8>> = mem
            .iter_prefix(REV_PREFIX.as_bytes())
            .map(|(k, _)| k.to_vec())
            .collect();
        for key in stale {
            mem.delete(&key);
        }

        for entry in &entries {
            for owner in &entry.owners {
                self.set_reverse(ctx, owner, entry.index)?;
            }
        }

        let mut state = self.state.write();
        state.sealed = true;
        info!(
            "[Capability] Initialized {} capabilities and sealed {} scopes",
            entries.len(),
            state.scoped.len()
        );
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.state.read().sealed
    }

    /// Modules scoped so far, in scoping order (repeats included).
    pub fn scoped_modules(&self) -> Vec<String> {
        self.state.read().scoped.clone()
    }

    /// Load genesis owners into both stores.
    pub fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &CapabilityGenesis,
    ) -> Result<(), CapabilityError> {
        genesis.validate().map_err(CapabilityError::InvalidGenesis)?;

        ctx.kv_mut(&self.store_key)?.set_json(INDEX_KEY, &genesis.index)?;
        for entry in &genesis.owners {
            self.set_owners(ctx, entry.index, &entry.owners)?;
            for owner in &entry.owners {
                self.set_reverse(ctx, owner, entry.index)?;
            }
        }

        debug!(
            "[Capability] Genesis loaded: next index {}, {} owned capabilities",
            genesis.index,
            genesis.owners.len()
        );
        Ok(())
    }

    pub fn export_genesis(&self, ctx: &Context<'_>) -> Result<CapabilityGenesis, CapabilityError> {
        Ok(CapabilityGenesis {
            index: self.latest_index(ctx)?,
            owners: self.owner_entries(ctx)?,
        })
    }

    /// Owners of capability `index`.
    pub fn get_owners(
        &self,
        ctx: &Context<'_>,
        index: u64,
    ) -> Result<BTreeSet<Owner>, CapabilityError> {
        Ok(ctx
            .kv(&self.store_key)?
            .get_json(&owners_key(index))?
            .unwrap_or_default())
    }

    pub(crate) fn ensure_initialized(&self) -> Result<(), CapabilityError> {
        if self.state.read().sealed {
            Ok(())
        } else {
            Err(CapabilityError::NotInitialized)
        }
    }

    pub(crate) fn latest_index(&self, ctx: &Context<'_>) -> Result<u64, CapabilityError> {
        Ok(ctx.kv(&self.store_key)?.get_json(INDEX_KEY)?.unwrap_or(1))
    }

    /// Take the next index and advance the counter.
    pub(crate) fn allocate_index(&self, ctx: &mut Context<'_>) -> Result<u64, CapabilityError> {
        let index = self.latest_index(ctx)?;
        ctx.kv_mut(&self.store_key)?.set_json(INDEX_KEY, &(index + 1))?;
        Ok(index)
    }

    pub(crate) fn set_owners(
        &self,
        ctx: &mut Context<'_>,
        index: u64,
        owners: &BTreeSet<Owner>,
    ) -> Result<(), CapabilityError> {
        let store = ctx.kv_mut(&self.store_key)?;
        if owners.is_empty() {
            store.delete(&owners_key(index));
        } else {
            store.set_json(&owners_key(index), owners)?;
        }
        Ok(())
    }

    pub(crate) fn reverse(
        &self,
        ctx: &Context<'_>,
        module: &str,
        name: &str,
    ) -> Result<Option<u64>, CapabilityError> {
        Ok(ctx.kv(&self.mem_key)?.get_json(&rev_key(module, name))?)
    }

    pub(crate) fn set_reverse(
        &self,
        ctx: &mut Context<'_>,
        owner: &Owner,
        index: u64,
    ) -> Result<(), CapabilityError> {
        ctx.kv_mut(&self.mem_key)?
            .set_json(&rev_key(&owner.module, &owner.name), &index)?;
        Ok(())
    }

    pub(crate) fn delete_reverse(
        &self,
        ctx: &mut Context<'_>,
        owner: &Owner,
    ) -> Result<(), CapabilityError> {
        ctx.kv_mut(&self.mem_key)?
            .delete(&rev_key(&owner.module, &owner.name));
        Ok(())
    }

    fn owner_entries(&self, ctx: &Context<'_>) -> Result<Vec<OwnerEntry>, CapabilityError> {
        let store = ctx.kv(&self.store_key)?;
        let mut entries = Vec::new();
        for (key, _) in store.iter_prefix(OWNERS_PREFIX.as_bytes()) {
            let owners: BTreeSet<Owner> = store.get_json(key)?.unwrap_or_default();
            let index = String::from_utf8_lossy(&key[OWNERS_PREFIX.len()..])
                .parse::<u64>()
                .map_err(|e| CapabilityError::InvalidGenesis(e.to_string()))?;
            entries.push(OwnerEntry { index, owners });
        }
        Ok(entries)
    }
}

fn owners_key(index: u64) -> Vec<u8> {
    format!("{OWNERS_PREFIX}{index:020}").into_bytes()
}

fn rev_key(module: &str, name: &str) -> Vec<u8> {
    format!("{REV_PREFIX}{module}/{name}").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_01_store::{MultiStore, StoreKeyAllocator, StoreKind};
    use shared_types::BlockHeader;

    fn setup() -> (CapabilityKeeper, MultiStore) {
        let mut alloc = StoreKeyAllocator::new();
        let key = alloc.new_store_key("capability", StoreKind::Persistent).unwrap();
        let mem = alloc.new_store_key("mem_capability", StoreKind::InMemory).unwrap();
        let mut ms = MultiStore::new();
        ms.mount_all(alloc.issued()).unwrap();
        (CapabilityKeeper::new(key, mem), ms)
    }

    #[test]
    fn test_scope_after_seal_rejected() {
        let (keeper, mut ms) = setup();
        keeper.scope_to_module("transfer").unwrap();

        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        keeper.initialize_and_seal(&mut ctx).unwrap();

        assert_eq!(
            keeper.scope_to_module("transfer2").unwrap_err(),
            CapabilityError::ScopeSealed("transfer2".to_string())
        );
    }

    #[test]
    fn test_seal_twice_rejected() {
        let (keeper, mut ms) = setup();
        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        keeper.initialize_and_seal(&mut ctx).unwrap();
        assert_eq!(
            keeper.initialize_and_seal(&mut ctx),
            Err(CapabilityError::AlreadySealed)
        );
    }

    #[test]
    fn test_scope_name_with_separator_rejected() {
        let (keeper, mut ms) = setup();
        let ibc = keeper.scope_to_module("ibc").unwrap();

        assert_eq!(
            keeper.scope_to_module("ibc/ports").unwrap_err(),
            CapabilityError::InvalidModuleName("ibc/ports".to_string())
        );
        assert_eq!(keeper.scoped_modules(), vec!["ibc"]);

        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        keeper.initialize_and_seal(&mut ctx).unwrap();
        let cap = ibc.new_capability(&mut ctx, "ports/transfer").unwrap();
        assert!(ibc.authenticate_capability(&ctx, &cap, "ports/transfer").unwrap());
    }

    #[test]
    fn test_scoping_same_module_twice_allowed() {
        let (keeper, _) = setup();
        keeper.scope_to_module("ibc").unwrap();
        keeper.scope_to_module("ibc").unwrap();
        assert_eq!(keeper.scoped_modules(), vec!["ibc", "ibc"]);
    }

    #[test]
    fn test_seal_rebuilds_memory_from_persistent_owners() {
        let (keeper, mut ms) = setup();
        let genesis = CapabilityGenesis {
            index: 3,
            owners: vec![
                OwnerEntry {
                    index: 1,
                    owners: [Owner::new("ibc", "ports/transfer"), Owner::new("transfer", "ports/transfer")]
                        .into_iter()
                        .collect(),
                },
                OwnerEntry {
                    index: 2,
                    owners: [Owner::new("ibc", "channels/0")].into_iter().collect(),
                },
            ],
        };

        {
            let mut ctx = Context::new(&mut ms, BlockHeader::default());
            keeper.init_genesis(&mut ctx, &genesis).unwrap();
        }
        // Lose one reverse entry, as an in-memory store would on restart.
        let mem_key = keeper.mem_key.clone();
        ms.store_mut(&mem_key).unwrap().delete(b"rev/ibc/channels/0");

        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        keeper.initialize_and_seal(&mut ctx).unwrap();

        assert_eq!(keeper.reverse(&ctx, "ibc", "channels/0").unwrap(), Some(2));
        assert_eq!(keeper.reverse(&ctx, "transfer", "ports/transfer").unwrap(), Some(1));
        assert_eq!(keeper.export_genesis(&ctx).unwrap(), genesis);
    }

    #[test]
    fn test_invalid_genesis_rejected() {
        let (keeper, mut ms) = setup();
        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        let genesis = CapabilityGenesis {
            index: 0,
            owners: Vec::new(),
        };
        assert!(matches!(
            keeper.init_genesis(&mut ctx, &genesis),
            Err(CapabilityError::InvalidGenesis(_))
        ));
    }
}
