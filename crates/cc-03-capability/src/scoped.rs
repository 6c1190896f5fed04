//! # Scoped Capability Keeper
//!
//! A module's private view of the capability keeper. Every operation is
//! namespaced by the module name, and tokens issued here only authenticate
//! here.

use std::collections::BTreeSet;

use cc_01_store::Context;
use tracing::debug;

use crate::domain::{Capability, CapabilityError, Owner};
use crate::keeper::CapabilityKeeper;

#[derive(Debug, Clone)]
pub struct ScopedCapabilityKeeper {
    module: String,
    keeper: CapabilityKeeper,
}

impl ScopedCapabilityKeeper {
    pub(crate) fn new(module: &str, keeper: CapabilityKeeper) -> Self {
        Self {
            module: module.to_string(),
            keeper,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Create a new capability owned by this module under `name`.
    pub fn new_capability(
        &self,
        ctx: &mut Context<'_>,
        name: &str,
    ) -> Result<Capability, CapabilityError> {
        self.keeper.ensure_initialized()?;
        self.check_name(name)?;

        if self.keeper.reverse(ctx, &self.module, name)?.is_some() {
            return Err(CapabilityError::NameTaken {
                module: self.module.clone(),
                name: name.to_string(),
            });
        }

        let index = self.keeper.allocate_index(ctx)?;
        let owner = Owner::new(&self.module, name);
        let owners: BTreeSet<Owner> = [owner.clone()].into_iter().collect();
        self.keeper.set_owners(ctx, index, &owners)?;
        self.keeper.set_reverse(ctx, &owner, index)?;

        debug!("[Capability] {} created capability {} as {}", self.module, index, name);
        Ok(Capability::new(index, &self.module))
    }

    /// Look up this module's capability named `name`.
    pub fn get_capability(
        &self,
        ctx: &Context<'_>,
        name: &str,
    ) -> Result<Option<Capability>, CapabilityError> {
        self.keeper.ensure_initialized()?;
        Ok(self
            .keeper
            .reverse(ctx, &self.module, name)?
            .map(|index| Capability::new(index, &self.module)))
    }

    /// Whether `cap` was issued by this scope and is owned under `name`.
    pub fn authenticate_capability(
        &self,
        ctx: &Context<'_>,
        cap: &Capability,
        name: &str,
    ) -> Result<bool, CapabilityError> {
        self.keeper.ensure_initialized()?;
        if cap.scope() != self.module {
            return Ok(false);
        }
        Ok(self.keeper.reverse(ctx, &self.module, name)? == Some(cap.index()))
    }

    /// Take co-ownership of a capability handed over by another module.
    ///
    /// Returns this scope's own handle; the handle passed in stays bound to
    /// its original scope.
    pub fn claim_capability(
        &self,
        ctx: &mut Context<'_>,
        cap: &Capability,
        name: &str,
    ) -> Result<Capability, CapabilityError> {
        self.keeper.ensure_initialized()?;
        self.check_name(name)?;

        let mut owners = self.keeper.get_owners(ctx, cap.index())?;
        if owners.is_empty() {
            return Err(CapabilityError::NotFound(cap.index()));
        }
        if owners.iter().any(|o| o.module == self.module) {
            return Err(CapabilityError::AlreadyOwned {
                module: self.module.clone(),
                index: cap.index(),
            });
        }
        if self.keeper.reverse(ctx, &self.module, name)?.is_some() {
            return Err(CapabilityError::NameTaken {
                module: self.module.clone(),
                name: name.to_string(),
            });
        }

        let owner = Owner::new(&self.module, name);
        owners.insert(owner.clone());
        self.keeper.set_owners(ctx, cap.index(), &owners)?;
        self.keeper.set_reverse(ctx, &owner, cap.index())?;

        debug!(
            "[Capability] {} claimed capability {} as {}",
            self.module,
            cap.index(),
            name
        );
        Ok(Capability::new(cap.index(), &self.module))
    }

    /// Give up this module's ownership of `cap`.
    ///
    /// The underlying object is forgotten once its last owner releases it.
    pub fn release_capability(
        &self,
        ctx: &mut Context<'_>,
        cap: &Capability,
    ) -> Result<(), CapabilityError> {
        self.keeper.ensure_initialized()?;
        if cap.scope() != self.module {
            return Err(CapabilityError::WrongScope {
                token_scope: cap.scope().to_string(),
                scope: self.module.clone(),
            });
        }

        let mut owners = self.keeper.get_owners(ctx, cap.index())?;
        let Some(owner) = owners.iter().find(|o| o.module == self.module).cloned() else {
            return Err(CapabilityError::NotOwner {
                module: self.module.clone(),
                index: cap.index(),
            });
        };

        owners.remove(&owner);
        self.keeper.set_owners(ctx, cap.index(), &owners)?;
        self.keeper.delete_reverse(ctx, &owner)?;
        Ok(())
    }

    /// Modules owning the capability this scope knows as `name`.
    pub fn lookup_modules(
        &self,
        ctx: &Context<'_>,
        name: &str,
    ) -> Result<Option<(Vec<String>, Capability)>, CapabilityError> {
        let Some(cap) = self.get_capability(ctx, name)? else {
            return Ok(None);
        };
        let modules = self
            .keeper
            .get_owners(ctx, cap.index())?
            .into_iter()
            .map(|o| o.module)
            .collect();
        Ok(Some((modules, cap)))
    }

    fn check_name(&self, name: &str) -> Result<(), CapabilityError> {
        if name.trim().is_empty() {
            return Err(CapabilityError::EmptyName);
        }
        Ok(())
    }
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
    fn test_new_capability_before_seal_rejected() {
        let (keeper, mut ms) = setup();
        let ibc = keeper.scope_to_module("ibc").unwrap();

        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        assert_eq!(
            ibc.new_capability(&mut ctx, "ports/transfer"),
            Err(CapabilityError::NotInitialized)
        );
    }

    #[test]
    fn test_tokens_do_not_cross_scopes() {
        let (keeper, mut ms) = setup();
        let ibc = keeper.scope_to_module("ibc").unwrap();
        let transfer = keeper.scope_to_module("transfer").unwrap();

        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        keeper.initialize_and_seal(&mut ctx).unwrap();

        let cap = ibc.new_capability(&mut ctx, "ports/transfer").unwrap();
        assert!(ibc.authenticate_capability(&ctx, &cap, "ports/transfer").unwrap());
        assert!(!transfer.authenticate_capability(&ctx, &cap, "ports/transfer").unwrap());
    }

    #[test]
    fn test_claim_yields_distinct_handle() {
        let (keeper, mut ms) = setup();
        let ibc = keeper.scope_to_module("ibc").unwrap();
        let transfer = keeper.scope_to_module("transfer").unwrap();

        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        keeper.initialize_and_seal(&mut ctx).unwrap();

        let ibc_cap = ibc.new_capability(&mut ctx, "ports/transfer").unwrap();
        let transfer_cap = transfer
            .claim_capability(&mut ctx, &ibc_cap, "ports/transfer")
            .unwrap();

        assert_eq!(ibc_cap.index(), transfer_cap.index());
        assert_ne!(ibc_cap, transfer_cap);
        assert!(transfer.authenticate_capability(&ctx, &transfer_cap, "ports/transfer").unwrap());
        assert!(!transfer.authenticate_capability(&ctx, &ibc_cap, "ports/transfer").unwrap());

        let (mut modules, _) = ibc.lookup_modules(&ctx, "ports/transfer").unwrap().unwrap();
        modules.sort();
        assert_eq!(modules, vec!["ibc", "transfer"]);
    }

    #[test]
    fn test_claim_twice_rejected() {
        let (keeper, mut ms) = setup();
        let ibc = keeper.scope_to_module("ibc").unwrap();
        let transfer = keeper.scope_to_module("transfer").unwrap();

        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        keeper.initialize_and_seal(&mut ctx).unwrap();

        let cap = ibc.new_capability(&mut ctx, "ports/transfer").unwrap();
        transfer.claim_capability(&mut ctx, &cap, "ports/transfer").unwrap();
        assert!(matches!(
            transfer.claim_capability(&mut ctx, &cap, "again"),
            Err(CapabilityError::AlreadyOwned { .. })
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (keeper, mut ms) = setup();
        let ibc = keeper.scope_to_module("ibc").unwrap();

        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        keeper.initialize_and_seal(&mut ctx).unwrap();

        ibc.new_capability(&mut ctx, "channels/0").unwrap();
        assert!(matches!(
            ibc.new_capability(&mut ctx, "channels/0"),
            Err(CapabilityError::NameTaken { .. })
        ));
    }

    #[test]
    fn test_existing_scopes_keep_working_after_seal() {
        let (keeper, mut ms) = setup();
        let ibc = keeper.scope_to_module("ibc").unwrap();

        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        keeper.initialize_and_seal(&mut ctx).unwrap();

        let first = ibc.new_capability(&mut ctx, "a").unwrap();
        let second = ibc.new_capability(&mut ctx, "b").unwrap();
        assert_eq!(second.index(), first.index() + 1);
    }

    #[test]
    fn test_release_last_owner_forgets_capability() {
        let (keeper, mut ms) = setup();
        let ibc = keeper.scope_to_module("ibc").unwrap();

        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        keeper.initialize_and_seal(&mut ctx).unwrap();

        let cap = ibc.new_capability(&mut ctx, "channels/7").unwrap();
        ibc.release_capability(&mut ctx, &cap).unwrap();

        assert_eq!(ibc.get_capability(&ctx, "channels/7").unwrap(), None);
        assert!(keeper.get_owners(&ctx, cap.index()).unwrap().is_empty());
        assert!(matches!(
            ibc.release_capability(&mut ctx, &cap),
            Err(CapabilityError::NotOwner { .. })
        ));
    }

    #[test]
    fn test_release_foreign_token_rejected() {
        let (keeper, mut ms) = setup();
        let ibc = keeper.scope_to_module("ibc").unwrap();
        let transfer = keeper.scope_to_module("transfer").unwrap();

        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        keeper.initialize_and_seal(&mut ctx).unwrap();

        let cap = ibc.new_capability(&mut ctx, "ports/transfer").unwrap();
        assert!(matches!(
            transfer.release_capability(&mut ctx, &cap),
            Err(CapabilityError::WrongScope { .. })
        ));
    }
}
