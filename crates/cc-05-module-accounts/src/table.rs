//! # Module Account Table
//!
//! Built once during assembly, then read-only. Look-ups are exact,
//! case-sensitive matches on the account name.

use std::collections::{BTreeMap, BTreeSet};

use shared_types::AccAddress;
use tracing::{debug, info};

use crate::domain::{AccountsError, MaccPerms, ModuleAccountPermission, Permission};

#[derive(Debug, Default)]
pub struct ModuleAccountsBuilder {
    accounts: BTreeMap<String, ModuleAccountPermission>,
}

impl ModuleAccountsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `permissions` to the module account `name`.
    pub fn add(&mut self, name: &str, permissions: &[Permission]) -> Result<&mut Self, AccountsError> {
        if name.is_empty() {
            return Err(AccountsError::EmptyName);
        }
        if self.accounts.contains_key(name) {
            return Err(AccountsError::DuplicateAccount(name.to_string()));
        }

        debug!("[Accounts] {} granted {:?}", name, permissions);
        self.accounts.insert(
            name.to_string(),
            ModuleAccountPermission {
                account: name.to_string(),
                permissions: permissions.iter().copied().collect(),
                receiving_allowed: false,
            },
        );
        Ok(self)
    }

    /// Let ordinary transactions credit the account `name`.
    pub fn allow_receiving(&mut self, name: &str) -> Result<&mut Self, AccountsError> {
        let account = self
            .accounts
            .get_mut(name)
            .ok_or_else(|| AccountsError::UnknownAccount(name.to_string()))?;
        account.receiving_allowed = true;
        Ok(self)
    }

    pub fn build(self) -> ModuleAccountTable {
        let addresses = self
            .accounts
            .keys()
            .map(|name| (name.clone(), AccAddress::for_module(name)))
            .collect();

        info!("[Accounts] {} module accounts registered", self.accounts.len());
        ModuleAccountTable {
            accounts: self.accounts,
            addresses,
        }
    }
}

/// Frozen permission table.
#[derive(Debug, Clone)]
pub struct ModuleAccountTable {
    accounts: BTreeMap<String, ModuleAccountPermission>,
    addresses: BTreeMap<String, AccAddress>,
}

impl ModuleAccountTable {
    /// A copy of the permission table.
    ///
    /// Mutating the returned map never affects the table.
    pub fn get_macc_perms(&self) -> MaccPerms {
        self.accounts
            .iter()
            .map(|(name, account)| (name.clone(), account.permissions.clone()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ModuleAccountPermission> {
        self.accounts.get(name)
    }

    /// Whether `name` is a module account. Unknown names are plain accounts.
    pub fn is_module_account(&self, name: &str) -> bool {
        self.accounts.contains_key(name)
    }

    pub fn has_permission(&self, name: &str, permission: Permission) -> bool {
        self.accounts
            .get(name)
            .is_some_and(|a| a.permissions.contains(&permission))
    }

    pub fn receiving_allowed(&self, name: &str) -> bool {
        self.accounts.get(name).is_some_and(|a| a.receiving_allowed)
    }

    pub fn address_of(&self, name: &str) -> Option<AccAddress> {
        self.addresses.get(name).copied()
    }

    /// Every module account address.
    pub fn module_account_addrs(&self) -> BTreeSet<AccAddress> {
        self.addresses.values().copied().collect()
    }

    /// Module account addresses ordinary transactions may not credit.
    pub fn blocked_module_addrs(&self) -> BTreeSet<AccAddress> {
        self.addresses
            .iter()
            .filter(|(name, _)| !self.receiving_allowed(name))
            .map(|(_, addr)| *addr)
            .collect()
    }

    pub fn is_blocked(&self, addr: &AccAddress) -> bool {
        self.addresses
            .iter()
            .any(|(name, a)| a == addr && !self.receiving_allowed(name))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ModuleAccountTable {
        let mut builder = ModuleAccountsBuilder::new();
        builder
            .add("fee_collector", &[])
            .unwrap()
            .add("distribution", &[])
            .unwrap()
            .add("mint", &[Permission::Mint])
            .unwrap()
            .add("bonded_tokens_pool", &[Permission::Burn, Permission::Stake])
            .unwrap()
            .allow_receiving("distribution")
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_macc_perms_is_a_copy() {
        let table = table();
        let mut perms = table.get_macc_perms();
        perms.insert("rogue".to_string(), [Permission::Mint].into_iter().collect());
        if let Some(p) = perms.get_mut("fee_collector") {
            p.insert(Permission::Burn);
        }

        let fresh = table.get_macc_perms();
        assert!(!fresh.contains_key("rogue"));
        assert!(fresh["fee_collector"].is_empty());
        assert!(!table.has_permission("fee_collector", Permission::Burn));
    }

    #[test]
    fn test_addrs_count_matches_accounts() {
        let table = table();
        assert_eq!(table.module_account_addrs().len(), table.get_macc_perms().len());
        assert_eq!(table.blocked_module_addrs().len(), 3);
    }

    #[test]
    fn test_receiving_account_not_blocked() {
        let table = table();
        let distr = table.address_of("distribution").unwrap();
        let mint = table.address_of("mint").unwrap();

        assert!(table.module_account_addrs().contains(&distr));
        assert!(!table.blocked_module_addrs().contains(&distr));
        assert!(!table.is_blocked(&distr));
        assert!(table.is_blocked(&mint));
    }

    #[test]
    fn test_lookups_are_case_sensitive() {
        let table = table();
        assert!(table.has_permission("mint", Permission::Mint));
        assert!(!table.has_permission("Mint", Permission::Mint));
        assert!(!table.is_module_account("MINT"));
        assert!(!table.has_permission("alice", Permission::Mint));
    }

    #[test]
    fn test_duplicate_and_unknown_rejected() {
        let mut builder = ModuleAccountsBuilder::new();
        builder.add("gov", &[Permission::Burn]).unwrap();
        assert_eq!(
            builder.add("gov", &[]).err(),
            Some(AccountsError::DuplicateAccount("gov".to_string()))
        );
        assert_eq!(
            builder.allow_receiving("transfer").err(),
            Some(AccountsError::UnknownAccount("transfer".to_string()))
        );
    }
}
