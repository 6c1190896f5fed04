//! # Application Layout
//!
//! The static shape of the CoCo application: which modules exist, what
//! each keeper is built from, which store partitions are issued, which
//! module accounts hold which permissions and in what order every
//! lifecycle phase runs.
//!
//! ## Keeper Dependencies
//!
//! ```text
//! params ──┬── auth ── bank ── staking ──┬── mint
//!          │                             ├── distribution ──┐
//!          │                             ├── slashing ── evidence
//!          │                             └── ibc ─── transfer
//! upgrade ─┴───────────────────────────────── gov ◄─────────┘
//! capability ── ibc, transfer
//! ```

use cc_05_module_accounts::Permission;

use crate::modules::{
    auth, bank, capability, crisis, distribution, evidence, genutil, gov, ibc, mint, params,
    slashing, staking, transfer, upgrade, BONDED_POOL, FEE_COLLECTOR, NOT_BONDED_POOL,
};

/// Every installed module, in registration order.
pub const MODULE_NAMES: [&str; 15] = [
    auth::MODULE_NAME,
    genutil::MODULE_NAME,
    bank::MODULE_NAME,
    capability::MODULE_NAME,
    staking::MODULE_NAME,
    mint::MODULE_NAME,
    distribution::MODULE_NAME,
    gov::MODULE_NAME,
    params::MODULE_NAME,
    crisis::MODULE_NAME,
    slashing::MODULE_NAME,
    ibc::MODULE_NAME,
    upgrade::MODULE_NAME,
    evidence::MODULE_NAME,
    transfer::MODULE_NAME,
];

/// Keepers each module's keeper is constructed from.
pub const DEPENDENCIES: [(&str, &[&str]); 15] = [
    (params::MODULE_NAME, &[]),
    (capability::MODULE_NAME, &[]),
    (upgrade::MODULE_NAME, &[]),
    (auth::MODULE_NAME, &[params::MODULE_NAME]),
    (bank::MODULE_NAME, &[params::MODULE_NAME, auth::MODULE_NAME]),
    (staking::MODULE_NAME, &[params::MODULE_NAME, bank::MODULE_NAME]),
    (
        mint::MODULE_NAME,
        &[params::MODULE_NAME, staking::MODULE_NAME, bank::MODULE_NAME],
    ),
    (
        distribution::MODULE_NAME,
        &[params::MODULE_NAME, bank::MODULE_NAME, staking::MODULE_NAME],
    ),
    (slashing::MODULE_NAME, &[params::MODULE_NAME, staking::MODULE_NAME]),
    (crisis::MODULE_NAME, &[params::MODULE_NAME, bank::MODULE_NAME]),
    (
        gov::MODULE_NAME,
        &[
            params::MODULE_NAME,
            bank::MODULE_NAME,
            staking::MODULE_NAME,
            distribution::MODULE_NAME,
            upgrade::MODULE_NAME,
        ],
    ),
    (
        ibc::MODULE_NAME,
        &[
            params::MODULE_NAME,
            capability::MODULE_NAME,
            staking::MODULE_NAME,
            upgrade::MODULE_NAME,
        ],
    ),
    (evidence::MODULE_NAME, &[slashing::MODULE_NAME, ibc::MODULE_NAME]),
    (
        transfer::MODULE_NAME,
        &[
            params::MODULE_NAME,
            capability::MODULE_NAME,
            ibc::MODULE_NAME,
            auth::MODULE_NAME,
            bank::MODULE_NAME,
        ],
    ),
    (
        genutil::MODULE_NAME,
        &[auth::MODULE_NAME, staking::MODULE_NAME, bank::MODULE_NAME],
    ),
];

/// Direct keeper dependencies of `module`; empty for unknown names.
pub fn dependencies_of(module: &str) -> &'static [&'static str] {
    DEPENDENCIES
        .iter()
        .find(|(name, _)| *name == module)
        .map(|(_, deps)| *deps)
        .unwrap_or_default()
}

pub const BEGIN_BLOCKERS: [&str; 7] = [
    upgrade::MODULE_NAME,
    mint::MODULE_NAME,
    distribution::MODULE_NAME,
    slashing::MODULE_NAME,
    evidence::MODULE_NAME,
    staking::MODULE_NAME,
    ibc::MODULE_NAME,
];

pub const END_BLOCKERS: [&str; 3] = [crisis::MODULE_NAME, gov::MODULE_NAME, staking::MODULE_NAME];

/// Capability must go first so that later genesis steps can claim
/// capabilities; genutil must follow staking and bank so genesis
/// transactions find funded accounts.
pub const INIT_GENESIS_ORDER: [&str; 13] = [
    capability::MODULE_NAME,
    auth::MODULE_NAME,
    distribution::MODULE_NAME,
    staking::MODULE_NAME,
    bank::MODULE_NAME,
    slashing::MODULE_NAME,
    gov::MODULE_NAME,
    mint::MODULE_NAME,
    crisis::MODULE_NAME,
    ibc::MODULE_NAME,
    genutil::MODULE_NAME,
    evidence::MODULE_NAME,
    transfer::MODULE_NAME,
];

pub const KV_STORE_KEYS: [&str; 13] = [
    auth::STORE_KEY,
    bank::STORE_KEY,
    staking::STORE_KEY,
    mint::STORE_KEY,
    distribution::STORE_KEY,
    slashing::STORE_KEY,
    gov::STORE_KEY,
    cc_02_params::STORE_KEY,
    ibc::STORE_KEY,
    upgrade::STORE_KEY,
    evidence::STORE_KEY,
    transfer::STORE_KEY,
    cc_03_capability::STORE_KEY,
];

pub const TRANSIENT_STORE_KEYS: [&str; 1] = [cc_02_params::TSTORE_KEY];

pub const MEMORY_STORE_KEYS: [&str; 1] = [cc_03_capability::MEM_STORE_KEY];

/// Subspace holding the consensus parameters.
pub const BASEAPP_SUBSPACE: &str = "baseapp";

/// Parameter subspaces created before any keeper.
pub const SUBSPACES: [&str; 10] = [
    auth::MODULE_NAME,
    bank::MODULE_NAME,
    staking::MODULE_NAME,
    mint::MODULE_NAME,
    distribution::MODULE_NAME,
    slashing::MODULE_NAME,
    gov::MODULE_NAME,
    crisis::MODULE_NAME,
    ibc::MODULE_NAME,
    transfer::MODULE_NAME,
];

/// Module account permissions.
pub const MACC_PERMS: [(&str, &[Permission]); 7] = [
    (FEE_COLLECTOR, &[]),
    (distribution::MODULE_NAME, &[]),
    (mint::MODULE_NAME, &[Permission::Mint]),
    (BONDED_POOL, &[Permission::Burn, Permission::Stake]),
    (NOT_BONDED_POOL, &[Permission::Burn, Permission::Stake]),
    (gov::MODULE_NAME, &[Permission::Burn]),
    (transfer::MODULE_NAME, &[Permission::Mint, Permission::Burn]),
];

/// Module accounts that ordinary transactions may credit.
pub const ALLOWED_RECEIVING: [&str; 1] = [distribution::MODULE_NAME];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_every_module_has_dependencies_entry() {
        let declared: BTreeSet<&str> = MODULE_NAMES.iter().copied().collect();
        let listed: BTreeSet<&str> = DEPENDENCIES.iter().map(|(n, _)| *n).collect();
        assert_eq!(declared, listed);

        for (name, deps) in DEPENDENCIES {
            for dep in deps {
                assert!(declared.contains(dep), "{name} depends on unknown {dep}");
            }
        }
    }

    #[test]
    fn test_dependencies_of() {
        assert_eq!(dependencies_of("evidence"), &["slashing", "ibc"]);
        assert!(dependencies_of("params").is_empty());
        assert!(dependencies_of("nonexistent").is_empty());
    }

    #[test]
    fn test_orders_have_no_repeats() {
        let init: BTreeSet<&str> = INIT_GENESIS_ORDER.iter().copied().collect();
        let begin: BTreeSet<&str> = BEGIN_BLOCKERS.iter().copied().collect();
        let end: BTreeSet<&str> = END_BLOCKERS.iter().copied().collect();
        assert_eq!(init.len(), INIT_GENESIS_ORDER.len());
        assert_eq!(begin.len(), BEGIN_BLOCKERS.len());
        assert_eq!(end.len(), END_BLOCKERS.len());

        assert!(!init.contains("params"));
        assert!(!init.contains("upgrade"));
    }

    #[test]
    fn test_store_keys_distinct() {
        let kv: BTreeSet<&str> = KV_STORE_KEYS.iter().copied().collect();
        assert_eq!(kv.len(), KV_STORE_KEYS.len());
        assert!(kv.contains("acc"));
        assert!(!kv.contains("crisis"));
    }
}
