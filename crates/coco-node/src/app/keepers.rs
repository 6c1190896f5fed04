//! # Keeper Assembly
//!
//! Builds every keeper exactly once, in the order given by sorting the
//! dependency table, then performs the one-time wiring that has to wait
//! until all keepers exist:
//!
//! 1. Allocate store keys and build the module account table
//! 2. Sort `layout::DEPENDENCIES`; a cycle aborts assembly
//! 3. Construct keepers in sorted order (params creates every subspace,
//!    capability scopes ibc and transfer, gov and evidence seal their
//!    routers)
//! 4. Attach staking hooks and install the sealed IBC port router
//!
//! Capability sealing needs a storage context and is done by the
//! application once the multistore is mounted.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use cc_01_store::{StoreKey, StoreKeyAllocator};
use cc_02_params::{ParamsKeeper, Subspace};
use cc_03_capability::{CapabilityKeeper, ScopedCapabilityKeeper};
use cc_04_module_manager::{AppModule, DependencyGraph};
use cc_05_module_accounts::{ModuleAccountTable, ModuleAccountsBuilder};
use cc_06_routing::{EvidenceRouter, GovRouter, PortRouter, RouteDomain};
use tracing::{debug, info};

use super::errors::AssemblyError;
use super::{consensus, layout};
use crate::modules::auth::{AuthKeeper, AuthModule};
use crate::modules::bank::{BankKeeper, BankModule};
use crate::modules::capability::CapabilityModule;
use crate::modules::crisis::{CrisisKeeper, CrisisModule};
use crate::modules::distribution::{DistributionHooks, DistributionKeeper, DistributionModule};
use crate::modules::evidence::{EvidenceKeeper, EvidenceModule};
use crate::modules::genutil::GenutilModule;
use crate::modules::gov::{self, GovKeeper, GovModule};
use crate::modules::ibc::{self, IbcKeeper, IbcModule};
use crate::modules::mint::{MintKeeper, MintModule};
use crate::modules::params::{self, ParamsModule};
use crate::modules::slashing::{SlashingHooks, SlashingKeeper, SlashingModule};
use crate::modules::staking::{StakingHooks, StakingKeeper, StakingModule};
use crate::modules::transfer::{self, TransferIbcModule, TransferKeeper, TransferModule};
use crate::modules::upgrade::{UpgradeHandler, UpgradeKeeper, UpgradeModule};
use crate::modules::{
    auth, bank, capability, crisis, distribution, evidence, genutil, mint, slashing, staking,
    upgrade,
};

/// Store keys issued for the application, by name.
#[derive(Debug, Clone)]
pub struct StoreKeys {
    kv: BTreeMap<String, StoreKey>,
    transient: BTreeMap<String, StoreKey>,
    memory: BTreeMap<String, StoreKey>,
}

impl StoreKeys {
    pub fn allocate(allocator: &mut StoreKeyAllocator) -> Result<Self, AssemblyError> {
        Ok(Self {
            kv: allocator.new_kv_store_keys(&layout::KV_STORE_KEYS)?,
            transient: allocator.new_transient_store_keys(&layout::TRANSIENT_STORE_KEYS)?,
            memory: allocator.new_memory_store_keys(&layout::MEMORY_STORE_KEYS)?,
        })
    }

    pub fn kv(&self, name: &str) -> Result<StoreKey, AssemblyError> {
        lookup(&self.kv, name)
    }

    pub fn transient(&self, name: &str) -> Result<StoreKey, AssemblyError> {
        lookup(&self.transient, name)
    }

    pub fn memory(&self, name: &str) -> Result<StoreKey, AssemblyError> {
        lookup(&self.memory, name)
    }

    /// Every issued key, persistent first.
    pub fn all(&self) -> impl Iterator<Item = &StoreKey> {
        self.kv
            .values()
            .chain(self.transient.values())
            .chain(self.memory.values())
    }
}

fn lookup(keys: &BTreeMap<String, StoreKey>, name: &str) -> Result<StoreKey, AssemblyError> {
    keys.get(name)
        .cloned()
        .ok_or_else(|| AssemblyError::MissingStoreKey(name.to_string()))
}

/// Node-supplied settings that shape the keepers.
#[derive(Clone, Default)]
pub struct AppOptions {
    /// Assert invariants every N blocks (0 disables).
    pub inv_check_period: u64,
    pub skip_upgrade_heights: Vec<u64>,
    /// Migrations by upgrade plan name.
    pub upgrade_handlers: BTreeMap<String, Arc<UpgradeHandler>>,
}

impl fmt::Debug for AppOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppOptions")
            .field("inv_check_period", &self.inv_check_period)
            .field("skip_upgrade_heights", &self.skip_upgrade_heights)
            .field("upgrade_handlers", &self.upgrade_handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AppOptions {
    pub fn with_upgrade_handler<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut cc_01_store::Context<'_>, &upgrade::Plan) -> Result<(), shared_types::ModuleError>
            + Send
            + Sync
            + 'static,
    {
        self.upgrade_handlers.insert(name.to_string(), Arc::new(handler));
        self
    }
}

/// Build the frozen module account table from the layout.
pub fn build_module_accounts() -> Result<ModuleAccountTable, AssemblyError> {
    let mut builder = ModuleAccountsBuilder::new();
    for (name, permissions) in layout::MACC_PERMS {
        builder.add(name, permissions)?;
    }
    for name in layout::ALLOWED_RECEIVING {
        builder.allow_receiving(name)?;
    }
    Ok(builder.build())
}

/// Keeper construction order: every keeper after the keepers it uses.
pub fn keeper_order() -> Result<Vec<String>, AssemblyError> {
    let mut graph = DependencyGraph::new();
    for (name, deps) in layout::DEPENDENCIES {
        let deps: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
        graph.add(name, &deps);
    }
    Ok(graph.sort()?)
}

/// Every keeper of the application.
#[derive(Debug, Clone)]
pub struct AppKeepers {
    pub params: ParamsKeeper,
    /// The `baseapp` subspace holding consensus parameters.
    pub consensus_params: Subspace,
    pub capability: CapabilityKeeper,
    pub scoped_ibc: ScopedCapabilityKeeper,
    pub scoped_transfer: ScopedCapabilityKeeper,
    pub auth: AuthKeeper,
    pub bank: BankKeeper,
    pub staking: StakingKeeper,
    pub mint: MintKeeper,
    pub distribution: DistributionKeeper,
    pub slashing: SlashingKeeper,
    pub crisis: CrisisKeeper,
    pub upgrade: UpgradeKeeper,
    pub gov: GovKeeper,
    pub ibc: IbcKeeper,
    pub evidence: EvidenceKeeper,
    pub transfer: TransferKeeper,
}

impl AppKeepers {
    /// Construct and wire every keeper.
    pub fn assemble(
        keys: &StoreKeys,
        accounts: Arc<ModuleAccountTable>,
        options: &AppOptions,
    ) -> Result<Self, AssemblyError> {
        let order = keeper_order()?;
        info!("[App] Keeper construction order: {}", order.join(" -> "));

        let mut slots = KeeperSlots::new(keys, accounts, options);
        for name in &order {
            slots.build(name)?;
        }
        let keepers = slots.finish()?;
        keepers.wire()?;
        Ok(keepers)
    }

    /// Wiring that needs more than one finished keeper.
    fn wire(&self) -> Result<(), AssemblyError> {
        let mut hooks: Vec<Box<dyn StakingHooks>> = Vec::new();
        hooks.push(Box::new(DistributionHooks::new(self.distribution.clone())));
        hooks.push(Box::new(SlashingHooks::new(self.slashing.clone())));
        self.staking.set_hooks(hooks)?;

        let mut ports = PortRouter::new(RouteDomain::Port);
        ports.add_route(
            transfer::PORT_ID,
            Box::new(TransferIbcModule::new(self.transfer.clone())),
        )?;
        self.ibc.set_router(ports)?;
        Ok(())
    }

    /// Lifecycle adapter for `name`.
    pub fn module(&self, name: &str) -> Result<Box<dyn AppModule>, AssemblyError> {
        let module: Box<dyn AppModule> = match name {
            auth::MODULE_NAME => Box::new(AuthModule::new(self.auth.clone())),
            genutil::MODULE_NAME => Box::new(GenutilModule::new(self.staking.clone())),
            bank::MODULE_NAME => Box::new(BankModule::new(self.bank.clone())),
            capability::MODULE_NAME => Box::new(CapabilityModule::new(self.capability.clone())),
            staking::MODULE_NAME => Box::new(StakingModule::new(self.staking.clone())),
            mint::MODULE_NAME => Box::new(MintModule::new(self.mint.clone())),
            distribution::MODULE_NAME => {
                Box::new(DistributionModule::new(self.distribution.clone()))
            }
            gov::MODULE_NAME => Box::new(GovModule::new(self.gov.clone())),
            params::MODULE_NAME => Box::new(ParamsModule),
            crisis::MODULE_NAME => Box::new(CrisisModule::new(self.crisis.clone())),
            slashing::MODULE_NAME => Box::new(SlashingModule::new(self.slashing.clone())),
            ibc::MODULE_NAME => Box::new(IbcModule::new(self.ibc.clone())),
            upgrade::MODULE_NAME => Box::new(UpgradeModule::new(self.upgrade.clone())),
            evidence::MODULE_NAME => Box::new(EvidenceModule::new(self.evidence.clone())),
            transfer::MODULE_NAME => Box::new(TransferModule::new(self.transfer.clone())),
            other => return Err(AssemblyError::UnknownModule(other.to_string())),
        };
        Ok(module)
    }
}

/// Keepers under construction.
struct KeeperSlots<'a> {
    keys: &'a StoreKeys,
    options: &'a AppOptions,
    accounts: Arc<ModuleAccountTable>,
    params: Option<ParamsKeeper>,
    consensus_params: Option<Subspace>,
    capability: Option<CapabilityKeeper>,
    scoped_ibc: Option<ScopedCapabilityKeeper>,
    scoped_transfer: Option<ScopedCapabilityKeeper>,
    auth: Option<AuthKeeper>,
    bank: Option<BankKeeper>,
    staking: Option<StakingKeeper>,
    mint: Option<MintKeeper>,
    distribution: Option<DistributionKeeper>,
    slashing: Option<SlashingKeeper>,
    crisis: Option<CrisisKeeper>,
    upgrade: Option<UpgradeKeeper>,
    gov: Option<GovKeeper>,
    ibc: Option<IbcKeeper>,
    evidence: Option<EvidenceKeeper>,
    transfer: Option<TransferKeeper>,
}

fn require<T: Clone>(slot: &Option<T>, module: &str, dependency: &str) -> Result<T, AssemblyError> {
    slot.clone().ok_or_else(|| AssemblyError::MissingKeeper {
        module: module.to_string(),
        dependency: dependency.to_string(),
    })
}

impl<'a> KeeperSlots<'a> {
    fn new(keys: &'a StoreKeys, accounts: Arc<ModuleAccountTable>, options: &'a AppOptions) -> Self {
        Self {
            keys,
            options,
            accounts,
            params: None,
            consensus_params: None,
            capability: None,
            scoped_ibc: None,
            scoped_transfer: None,
            auth: None,
            bank: None,
            staking: None,
            mint: None,
            distribution: None,
            slashing: None,
            crisis: None,
            upgrade: None,
            gov: None,
            ibc: None,
            evidence: None,
            transfer: None,
        }
    }

    fn subspace(&self, module: &str) -> Result<Subspace, AssemblyError> {
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| AssemblyError::MissingKeeper {
                module: module.to_string(),
                dependency: params::MODULE_NAME.to_string(),
            })?;
        Ok(params.get_subspace(module)?)
    }

    fn build(&mut self, module: &str) -> Result<(), AssemblyError> {
        match module {
            params::MODULE_NAME => {
                let mut keeper = ParamsKeeper::new(
                    self.keys.kv(cc_02_params::STORE_KEY)?,
                    self.keys.transient(cc_02_params::TSTORE_KEY)?,
                );
                for name in layout::SUBSPACES {
                    keeper.subspace(name)?;
                }
                let baseapp = keeper
                    .subspace(layout::BASEAPP_SUBSPACE)?
                    .with_key_table(consensus::key_table()?)?;
                self.consensus_params = Some(baseapp);
                self.params = Some(keeper);
            }
            capability::MODULE_NAME => {
                let keeper = CapabilityKeeper::new(
                    self.keys.kv(cc_03_capability::STORE_KEY)?,
                    self.keys.memory(cc_03_capability::MEM_STORE_KEY)?,
                );
                self.scoped_ibc = Some(keeper.scope_to_module(ibc::MODULE_NAME)?);
                self.scoped_transfer = Some(keeper.scope_to_module(transfer::MODULE_NAME)?);
                self.capability = Some(keeper);
            }
            upgrade::MODULE_NAME => {
                let keeper = UpgradeKeeper::new(
                    self.keys.kv(upgrade::STORE_KEY)?,
                    self.options.skip_upgrade_heights.iter().copied(),
                )
                .with_handlers(self.options.upgrade_handlers.clone());
                self.upgrade = Some(keeper);
            }
            auth::MODULE_NAME => {
                self.auth = Some(AuthKeeper::new(
                    self.keys.kv(auth::STORE_KEY)?,
                    self.subspace(module)?,
                    Arc::clone(&self.accounts),
                )?);
            }
            bank::MODULE_NAME => {
                self.bank = Some(BankKeeper::new(
                    self.keys.kv(bank::STORE_KEY)?,
                    self.subspace(module)?,
                    require(&self.auth, module, auth::MODULE_NAME)?,
                )?);
            }
            staking::MODULE_NAME => {
                self.staking = Some(StakingKeeper::new(
                    self.keys.kv(staking::STORE_KEY)?,
                    self.subspace(module)?,
                    require(&self.bank, module, bank::MODULE_NAME)?,
                )?);
            }
            mint::MODULE_NAME => {
                self.mint = Some(MintKeeper::new(
                    self.keys.kv(mint::STORE_KEY)?,
                    self.subspace(module)?,
                    require(&self.staking, module, staking::MODULE_NAME)?,
                    require(&self.bank, module, bank::MODULE_NAME)?,
                )?);
            }
            distribution::MODULE_NAME => {
                self.distribution = Some(DistributionKeeper::new(
                    self.keys.kv(distribution::STORE_KEY)?,
                    self.subspace(module)?,
                    require(&self.bank, module, bank::MODULE_NAME)?,
                    require(&self.staking, module, staking::MODULE_NAME)?,
                )?);
            }
            slashing::MODULE_NAME => {
                self.slashing = Some(SlashingKeeper::new(
                    self.keys.kv(slashing::STORE_KEY)?,
                    self.subspace(module)?,
                    require(&self.staking, module, staking::MODULE_NAME)?,
                )?);
            }
            crisis::MODULE_NAME => {
                self.crisis = Some(CrisisKeeper::new(
                    self.subspace(module)?,
                    require(&self.bank, module, bank::MODULE_NAME)?,
                    self.options.inv_check_period,
                )?);
            }
            gov::MODULE_NAME => {
                let params_keeper = require(&self.params, module, params::MODULE_NAME)?;
                let distr_keeper = require(&self.distribution, module, distribution::MODULE_NAME)?;
                let upgrade_keeper = require(&self.upgrade, module, upgrade::MODULE_NAME)?;

                let mut router = GovRouter::new(RouteDomain::Governance);
                router
                    .add_route(gov::ROUTE, gov::text_proposal_handler())?
                    .add_route(params::ROUTE, params::proposal_route(params_keeper))?
                    .add_route(distribution::ROUTE, distr_keeper.proposal_handler())?
                    .add_route(upgrade::ROUTE, upgrade_keeper.proposal_handler())?;

                self.gov = Some(GovKeeper::new(
                    self.keys.kv(gov::STORE_KEY)?,
                    self.subspace(module)?,
                    require(&self.bank, module, bank::MODULE_NAME)?,
                    require(&self.staking, module, staking::MODULE_NAME)?,
                    router,
                )?);
            }
            ibc::MODULE_NAME => {
                self.ibc = Some(IbcKeeper::new(
                    self.keys.kv(ibc::STORE_KEY)?,
                    self.subspace(module)?,
                    require(&self.scoped_ibc, module, capability::MODULE_NAME)?,
                    require(&self.staking, module, staking::MODULE_NAME)?,
                    require(&self.upgrade, module, upgrade::MODULE_NAME)?,
                )?);
            }
            evidence::MODULE_NAME => {
                let ibc_keeper = require(&self.ibc, module, ibc::MODULE_NAME)?;
                let mut router = EvidenceRouter::new(RouteDomain::Evidence);
                router.add_route(ibc::MISBEHAVIOUR_ROUTE, ibc_keeper.misbehaviour_handler())?;

                self.evidence = Some(EvidenceKeeper::new(
                    self.keys.kv(evidence::STORE_KEY)?,
                    require(&self.slashing, module, slashing::MODULE_NAME)?,
                    router,
                ));
            }
            transfer::MODULE_NAME => {
                self.transfer = Some(TransferKeeper::new(
                    self.keys.kv(transfer::STORE_KEY)?,
                    self.subspace(module)?,
                    require(&self.scoped_transfer, module, capability::MODULE_NAME)?,
                    require(&self.ibc, module, ibc::MODULE_NAME)?,
                    require(&self.auth, module, auth::MODULE_NAME)?,
                    require(&self.bank, module, bank::MODULE_NAME)?,
                )?);
            }
            genutil::MODULE_NAME => {
                // genutil has no keeper of its own; it drives staking.
                require(&self.staking, module, staking::MODULE_NAME)?;
            }
            other => return Err(AssemblyError::UnknownModule(other.to_string())),
        }
        debug!("[App] Built {} keeper", module);
        Ok(())
    }

    fn finish(self) -> Result<AppKeepers, AssemblyError> {
        const APP: &str = "app";
        Ok(AppKeepers {
            params: require(&self.params, APP, params::MODULE_NAME)?,
            consensus_params: require(&self.consensus_params, APP, layout::BASEAPP_SUBSPACE)?,
            capability: require(&self.capability, APP, capability::MODULE_NAME)?,
            scoped_ibc: require(&self.scoped_ibc, APP, capability::MODULE_NAME)?,
            scoped_transfer: require(&self.scoped_transfer, APP, capability::MODULE_NAME)?,
            auth: require(&self.auth, APP, auth::MODULE_NAME)?,
            bank: require(&self.bank, APP, bank::MODULE_NAME)?,
            staking: require(&self.staking, APP, staking::MODULE_NAME)?,
            mint: require(&self.mint, APP, mint::MODULE_NAME)?,
            distribution: require(&self.distribution, APP, distribution::MODULE_NAME)?,
            slashing: require(&self.slashing, APP, slashing::MODULE_NAME)?,
            crisis: require(&self.crisis, APP, crisis::MODULE_NAME)?,
            upgrade: require(&self.upgrade, APP, upgrade::MODULE_NAME)?,
            gov: require(&self.gov, APP, gov::MODULE_NAME)?,
            ibc: require(&self.ibc, APP, ibc::MODULE_NAME)?,
            evidence: require(&self.evidence, APP, evidence::MODULE_NAME)?,
            transfer: require(&self.transfer, APP, transfer::MODULE_NAME)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_05_module_accounts::Permission;

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_keeper_order_respects_dependencies() {
        let order = keeper_order().unwrap();
        assert_eq!(order.len(), layout::DEPENDENCIES.len());
        for (name, deps) in layout::DEPENDENCIES {
            for dep in deps {
                assert!(position(&order, dep) < position(&order, name), "{dep} before {name}");
            }
        }
    }

    #[test]
    fn test_module_account_table() {
        let table = build_module_accounts().unwrap();
        assert_eq!(table.len(), 7);
        assert!(table.has_permission("mint", Permission::Mint));
        assert!(table.has_permission("bonded_tokens_pool", Permission::Stake));
        assert!(!table.has_permission("gov", Permission::Mint));
        assert!(table.receiving_allowed("distribution"));
        assert_eq!(table.blocked_module_addrs().len(), 6);
    }

    #[test]
    fn test_assemble_wires_hooks_and_routers() {
        let mut allocator = StoreKeyAllocator::new();
        let keys = StoreKeys::allocate(&mut allocator).unwrap();
        let accounts = Arc::new(build_module_accounts().unwrap());
        let keepers = AppKeepers::assemble(&keys, accounts, &AppOptions::default()).unwrap();

        assert_eq!(keepers.gov.router().keys().len(), 4);
        assert!(keepers.gov.router().is_sealed());
        assert!(keepers.evidence.router().has_route(ibc::MISBEHAVIOUR_ROUTE));
        assert!(keepers.ibc.router().unwrap().has_route(transfer::PORT_ID));
        assert_eq!(
            keepers.capability.scoped_modules(),
            vec!["ibc".to_string(), "transfer".to_string()]
        );
        assert!(!keepers.capability.is_sealed());

        // hooks and the port router are one-shot
        assert!(keepers.staking.set_hooks(Vec::new()).is_err());
        assert!(keepers.ibc.set_router(PortRouter::new(RouteDomain::Port)).is_err());
    }

    #[test]
    fn test_subspaces_created_up_front() {
        let mut allocator = StoreKeyAllocator::new();
        let keys = StoreKeys::allocate(&mut allocator).unwrap();
        let accounts = Arc::new(build_module_accounts().unwrap());
        let keepers = AppKeepers::assemble(&keys, accounts, &AppOptions::default()).unwrap();

        let names: Vec<&str> = keepers.params.subspace_names().collect();
        for name in layout::SUBSPACES {
            assert!(names.contains(&name), "missing subspace {name}");
        }
        assert!(keepers.consensus_params.has_key_table());
        assert!(keepers.params.get_subspace("gov").unwrap().has_key_table());
    }
}
