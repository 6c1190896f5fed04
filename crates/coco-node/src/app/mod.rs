//! # CoCo Application
//!
//! `CocoApp` owns the multistore, every keeper and the frozen module
//! manager, and exposes the ABCI-style lifecycle used by the block driver.
//!
//! ## Assembly Sequence
//!
//! 1. Issue store keys and mount them in a fresh multistore
//! 2. Build the module account table
//! 3. Construct keepers in dependency order and wire hooks and routers
//! 4. Register every module and set the three phase orders
//! 5. Collect invariants into crisis
//! 6. Initialize and seal the capability keeper
//!
//! Any failure in these steps is an `AssemblyError` and the node does not
//! start.

pub mod consensus;
pub mod errors;
pub mod keepers;
pub mod layout;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use cc_01_store::{CommitInfo, Context, MultiStore, StoreKeyAllocator};
use cc_04_module_manager::{GenesisState, InvariantRegistry, ModuleManager, ModuleManagerBuilder};
use cc_05_module_accounts::{MaccPerms, ModuleAccountTable};
use shared_types::{
    AccAddress, BlockHeader, Phase, RequestBeginBlock, RequestEndBlock, RequestInitChain,
    ResponseBeginBlock, ResponseEndBlock, ResponseInitChain,
};
use tracing::{debug, info};

pub use consensus::ConsensusParams;
pub use errors::{AppError, AssemblyError};
pub use keepers::{AppKeepers, AppOptions, StoreKeys};

use crate::modules::staking::INIT_CHAIN_HISTORICAL_ENTRIES;

/// Lifecycle position of the open block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockStage {
    /// No block open; the next call must be BeginBlock.
    #[default]
    Idle,
    /// BeginBlock ran; EndBlock is next.
    Begun,
    /// EndBlock ran; Commit is next.
    Ended,
}

impl fmt::Display for BlockStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStage::Idle => write!(f, "idle"),
            BlockStage::Begun => write!(f, "begun"),
            BlockStage::Ended => write!(f, "ended"),
        }
    }
}

pub struct CocoApp {
    name: String,
    store: MultiStore,
    keys: StoreKeys,
    accounts: Arc<ModuleAccountTable>,
    keepers: AppKeepers,
    manager: ModuleManager,
    chain_id: Option<String>,
    /// Header of the block between BeginBlock and Commit.
    current: Option<BlockHeader>,
    stage: BlockStage,
}

impl CocoApp {
    pub fn new(name: &str, options: &AppOptions) -> Result<Self, AssemblyError> {
        info!("[App] Assembling {}", name);

        let mut allocator = StoreKeyAllocator::new();
        let keys = StoreKeys::allocate(&mut allocator)?;
        let mut store = MultiStore::new();
        store.mount_all(allocator.issued())?;

        let accounts = Arc::new(keepers::build_module_accounts()?);
        let keepers = AppKeepers::assemble(&keys, Arc::clone(&accounts), options)?;

        let mut builder = ModuleManagerBuilder::new();
        for name in layout::MODULE_NAMES {
            builder.register(keepers.module(name)?)?;
        }
        builder
            .set_order(Phase::InitGenesis, &layout::INIT_GENESIS_ORDER)?
            .set_order(Phase::BeginBlock, &layout::BEGIN_BLOCKERS)?
            .set_order(Phase::EndBlock, &layout::END_BLOCKERS)?;
        let manager = builder.build()?;

        let mut invariants = InvariantRegistry::new();
        manager.register_invariants(&mut invariants)?;
        keepers.crisis.install_invariants(invariants)?;

        {
            let mut ctx = Context::new(&mut store, BlockHeader::default());
            keepers.capability.initialize_and_seal(&mut ctx)?;
        }

        info!(
            "[App] {} assembled: {} modules, {} store keys, {} module accounts",
            name,
            manager.len(),
            allocator.len(),
            accounts.len()
        );
        Ok(Self {
            name: name.to_string(),
            store,
            keys,
            accounts,
            keepers,
            manager,
            chain_id: None,
            current: None,
            stage: BlockStage::Idle,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manager(&self) -> &ModuleManager {
        &self.manager
    }

    pub fn keepers(&self) -> &AppKeepers {
        &self.keepers
    }

    pub fn store_keys(&self) -> &StoreKeys {
        &self.keys
    }

    pub fn chain_id(&self) -> Option<&str> {
        self.chain_id.as_deref()
    }

    /// Height of the last committed block (0 before the first commit).
    pub fn last_block_height(&self) -> u64 {
        self.store.version()
    }

    pub fn block_stage(&self) -> BlockStage {
        self.stage
    }

    pub fn last_app_hash(&self) -> [u8; 32] {
        self.store.last_app_hash()
    }

    /// A copy of the module account permission table.
    pub fn get_macc_perms(&self) -> MaccPerms {
        self.accounts.get_macc_perms()
    }

    pub fn module_account_addrs(&self) -> BTreeSet<AccAddress> {
        self.accounts.module_account_addrs()
    }

    /// Module accounts that ordinary transactions may not credit.
    pub fn blocked_module_addrs(&self) -> BTreeSet<AccAddress> {
        self.accounts.blocked_module_addrs()
    }

    pub fn default_genesis(&self) -> Result<GenesisState, AppError> {
        Ok(self.manager.default_genesis()?)
    }

    /// Run InitGenesis over the app state carried by `req`.
    pub fn init_chain(&mut self, req: &RequestInitChain) -> Result<ResponseInitChain, AppError> {
        if self.chain_id.is_some() {
            return Err(AppError::AlreadyInitialized(self.store.version()));
        }

        let genesis: GenesisState = serde_json::from_slice(&req.app_state_bytes)
            .map_err(|e| AppError::Genesis(e.to_string()))?;
        self.manager.validate_genesis(&genesis)?;
        let consensus_params = match &req.consensus_params {
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|e| AppError::Genesis(format!("consensus params: {e}")))?,
            None => ConsensusParams::default(),
        };

        let header = BlockHeader {
            chain_id: req.chain_id.clone(),
            height: 0,
            time: req.time,
            proposer: String::new(),
        };
        let mut ctx = Context::new(&mut self.store, header);
        consensus::store(&self.keepers.consensus_params, &mut ctx, &consensus_params)
            .map_err(|e| AppError::Genesis(format!("consensus params: {e}")))?;

        let response = self.manager.init_genesis(&mut ctx, &genesis)?;

        // InitChain overrides the genesis history window; the value stays
        // until governance changes it.
        let staking = &self.keepers.staking;
        let mut params = staking.params(&ctx)?;
        params.historical_entries = INIT_CHAIN_HISTORICAL_ENTRIES;
        staking.set_params(&mut ctx, &params)?;

        self.chain_id = Some(req.chain_id.clone());
        info!(
            "[App] InitChain {} complete: {} initial validators",
            req.chain_id,
            response.validators.len()
        );
        Ok(response)
    }

    pub fn begin_block(&mut self, req: &RequestBeginBlock) -> Result<ResponseBeginBlock, AppError> {
        let chain_id = self.chain_id.as_deref().ok_or(AppError::NotInitialized)?;
        if self.stage != BlockStage::Idle {
            return Err(AppError::OutOfOrder {
                call: "BeginBlock",
                stage: self.stage,
            });
        }
        let expected = self.store.version() + 1;
        if req.header.height != expected {
            return Err(AppError::UnexpectedHeight {
                expected,
                got: req.header.height,
            });
        }
        let mut header = req.header.clone();
        if header.chain_id.is_empty() {
            header.chain_id = chain_id.to_string();
        }

        let mut ctx = Context::new(&mut self.store, header.clone());
        let response = self.manager.begin_block(&mut ctx, req)?;
        self.current = Some(header);
        self.stage = BlockStage::Begun;
        Ok(response)
    }

    pub fn end_block(&mut self, req: &RequestEndBlock) -> Result<ResponseEndBlock, AppError> {
        self.chain_id.as_ref().ok_or(AppError::NotInitialized)?;
        let header = match (&self.stage, &self.current) {
            (BlockStage::Begun, Some(header)) => header.clone(),
            _ => {
                return Err(AppError::OutOfOrder {
                    call: "EndBlock",
                    stage: self.stage,
                })
            }
        };
        if req.height != header.height {
            return Err(AppError::UnexpectedHeight {
                expected: header.height,
                got: req.height,
            });
        }
        let mut ctx = Context::new(&mut self.store, header);
        let response = self.manager.end_block(&mut ctx, req)?;
        self.stage = BlockStage::Ended;
        Ok(response)
    }

    /// Commit the block closed by the last EndBlock.
    pub fn commit(&mut self) -> Result<CommitInfo, AppError> {
        if self.stage != BlockStage::Ended {
            return Err(AppError::OutOfOrder {
                call: "Commit",
                stage: self.stage,
            });
        }
        let info = self.store.commit();
        self.current = None;
        self.stage = BlockStage::Idle;
        debug!("[App] Committed height {}", info.version);
        Ok(info)
    }

    /// Run `f` against the working state, as a transaction would.
    ///
    /// Uses the header of the open block, or a header at the last
    /// committed height between blocks.
    pub fn with_context<R>(&mut self, f: impl FnOnce(&mut Context<'_>, &AppKeepers) -> R) -> R {
        let header = self.current.clone().unwrap_or_else(|| BlockHeader {
            chain_id: self.chain_id.clone().unwrap_or_default(),
            height: self.store.version(),
            ..BlockHeader::default()
        });
        let mut ctx = Context::new(&mut self.store, header);
        f(&mut ctx, &self.keepers)
    }

    /// Stored consensus parameters, once InitChain has run.
    pub fn consensus_params(&mut self) -> Result<Option<ConsensusParams>, AppError> {
        let subspace = self.keepers.consensus_params.clone();
        self.with_context(|ctx, _| consensus::load(&subspace, ctx))
            .map_err(|e| AppError::Genesis(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembles_standard_layout() {
        let app = CocoApp::new("CoCo", &AppOptions::default()).unwrap();

        assert_eq!(app.manager().len(), 15);
        assert_eq!(app.manager().order(Phase::BeginBlock), layout::BEGIN_BLOCKERS);
        assert_eq!(app.manager().order(Phase::EndBlock), layout::END_BLOCKERS);
        assert!(app.keepers().capability.is_sealed());
        assert_eq!(app.keepers().crisis.routes().len(), 3);
    }

    #[test]
    fn test_default_genesis_covers_init_order() {
        let app = CocoApp::new("CoCo", &AppOptions::default()).unwrap();
        let genesis = app.default_genesis().unwrap();
        let keys: Vec<&str> = genesis.keys().map(String::as_str).collect();

        assert_eq!(keys.len(), layout::INIT_GENESIS_ORDER.len());
        for name in layout::INIT_GENESIS_ORDER {
            assert!(keys.contains(&name), "no default genesis for {name}");
        }
    }

    #[test]
    fn test_block_before_init_chain_rejected() {
        let mut app = CocoApp::new("CoCo", &AppOptions::default()).unwrap();
        let req = RequestBeginBlock {
            header: BlockHeader {
                height: 1,
                ..BlockHeader::default()
            },
            ..RequestBeginBlock::default()
        };
        assert!(matches!(app.begin_block(&req), Err(AppError::NotInitialized)));
    }
}
