//! # Crisis
//!
//! Runs the invariants registered by other modules: at genesis, every
//! `inv_check_period` blocks, and on demand for a constant fee. A broken
//! invariant fails the phase, which halts the chain.

use std::fmt;
use std::sync::{Arc, OnceLock};

use cc_01_store::Context;
use cc_02_params::{KeyTable, ParamsError, Subspace};
use cc_04_module_manager::{AppModule, InvariantRegistry, ModuleDescriptor};
use serde::{Deserialize, Serialize};
use shared_types::{AccAddress, ModuleError, Phase, RequestEndBlock, ValidatorUpdate, DEFAULT_STAKE_DENOM};
use tracing::{error, info};

use super::bank::{BankKeeper, Coin};
use super::{decode_genesis, encode_genesis, module_error, FEE_COLLECTOR};

pub const MODULE_NAME: &str = "crisis";

const KEY_CONSTANT_FEE: &str = "ConstantFee";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisGenesis {
    /// Fee charged for an on-demand invariant check.
    pub constant_fee: Coin,
}

impl Default for CrisisGenesis {
    fn default() -> Self {
        Self {
            constant_fee: Coin::new(DEFAULT_STAKE_DENOM, 1_000),
        }
    }
}

fn validate_coin(value: &serde_json::Value) -> Result<(), String> {
    let coin: Coin = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    if coin.denom.trim().is_empty() {
        return Err("fee denom must not be empty".to_string());
    }
    Ok(())
}

fn key_table() -> Result<KeyTable, ParamsError> {
    KeyTable::new().register(KEY_CONSTANT_FEE, validate_coin)
}

fn crisis_error(err: impl fmt::Display) -> ModuleError {
    module_error(MODULE_NAME, err)
}

#[derive(Clone)]
pub struct CrisisKeeper {
    subspace: Subspace,
    bank: BankKeeper,
    inv_check_period: u64,
    invariants: Arc<OnceLock<InvariantRegistry>>,
}

impl fmt::Debug for CrisisKeeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrisisKeeper")
            .field("inv_check_period", &self.inv_check_period)
            .field("invariants", &self.invariants.get().map(InvariantRegistry::len))
            .finish()
    }
}

impl CrisisKeeper {
    pub fn new(subspace: Subspace, bank: BankKeeper, inv_check_period: u64) -> Result<Self, ParamsError> {
        let subspace = if subspace.has_key_table() {
            subspace
        } else {
            subspace.with_key_table(key_table()?)?
        };
        Ok(Self {
            subspace,
            bank,
            inv_check_period,
            invariants: Arc::new(OnceLock::new()),
        })
    }

    /// Hand over the invariants collected from every module.
    ///
    /// # Errors
    ///
    /// The registry can only be installed once.
    pub fn install_invariants(&self, registry: InvariantRegistry) -> Result<(), ModuleError> {
        let count = registry.len();
        self.invariants
            .set(registry)
            .map_err(|_| crisis_error("invariants already installed"))?;
        info!("[Crisis] Installed {} invariant routes", count);
        Ok(())
    }

    pub fn inv_check_period(&self) -> u64 {
        self.inv_check_period
    }

    /// `module/route` of every installed invariant.
    pub fn routes(&self) -> Vec<String> {
        self.invariants
            .get()
            .map(InvariantRegistry::route_names)
            .unwrap_or_default()
    }

    pub fn constant_fee(&self, ctx: &Context<'_>) -> Result<Coin, ModuleError> {
        self.subspace
            .get_or(ctx, KEY_CONSTANT_FEE, CrisisGenesis::default().constant_fee)
            .map_err(crisis_error)
    }

    pub fn set_constant_fee(&self, ctx: &mut Context<'_>, fee: &Coin) -> Result<(), ModuleError> {
        self.subspace
            .set(ctx, KEY_CONSTANT_FEE, fee)
            .map_err(crisis_error)
    }

    /// Run every installed invariant.
    pub fn assert_invariants(&self, ctx: &Context<'_>) -> Result<(), ModuleError> {
        let registry = self.registry()?;
        registry.assert_all(ctx).map_err(|broken| {
            error!("[Crisis] Halting: {}", broken);
            crisis_error(broken)
        })
    }

    /// Check one invariant on behalf of `sender`, who pays the constant fee.
    pub fn verify_invariant(
        &self,
        ctx: &mut Context<'_>,
        sender: &AccAddress,
        module: &str,
        route: &str,
    ) -> Result<(), ModuleError> {
        let fee = self.constant_fee(ctx)?;
        self.bank
            .send_from_account_to_module(ctx, sender, FEE_COLLECTOR, &fee)?;

        let result = self
            .registry()?
            .assert_route(ctx, module, route)
            .ok_or_else(|| crisis_error(format!("unknown invariant {module}/{route}")))?;
        result.map_err(|broken| {
            error!("[Crisis] Invariant broken on demand: {}", broken);
            crisis_error(broken)
        })
    }

    fn registry(&self) -> Result<&InvariantRegistry, ModuleError> {
        self.invariants
            .get()
            .ok_or_else(|| crisis_error("invariants not installed"))
    }
}

pub struct CrisisModule {
    keeper: CrisisKeeper,
}

impl CrisisModule {
    pub fn new(keeper: CrisisKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for CrisisModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(MODULE_NAME)
            .with_hooks(&[Phase::InitGenesis, Phase::EndBlock])
            .depends_on(crate::app::layout::dependencies_of(MODULE_NAME))
    }

    fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &serde_json::Value,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        let state: CrisisGenesis = decode_genesis(MODULE_NAME, genesis)?;
        self.keeper.set_constant_fee(ctx, &state.constant_fee)?;
        if self.keeper.inv_check_period != 0 {
            self.keeper.assert_invariants(ctx)?;
        }
        Ok(Vec::new())
    }

    fn end_block(
        &self,
        ctx: &mut Context<'_>,
        req: &RequestEndBlock,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        let period = self.keeper.inv_check_period;
        if period != 0 && req.height % period == 0 {
            self.keeper.assert_invariants(ctx)?;
        }
        Ok(Vec::new())
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &CrisisGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        let state: CrisisGenesis = decode_genesis(MODULE_NAME, genesis)?;
        validate_coin(&encode_genesis(MODULE_NAME, &state.constant_fee)?).map_err(crisis_error)
    }
}
