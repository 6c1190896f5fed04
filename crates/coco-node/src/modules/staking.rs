//! # Staking
//!
//! Validator registry and the source of validator set changes.
//!
//! ## Store Layout
//!
//! ```text
//! validators/{pub_key}        -> Validator
//! updates/{pub_key}           -> u64 (pending power, drained at end block)
//! historical/{height:020}     -> HistoricalInfo
//! ```
//!
//! Bonded tokens live in the `bonded_tokens_pool` module account. Other
//! modules observe validator creation through `StakingHooks`, installed
//! once after every keeper exists.

use std::fmt;
use std::sync::{Arc, OnceLock};

use cc_01_store::{Context, StoreKey};
use cc_02_params::domain::{validate_non_empty_string, validate_positive_u64, validate_u64};
use cc_02_params::{KeyTable, ParamsError, Subspace};
use cc_04_module_manager::{AppModule, InvariantRegistry, ModuleDescriptor, RegistryError};
use serde::{Deserialize, Serialize};
use shared_types::{
    AccAddress, Event, ModuleError, Phase, RequestBeginBlock, RequestEndBlock, ValidatorUpdate,
    DEFAULT_STAKE_DENOM,
};
use tracing::{debug, info};

use super::bank::{BankKeeper, Coin};
use super::{decode_genesis, encode_genesis, module_error, BONDED_POOL};

pub const MODULE_NAME: &str = "staking";
pub const STORE_KEY: &str = "staking";

const KEY_UNBONDING_TIME: &str = "UnbondingTime";
const KEY_MAX_VALIDATORS: &str = "MaxValidators";
const KEY_MAX_ENTRIES: &str = "MaxEntries";
const KEY_HISTORICAL_ENTRIES: &str = "HistoricalEntries";
const KEY_BOND_DENOM: &str = "BondDenom";

const VALIDATORS_PREFIX: &str = "validators/";
const UPDATES_PREFIX: &str = "updates/";
const HISTORICAL_PREFIX: &str = "historical/";

/// Historical entries kept by a freshly initialized chain.
pub const INIT_CHAIN_HISTORICAL_ENTRIES: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    /// Seconds.
    pub unbonding_time: u64,
    pub max_validators: u64,
    pub max_entries: u64,
    pub historical_entries: u64,
    pub bond_denom: String,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            unbonding_time: 60 * 60 * 24 * 21,
            max_validators: 100,
            max_entries: 7,
            historical_entries: 10_000,
            bond_denom: DEFAULT_STAKE_DENOM.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Hex operator address.
    pub operator: String,
    /// Hex consensus key.
    pub pub_key: String,
    pub tokens: u64,
    pub jailed: bool,
}

impl Validator {
    /// Voting power; jailed validators have none.
    pub fn power(&self) -> u64 {
        if self.jailed {
            0
        } else {
            self.tokens
        }
    }

    fn update(&self) -> ValidatorUpdate {
        ValidatorUpdate {
            pub_key: self.pub_key.clone(),
            power: self.power(),
        }
    }
}

/// Validator set snapshot for one height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalInfo {
    pub height: u64,
    pub time: u64,
    pub validators: Vec<ValidatorUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingGenesis {
    pub params: StakingParams,
    #[serde(default)]
    pub validators: Vec<Validator>,
}

impl StakingGenesis {
    pub fn validate(&self) -> Result<(), String> {
        if self.params.bond_denom.trim().is_empty() {
            return Err("bond denom must not be empty".to_string());
        }
        if self.params.max_validators == 0 {
            return Err("max validators must be positive".to_string());
        }
        if self.validators.len() as u64 > self.params.max_validators {
            return Err(format!(
                "{} genesis validators exceed max of {}",
                self.validators.len(),
                self.params.max_validators
            ));
        }
        let mut keys = std::collections::BTreeSet::new();
        for validator in &self.validators {
            AccAddress::from_hex(&validator.operator).map_err(|e| e.to_string())?;
            if !keys.insert(validator.pub_key.as_str()) {
                return Err(format!("duplicate validator {}", validator.pub_key));
            }
        }
        Ok(())
    }
}

/// Observers of validator lifecycle events.
pub trait StakingHooks: Send + Sync {
    fn after_validator_created(
        &self,
        ctx: &mut Context<'_>,
        validator: &Validator,
    ) -> Result<(), ModuleError>;
}

fn key_table() -> Result<KeyTable, ParamsError> {
    KeyTable::new()
        .register(KEY_UNBONDING_TIME, validate_u64)?
        .register(KEY_MAX_VALIDATORS, validate_positive_u64)?
        .register(KEY_MAX_ENTRIES, validate_positive_u64)?
        .register(KEY_HISTORICAL_ENTRIES, validate_u64)?
        .register(KEY_BOND_DENOM, validate_non_empty_string)
}

fn staking_error(err: impl fmt::Display) -> ModuleError {
    module_error(MODULE_NAME, err)
}

type HookList = Vec<Box<dyn StakingHooks>>;

#[derive(Clone)]
pub struct StakingKeeper {
    store_key: StoreKey,
    subspace: Subspace,
    bank: BankKeeper,
    hooks: Arc<OnceLock<HookList>>,
}

impl fmt::Debug for StakingKeeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StakingKeeper")
            .field("store_key", &self.store_key)
            .field("hooks", &self.hooks.get().map(Vec::len))
            .finish()
    }
}

impl StakingKeeper {
    pub fn new(store_key: StoreKey, subspace: Subspace, bank: BankKeeper) -> Result<Self, ParamsError> {
        let subspace = if subspace.has_key_table() {
            subspace
        } else {
            subspace.with_key_table(key_table()?)?
        };
        Ok(Self {
            store_key,
            subspace,
            bank,
            hooks: Arc::new(OnceLock::new()),
        })
    }

    /// Install the hook observers. Shared by every clone of this keeper.
    ///
    /// # Errors
    ///
    /// Hooks can only be set once.
    pub fn set_hooks(&self, hooks: HookList) -> Result<(), ModuleError> {
        let count = hooks.len();
        self.hooks
            .set(hooks)
            .map_err(|_| staking_error("cannot set staking hooks twice"))?;
        info!("[Staking] Installed {} hook observers", count);
        Ok(())
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<StakingParams, ModuleError> {
        let d = StakingParams::default();
        let s = &self.subspace;
        Ok(StakingParams {
            unbonding_time: s.get_or(ctx, KEY_UNBONDING_TIME, d.unbonding_time).map_err(staking_error)?,
            max_validators: s.get_or(ctx, KEY_MAX_VALIDATORS, d.max_validators).map_err(staking_error)?,
            max_entries: s.get_or(ctx, KEY_MAX_ENTRIES, d.max_entries).map_err(staking_error)?,
            historical_entries: s
                .get_or(ctx, KEY_HISTORICAL_ENTRIES, d.historical_entries)
                .map_err(staking_error)?,
            bond_denom: s.get_or(ctx, KEY_BOND_DENOM, d.bond_denom).map_err(staking_error)?,
        })
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &StakingParams) -> Result<(), ModuleError> {
        let s = &self.subspace;
        s.set(ctx, KEY_UNBONDING_TIME, &params.unbonding_time)
            .and_then(|_| s.set(ctx, KEY_MAX_VALIDATORS, &params.max_validators))
            .and_then(|_| s.set(ctx, KEY_MAX_ENTRIES, &params.max_entries))
            .and_then(|_| s.set(ctx, KEY_HISTORICAL_ENTRIES, &params.historical_entries))
            .and_then(|_| s.set(ctx, KEY_BOND_DENOM, &params.bond_denom))
            .map_err(staking_error)
    }

    pub fn bond_denom(&self, ctx: &Context<'_>) -> Result<String, ModuleError> {
        Ok(self.params(ctx)?.bond_denom)
    }

    pub fn validator(&self, ctx: &Context<'_>, pub_key: &str) -> Result<Option<Validator>, ModuleError> {
        ctx.kv(&self.store_key)
            .and_then(|s| s.get_json(&validator_key(pub_key)))
            .map_err(staking_error)
    }

    /// All validators in key order.
    pub fn validators(&self, ctx: &Context<'_>) -> Result<Vec<Validator>, ModuleError> {
        let store = ctx.kv(&self.store_key).map_err(staking_error)?;
        store
            .iter_prefix(VALIDATORS_PREFIX.as_bytes())
            .map(|(_, raw)| serde_json::from_slice(raw).map_err(staking_error))
            .collect()
    }

    pub fn total_power(&self, ctx: &Context<'_>) -> Result<u64, ModuleError> {
        Ok(self.validators(ctx)?.iter().map(Validator::power).sum())
    }

    /// Bond `self_bond` from `operator` into a new validator.
    pub fn create_validator(
        &self,
        ctx: &mut Context<'_>,
        operator: &AccAddress,
        pub_key: &str,
        self_bond: u64,
    ) -> Result<Validator, ModuleError> {
        if pub_key.trim().is_empty() {
            return Err(staking_error("validator pub key must not be empty"));
        }
        if self_bond == 0 {
            return Err(staking_error("self bond must be positive"));
        }
        if self.validator(ctx, pub_key)?.is_some() {
            return Err(staking_error(format!("validator {pub_key} already exists")));
        }
        let params = self.params(ctx)?;
        let active = self.validators(ctx)?.iter().filter(|v| !v.jailed).count() as u64;
        if active >= params.max_validators {
            return Err(staking_error(format!(
                "validator set is full ({} validators)",
                params.max_validators
            )));
        }

        self.bank.send_from_account_to_module(
            ctx,
            operator,
            BONDED_POOL,
            &Coin::new(params.bond_denom, self_bond),
        )?;

        let validator = Validator {
            operator: operator.to_string(),
            pub_key: pub_key.to_string(),
            tokens: self_bond,
            jailed: false,
        };
        self.store_validator(ctx, &validator)?;
        self.queue_update(ctx, &validator)?;

        if let Some(hooks) = self.hooks.get() {
            for hook in hooks {
                hook.after_validator_created(ctx, &validator)?;
            }
        }

        info!("[Staking] Validator {} created with {} tokens", pub_key, self_bond);
        ctx.emit(
            Event::new("create_validator")
                .attr("validator", pub_key)
                .attr("amount", self_bond),
        );
        Ok(validator)
    }

    /// Remove a validator from the active set until unjailed.
    pub fn jail(&self, ctx: &mut Context<'_>, pub_key: &str) -> Result<(), ModuleError> {
        let mut validator = self
            .validator(ctx, pub_key)?
            .ok_or_else(|| staking_error(format!("unknown validator {pub_key}")))?;
        if validator.jailed {
            return Ok(());
        }
        validator.jailed = true;
        self.store_validator(ctx, &validator)?;
        self.queue_update(ctx, &validator)?;

        info!("[Staking] Validator {} jailed", pub_key);
        ctx.emit(Event::new("jail").attr("validator", pub_key));
        Ok(())
    }

    pub fn unjail(&self, ctx: &mut Context<'_>, pub_key: &str) -> Result<(), ModuleError> {
        let mut validator = self
            .validator(ctx, pub_key)?
            .ok_or_else(|| staking_error(format!("unknown validator {pub_key}")))?;
        if !validator.jailed {
            return Err(staking_error(format!("validator {pub_key} is not jailed")));
        }
        validator.jailed = false;
        self.store_validator(ctx, &validator)?;
        self.queue_update(ctx, &validator)
    }

    /// Drain pending power changes in key order.
    pub fn apply_and_return_updates(
        &self,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        let store = ctx.kv_mut(&self.store_key).map_err(staking_error)?;
        let mut keys = Vec::new();
        let mut updates = Vec::new();
        for (key, raw) in store.iter_prefix(UPDATES_PREFIX.as_bytes()) {
            updates.push(ValidatorUpdate {
                pub_key: String::from_utf8_lossy(&key[UPDATES_PREFIX.len()..]).into_owned(),
                power: serde_json::from_slice(raw).map_err(staking_error)?,
            });
            keys.push(key.to_vec());
        }
        for key in keys {
            store.delete(&key);
        }
        Ok(updates)
    }

    pub fn historical_info(
        &self,
        ctx: &Context<'_>,
        height: u64,
    ) -> Result<Option<HistoricalInfo>, ModuleError> {
        ctx.kv(&self.store_key)
            .and_then(|s| s.get_json(&historical_key(height)))
            .map_err(staking_error)
    }

    /// Snapshot the validator set at the current height and prune entries
    /// beyond the retention window.
    pub fn track_historical_info(&self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        let entries = self.params(ctx)?.historical_entries;
        let height = ctx.block_height();

        let stale: Vec<Vec<u8>> = {
            let store = ctx.kv(&self.store_key).map_err(staking_error)?;
            store
                .iter_prefix(HISTORICAL_PREFIX.as_bytes())
                .map(|(k, _)| k.to_vec())
                .filter(|k| {
                    let h: u64 = String::from_utf8_lossy(&k[HISTORICAL_PREFIX.len()..])
                        .parse()
                        .unwrap_or(0);
                    entries == 0 || h + entries <= height
                })
                .collect()
        };
        let store = ctx.kv_mut(&self.store_key).map_err(staking_error)?;
        for key in stale {
            store.delete(&key);
        }
        if entries == 0 {
            return Ok(());
        }

        let info = HistoricalInfo {
            height,
            time: ctx.header().time,
            validators: self
                .validators(ctx)?
                .iter()
                .filter(|v| !v.jailed)
                .map(Validator::update)
                .collect(),
        };
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(&historical_key(height), &info))
            .map_err(staking_error)
    }

    /// Sum of validator tokens equals the bonded pool balance.
    pub fn check_bonded_tokens(&self, ctx: &Context<'_>) -> Result<(), String> {
        let denom = self.bond_denom(ctx).map_err(|e| e.to_string())?;
        let tokens: u64 = self
            .validators(ctx)
            .map_err(|e| e.to_string())?
            .iter()
            .map(|v| v.tokens)
            .sum();
        let pool = self
            .bank
            .module_balance(ctx, BONDED_POOL, &denom)
            .map_err(|e| e.to_string())?;
        if tokens != pool {
            return Err(format!(
                "validator tokens {tokens} do not match bonded pool balance {pool}"
            ));
        }
        Ok(())
    }

    fn store_validator(&self, ctx: &mut Context<'_>, validator: &Validator) -> Result<(), ModuleError> {
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(&validator_key(&validator.pub_key), validator))
            .map_err(staking_error)
    }

    fn queue_update(&self, ctx: &mut Context<'_>, validator: &Validator) -> Result<(), ModuleError> {
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(&update_key(&validator.pub_key), &validator.power()))
            .map_err(staking_error)
    }
}

fn validator_key(pub_key: &str) -> Vec<u8> {
    format!("{VALIDATORS_PREFIX}{pub_key}").into_bytes()
}

fn update_key(pub_key: &str) -> Vec<u8> {
    format!("{UPDATES_PREFIX}{pub_key}").into_bytes()
}

fn historical_key(height: u64) -> Vec<u8> {
    format!("{HISTORICAL_PREFIX}{height:020}").into_bytes()
}

pub struct StakingModule {
    keeper: StakingKeeper,
}

impl StakingModule {
    pub fn new(keeper: StakingKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for StakingModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(MODULE_NAME)
            .with_hooks(&[Phase::InitGenesis, Phase::BeginBlock, Phase::EndBlock])
            .depends_on(crate::app::layout::dependencies_of(MODULE_NAME))
    }

    fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &serde_json::Value,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        let state: StakingGenesis = decode_genesis(MODULE_NAME, genesis)?;
        state.validate().map_err(staking_error)?;
        self.keeper.set_params(ctx, &state.params)?;

        for validator in &state.validators {
            self.keeper.store_validator(ctx, validator)?;
        }
        debug!("[Staking] Genesis: {} validators", state.validators.len());
        Ok(state
            .validators
            .iter()
            .filter(|v| v.power() > 0)
            .map(Validator::update)
            .collect())
    }

    fn begin_block(&self, ctx: &mut Context<'_>, _req: &RequestBeginBlock) -> Result<(), ModuleError> {
        self.keeper.track_historical_info(ctx)
    }

    fn end_block(
        &self,
        ctx: &mut Context<'_>,
        _req: &RequestEndBlock,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        self.keeper.apply_and_return_updates(ctx)
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &StakingGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        decode_genesis::<StakingGenesis>(MODULE_NAME, genesis)?
            .validate()
            .map_err(staking_error)
    }

    fn register_invariants(&self, registry: &mut InvariantRegistry) -> Result<(), RegistryError> {
        let keeper = self.keeper.clone();
        registry.register(MODULE_NAME, "bonded-tokens", move |ctx| {
            keeper.check_bonded_tokens(ctx)
        })
    }
}
