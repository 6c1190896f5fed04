//! # Slashing
//!
//! Liveness tracking. Counts missed blocks per validator over a window and
//! jails validators that miss too many; tombstones double signers reported
//! by evidence.

use std::fmt;

use cc_01_store::{Context, StoreKey};
use cc_02_params::domain::{validate_positive_u64, validate_u64};
use cc_02_params::{KeyTable, ParamsError, Subspace};
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use serde::{Deserialize, Serialize};
use shared_types::{Event, ModuleError, Phase, RequestBeginBlock, ValidatorUpdate};
use tracing::{debug, warn};

use super::staking::{StakingHooks, StakingKeeper, Validator};
use super::{decode_genesis, encode_genesis, module_error};

pub const MODULE_NAME: &str = "slashing";
pub const STORE_KEY: &str = "slashing";

const KEY_SIGNED_BLOCKS_WINDOW: &str = "SignedBlocksWindow";
const KEY_MIN_SIGNED_BPS: &str = "MinSignedPerWindowBps";
const SIGNING_INFO_PREFIX: &str = "signing_info/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingParams {
    pub signed_blocks_window: u64,
    /// Minimum share of the window a validator must sign, in basis points.
    pub min_signed_per_window_bps: u64,
}

impl Default for SlashingParams {
    fn default() -> Self {
        Self {
            signed_blocks_window: 100,
            min_signed_per_window_bps: 5_000,
        }
    }
}

impl SlashingParams {
    /// Misses tolerated within one window.
    pub fn max_missed_blocks(&self) -> u64 {
        let min_signed = self.signed_blocks_window * self.min_signed_per_window_bps / 10_000;
        self.signed_blocks_window - min_signed.min(self.signed_blocks_window)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningInfo {
    pub start_height: u64,
    /// Blocks observed in the current window.
    pub index_offset: u64,
    pub missed_blocks_counter: u64,
    pub tombstoned: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingGenesis {
    pub params: SlashingParams,
}

fn key_table() -> Result<KeyTable, ParamsError> {
    KeyTable::new()
        .register(KEY_SIGNED_BLOCKS_WINDOW, validate_positive_u64)?
        .register(KEY_MIN_SIGNED_BPS, validate_u64)
}

fn slashing_error(err: impl fmt::Display) -> ModuleError {
    module_error(MODULE_NAME, err)
}

#[derive(Debug, Clone)]
pub struct SlashingKeeper {
    store_key: StoreKey,
    subspace: Subspace,
    staking: StakingKeeper,
}

impl SlashingKeeper {
    pub fn new(store_key: StoreKey, subspace: Subspace, staking: StakingKeeper) -> Result<Self, ParamsError> {
        let subspace = if subspace.has_key_table() {
            subspace
        } else {
            subspace.with_key_table(key_table()?)?
        };
        Ok(Self {
            store_key,
            subspace,
            staking,
        })
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<SlashingParams, ModuleError> {
        let d = SlashingParams::default();
        Ok(SlashingParams {
            signed_blocks_window: self
                .subspace
                .get_or(ctx, KEY_SIGNED_BLOCKS_WINDOW, d.signed_blocks_window)
                .map_err(slashing_error)?,
            min_signed_per_window_bps: self
                .subspace
                .get_or(ctx, KEY_MIN_SIGNED_BPS, d.min_signed_per_window_bps)
                .map_err(slashing_error)?,
        })
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &SlashingParams) -> Result<(), ModuleError> {
        self.subspace
            .set(ctx, KEY_SIGNED_BLOCKS_WINDOW, &params.signed_blocks_window)
            .and_then(|_| {
                self.subspace
                    .set(ctx, KEY_MIN_SIGNED_BPS, &params.min_signed_per_window_bps)
            })
            .map_err(slashing_error)
    }

    pub fn signing_info(&self, ctx: &Context<'_>, pub_key: &str) -> Result<Option<SigningInfo>, ModuleError> {
        ctx.kv(&self.store_key)
            .and_then(|s| s.get_json(&signing_info_key(pub_key)))
            .map_err(slashing_error)
    }

    /// Record one block of liveness for every active validator.
    pub fn handle_validator_signatures(
        &self,
        ctx: &mut Context<'_>,
        missed: &[String],
    ) -> Result<(), ModuleError> {
        let params = self.params(ctx)?;
        let max_missed = params.max_missed_blocks();

        for validator in self.staking.validators(ctx)? {
            if validator.power() == 0 {
                continue;
            }
            let mut info = self
                .signing_info(ctx, &validator.pub_key)?
                .unwrap_or_else(|| SigningInfo {
                    start_height: ctx.block_height(),
                    ..SigningInfo::default()
                });

            if info.index_offset % params.signed_blocks_window == 0 {
                info.missed_blocks_counter = 0;
            }
            info.index_offset += 1;
            if missed.iter().any(|k| *k == validator.pub_key) {
                info.missed_blocks_counter += 1;
                debug!(
                    "[Slashing] {} missed block {} ({} in window)",
                    validator.pub_key,
                    ctx.block_height(),
                    info.missed_blocks_counter
                );
            }

            if info.missed_blocks_counter > max_missed {
                warn!(
                    "[Slashing] Jailing {} for downtime at height {}",
                    validator.pub_key,
                    ctx.block_height()
                );
                self.staking.jail(ctx, &validator.pub_key)?;
                ctx.emit(
                    Event::new("liveness")
                        .attr("validator", &validator.pub_key)
                        .attr("missed_blocks", info.missed_blocks_counter),
                );
                info.missed_blocks_counter = 0;
                info.index_offset = 0;
            }
            self.set_signing_info(ctx, &validator.pub_key, &info)?;
        }
        Ok(())
    }

    /// Jail and permanently tombstone a validator caught double signing.
    pub fn handle_double_sign(&self, ctx: &mut Context<'_>, pub_key: &str) -> Result<(), ModuleError> {
        let mut info = self.signing_info(ctx, pub_key)?.unwrap_or_default();
        if info.tombstoned {
            return Ok(());
        }
        self.staking.jail(ctx, pub_key)?;
        info.tombstoned = true;
        self.set_signing_info(ctx, pub_key, &info)?;

        warn!("[Slashing] Tombstoned {} for double signing", pub_key);
        ctx.emit(Event::new("double_sign").attr("validator", pub_key));
        Ok(())
    }

    fn set_signing_info(
        &self,
        ctx: &mut Context<'_>,
        pub_key: &str,
        info: &SigningInfo,
    ) -> Result<(), ModuleError> {
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(&signing_info_key(pub_key), info))
            .map_err(slashing_error)
    }
}

fn signing_info_key(pub_key: &str) -> Vec<u8> {
    format!("{SIGNING_INFO_PREFIX}{pub_key}").into_bytes()
}

/// Opens a signing record for every new validator.
pub struct SlashingHooks {
    keeper: SlashingKeeper,
}

impl SlashingHooks {
    pub fn new(keeper: SlashingKeeper) -> Self {
        Self { keeper }
    }
}

impl StakingHooks for SlashingHooks {
    fn after_validator_created(
        &self,
        ctx: &mut Context<'_>,
        validator: &Validator,
    ) -> Result<(), ModuleError> {
        let info = SigningInfo {
            start_height: ctx.block_height(),
            ..SigningInfo::default()
        };
        self.keeper.set_signing_info(ctx, &validator.pub_key, &info)
    }
}

pub struct SlashingModule {
    keeper: SlashingKeeper,
}

impl SlashingModule {
    pub fn new(keeper: SlashingKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for SlashingModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(MODULE_NAME)
            .with_hooks(&[Phase::InitGenesis, Phase::BeginBlock])
            .depends_on(crate::app::layout::dependencies_of(MODULE_NAME))
    }

    fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &serde_json::Value,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        let state: SlashingGenesis = decode_genesis(MODULE_NAME, genesis)?;
        self.keeper.set_params(ctx, &state.params)?;
        Ok(Vec::new())
    }

    fn begin_block(&self, ctx: &mut Context<'_>, req: &RequestBeginBlock) -> Result<(), ModuleError> {
        self.keeper
            .handle_validator_signatures(ctx, &req.missed_validators)
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &SlashingGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        let state: SlashingGenesis = decode_genesis(MODULE_NAME, genesis)?;
        if state.params.signed_blocks_window == 0 {
            return Err(slashing_error("signed blocks window must be positive"));
        }
        if state.params.min_signed_per_window_bps > 10_000 {
            return Err(slashing_error("min signed per window exceeds 10000 bps"));
        }
        Ok(())
    }
}
