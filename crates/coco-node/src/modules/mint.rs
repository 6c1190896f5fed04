//! # Mint
//!
//! Inflation. Every block with a non-empty validator set mints a provision
//! proportional to the current supply and forwards it to the fee collector.

use std::fmt;

use cc_01_store::{Context, StoreKey};
use cc_02_params::domain::{validate_non_empty_string, validate_positive_u64, validate_u64};
use cc_02_params::{KeyTable, ParamsError, Subspace};
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use serde::{Deserialize, Serialize};
use shared_types::{Event, ModuleError, Phase, RequestBeginBlock, ValidatorUpdate, DEFAULT_STAKE_DENOM};
use tracing::debug;

use super::bank::{BankKeeper, Coin};
use super::staking::StakingKeeper;
use super::{decode_genesis, encode_genesis, module_error, FEE_COLLECTOR};

pub const MODULE_NAME: &str = "mint";
pub const STORE_KEY: &str = "mint";

const KEY_MINT_DENOM: &str = "MintDenom";
const KEY_INFLATION_BPS: &str = "InflationBps";
const KEY_BLOCKS_PER_YEAR: &str = "BlocksPerYear";
const MINTED_KEY: &[u8] = b"minted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintParams {
    pub mint_denom: String,
    /// Annual inflation in basis points.
    pub inflation_bps: u64,
    pub blocks_per_year: u64,
}

impl Default for MintParams {
    fn default() -> Self {
        Self {
            mint_denom: DEFAULT_STAKE_DENOM.to_string(),
            inflation_bps: 1_300,
            blocks_per_year: 60 * 60 * 8766 / 5,
        }
    }
}

impl MintParams {
    /// Coins minted for one block at `supply`.
    pub fn block_provision(&self, supply: u64) -> u64 {
        if self.blocks_per_year == 0 {
            return 0;
        }
        let annual = u128::from(supply) * u128::from(self.inflation_bps) / 10_000;
        u64::try_from(annual / u128::from(self.blocks_per_year)).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintGenesis {
    pub params: MintParams,
}

fn key_table() -> Result<KeyTable, ParamsError> {
    KeyTable::new()
        .register(KEY_MINT_DENOM, validate_non_empty_string)?
        .register(KEY_INFLATION_BPS, validate_u64)?
        .register(KEY_BLOCKS_PER_YEAR, validate_positive_u64)
}

fn mint_error(err: impl fmt::Display) -> ModuleError {
    module_error(MODULE_NAME, err)
}

#[derive(Debug, Clone)]
pub struct MintKeeper {
    store_key: StoreKey,
    subspace: Subspace,
    staking: StakingKeeper,
    bank: BankKeeper,
}

impl MintKeeper {
    pub fn new(
        store_key: StoreKey,
        subspace: Subspace,
        staking: StakingKeeper,
        bank: BankKeeper,
    ) -> Result<Self, ParamsError> {
        let subspace = if subspace.has_key_table() {
            subspace
        } else {
            subspace.with_key_table(key_table()?)?
        };
        Ok(Self {
            store_key,
            subspace,
            staking,
            bank,
        })
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<MintParams, ModuleError> {
        let d = MintParams::default();
        let s = &self.subspace;
        Ok(MintParams {
            mint_denom: s.get_or(ctx, KEY_MINT_DENOM, d.mint_denom).map_err(mint_error)?,
            inflation_bps: s.get_or(ctx, KEY_INFLATION_BPS, d.inflation_bps).map_err(mint_error)?,
            blocks_per_year: s
                .get_or(ctx, KEY_BLOCKS_PER_YEAR, d.blocks_per_year)
                .map_err(mint_error)?,
        })
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &MintParams) -> Result<(), ModuleError> {
        let s = &self.subspace;
        s.set(ctx, KEY_MINT_DENOM, &params.mint_denom)
            .and_then(|_| s.set(ctx, KEY_INFLATION_BPS, &params.inflation_bps))
            .and_then(|_| s.set(ctx, KEY_BLOCKS_PER_YEAR, &params.blocks_per_year))
            .map_err(mint_error)
    }

    /// Total minted since genesis.
    pub fn minted(&self, ctx: &Context<'_>) -> Result<u64, ModuleError> {
        Ok(ctx
            .kv(&self.store_key)
            .and_then(|s| s.get_json(MINTED_KEY))
            .map_err(mint_error)?
            .unwrap_or(0))
    }

    /// Mint this block's provision into the fee collector.
    ///
    /// Returns the amount minted.
    pub fn mint_block_provision(&self, ctx: &mut Context<'_>) -> Result<u64, ModuleError> {
        if self.staking.total_power(ctx)? == 0 {
            return Ok(0);
        }
        let params = self.params(ctx)?;
        let supply = self.bank.supply(ctx, &params.mint_denom)?;
        let amount = params.block_provision(supply);
        if amount == 0 {
            return Ok(0);
        }

        let coin = Coin::new(params.mint_denom, amount);
        self.bank.mint_coins(ctx, MODULE_NAME, &coin)?;
        self.bank
            .send_from_module_to_module(ctx, MODULE_NAME, FEE_COLLECTOR, &coin)?;

        let minted = self.minted(ctx)?.saturating_add(amount);
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(MINTED_KEY, &minted))
            .map_err(mint_error)?;

        debug!("[Mint] Block {} provision {}", ctx.block_height(), coin);
        ctx.emit(
            Event::new(MODULE_NAME)
                .attr("amount", amount)
                .attr("height", ctx.block_height()),
        );
        Ok(amount)
    }
}

pub struct MintModule {
    keeper: MintKeeper,
}

impl MintModule {
    pub fn new(keeper: MintKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for MintModule {
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
        let state: MintGenesis = decode_genesis(MODULE_NAME, genesis)?;
        self.keeper.set_params(ctx, &state.params)?;
        Ok(Vec::new())
    }

    fn begin_block(&self, ctx: &mut Context<'_>, _req: &RequestBeginBlock) -> Result<(), ModuleError> {
        self.keeper.mint_block_provision(ctx).map(|_| ())
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &MintGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        let state: MintGenesis = decode_genesis(MODULE_NAME, genesis)?;
        if state.params.mint_denom.trim().is_empty() || state.params.blocks_per_year == 0 {
            return Err(mint_error("mint denom and blocks per year must be set"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_provision() {
        let params = MintParams {
            mint_denom: "coco".to_string(),
            inflation_bps: 1_000,
            blocks_per_year: 10,
        };
        assert_eq!(params.block_provision(1_000_000), 10_000);
        assert_eq!(params.block_provision(0), 0);
    }

    #[test]
    fn test_block_provision_does_not_overflow() {
        let params = MintParams {
            inflation_bps: 10_000,
            blocks_per_year: 1,
            ..MintParams::default()
        };
        assert_eq!(params.block_provision(u64::MAX), u64::MAX);
    }
}
