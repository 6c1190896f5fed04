//! # Distribution
//!
//! Moves collected fees into the distribution account every block, keeps
//! the community tax in the community pool and credits the rest to
//! validators by voting power.
//!
//! ## Store Layout
//!
//! ```text
//! community_pool        -> u64
//! rewards/{pub_key}     -> u64 (outstanding, withdrawable)
//! ```

use std::fmt;

use cc_01_store::{Context, StoreKey};
use cc_02_params::domain::validate_u64;
use cc_02_params::{KeyTable, ParamsError, Subspace};
use cc_04_module_manager::{AppModule, InvariantRegistry, ModuleDescriptor, RegistryError};
use cc_06_routing::ProposalHandler;
use serde::{Deserialize, Serialize};
use shared_types::{AccAddress, Event, ModuleError, Phase, RequestBeginBlock, ValidatorUpdate};
use tracing::{debug, info};

use super::bank::{BankKeeper, Coin};
use super::staking::{StakingHooks, StakingKeeper, Validator};
use super::{decode_genesis, encode_genesis, module_error, proposal_handler, FEE_COLLECTOR};

pub const MODULE_NAME: &str = "distribution";
pub const STORE_KEY: &str = "distribution";
/// Governance route for community pool spends.
pub const ROUTE: &str = "distribution";
pub const COMMUNITY_POOL_SPEND: &str = "CommunityPoolSpend";

const KEY_COMMUNITY_TAX: &str = "CommunityTaxBps";
const COMMUNITY_POOL_KEY: &[u8] = b"community_pool";
const REWARDS_PREFIX: &str = "rewards/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionParams {
    /// Share of fees kept by the community pool, in basis points.
    pub community_tax_bps: u64,
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self {
            community_tax_bps: 200,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionGenesis {
    pub params: DistributionParams,
    #[serde(default)]
    pub community_pool: u64,
}

/// Payload of a community pool spend proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityPoolSpend {
    /// Hex recipient address.
    pub recipient: String,
    pub amount: u64,
}

fn validate_tax(value: &serde_json::Value) -> Result<(), String> {
    validate_u64(value)?;
    match value.as_u64() {
        Some(bps) if bps <= 10_000 => Ok(()),
        _ => Err(format!("community tax must be at most 10000 bps, got {value}")),
    }
}

fn key_table() -> Result<KeyTable, ParamsError> {
    KeyTable::new().register(KEY_COMMUNITY_TAX, validate_tax)
}

fn distr_error(err: impl fmt::Display) -> ModuleError {
    module_error(MODULE_NAME, err)
}

#[derive(Debug, Clone)]
pub struct DistributionKeeper {
    store_key: StoreKey,
    subspace: Subspace,
    bank: BankKeeper,
    staking: StakingKeeper,
}

impl DistributionKeeper {
    pub fn new(
        store_key: StoreKey,
        subspace: Subspace,
        bank: BankKeeper,
        staking: StakingKeeper,
    ) -> Result<Self, ParamsError> {
        let subspace = if subspace.has_key_table() {
            subspace
        } else {
            subspace.with_key_table(key_table()?)?
        };
        Ok(Self {
            store_key,
            subspace,
            bank,
            staking,
        })
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<DistributionParams, ModuleError> {
        Ok(DistributionParams {
            community_tax_bps: self
                .subspace
                .get_or(ctx, KEY_COMMUNITY_TAX, DistributionParams::default().community_tax_bps)
                .map_err(distr_error)?,
        })
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &DistributionParams) -> Result<(), ModuleError> {
        self.subspace
            .set(ctx, KEY_COMMUNITY_TAX, &params.community_tax_bps)
            .map_err(distr_error)
    }

    pub fn community_pool(&self, ctx: &Context<'_>) -> Result<u64, ModuleError> {
        Ok(ctx
            .kv(&self.store_key)
            .and_then(|s| s.get_json(COMMUNITY_POOL_KEY))
            .map_err(distr_error)?
            .unwrap_or(0))
    }

    pub fn outstanding_rewards(&self, ctx: &Context<'_>, pub_key: &str) -> Result<u64, ModuleError> {
        Ok(ctx
            .kv(&self.store_key)
            .and_then(|s| s.get_json(&rewards_key(pub_key)))
            .map_err(distr_error)?
            .unwrap_or(0))
    }

    /// Move the fee collector's bond-denom balance into this module and
    /// split it between the community pool and validators.
    pub fn allocate_fees(&self, ctx: &mut Context<'_>) -> Result<u64, ModuleError> {
        let denom = self.staking.bond_denom(ctx)?;
        let collected = self.bank.module_balance(ctx, FEE_COLLECTOR, &denom)?;
        if collected == 0 {
            return Ok(0);
        }
        self.bank.send_from_module_to_module(
            ctx,
            FEE_COLLECTOR,
            MODULE_NAME,
            &Coin::new(denom, collected),
        )?;

        let tax = self.params(ctx)?.community_tax_bps;
        let community = mul_div(collected, tax, 10_000);
        let for_validators = collected - community;

        let validators: Vec<Validator> = self
            .staking
            .validators(ctx)?
            .into_iter()
            .filter(|v| v.power() > 0)
            .collect();
        let total_power: u64 = validators.iter().map(Validator::power).sum();

        let mut distributed = 0;
        if total_power > 0 {
            for validator in &validators {
                let share = mul_div(for_validators, validator.power(), total_power);
                let rewards = self.outstanding_rewards(ctx, &validator.pub_key)? + share;
                self.set_rewards(ctx, &validator.pub_key, rewards)?;
                distributed += share;
            }
        }
        // Rounding dust and rewards with no validators go to the community.
        let pool = self.community_pool(ctx)? + (collected - distributed);
        self.set_community_pool(ctx, pool)?;

        debug!(
            "[Distribution] Allocated {} (validators {}, community {})",
            collected,
            distributed,
            collected - distributed
        );
        Ok(collected)
    }

    /// Pay a validator's outstanding rewards to its operator.
    pub fn withdraw_rewards(&self, ctx: &mut Context<'_>, pub_key: &str) -> Result<u64, ModuleError> {
        let validator = self
            .staking
            .validator(ctx, pub_key)?
            .ok_or_else(|| distr_error(format!("unknown validator {pub_key}")))?;
        let rewards = self.outstanding_rewards(ctx, pub_key)?;
        if rewards == 0 {
            return Ok(0);
        }
        let operator = AccAddress::from_hex(&validator.operator).map_err(distr_error)?;
        let denom = self.staking.bond_denom(ctx)?;
        self.bank
            .send_from_module_to_account(ctx, MODULE_NAME, &operator, &Coin::new(denom, rewards))?;
        self.set_rewards(ctx, pub_key, 0)?;

        ctx.emit(
            Event::new("withdraw_rewards")
                .attr("validator", pub_key)
                .attr("amount", rewards),
        );
        Ok(rewards)
    }

    /// Pay `spend.amount` out of the community pool.
    pub fn distribute_from_community_pool(
        &self,
        ctx: &mut Context<'_>,
        spend: &CommunityPoolSpend,
    ) -> Result<(), ModuleError> {
        let recipient = AccAddress::from_hex(&spend.recipient).map_err(distr_error)?;
        let pool = self.community_pool(ctx)?;
        let remaining = pool.checked_sub(spend.amount).ok_or_else(|| {
            distr_error(format!(
                "community pool has {pool}, cannot spend {}",
                spend.amount
            ))
        })?;
        let denom = self.staking.bond_denom(ctx)?;
        self.bank.send_from_module_to_account(
            ctx,
            MODULE_NAME,
            &recipient,
            &Coin::new(denom, spend.amount),
        )?;
        self.set_community_pool(ctx, remaining)?;

        info!(
            "[Distribution] Community pool spent {} to {}",
            spend.amount, spend.recipient
        );
        Ok(())
    }

    /// Handler for the `distribution` governance route.
    pub fn proposal_handler(&self) -> Box<dyn ProposalHandler> {
        let keeper = self.clone();
        proposal_handler(move |ctx, content| {
            if content.kind != COMMUNITY_POOL_SPEND {
                return Err(distr_error(format!(
                    "unrecognized distribution proposal kind {}",
                    content.kind
                )));
            }
            let spend: CommunityPoolSpend =
                serde_json::from_value(content.payload.clone()).map_err(distr_error)?;
            keeper.distribute_from_community_pool(ctx, &spend)
        })
    }

    /// Outstanding rewards plus the community pool are backed by this
    /// module's balance.
    pub fn check_can_withdraw(&self, ctx: &Context<'_>) -> Result<(), String> {
        let store = ctx.kv(&self.store_key).map_err(|e| e.to_string())?;
        let mut owed = self.community_pool(ctx).map_err(|e| e.to_string())?;
        for (_, raw) in store.iter_prefix(REWARDS_PREFIX.as_bytes()) {
            owed += serde_json::from_slice::<u64>(raw).map_err(|e| e.to_string())?;
        }
        let denom = self.staking.bond_denom(ctx).map_err(|e| e.to_string())?;
        let balance = self
            .bank
            .module_balance(ctx, MODULE_NAME, &denom)
            .map_err(|e| e.to_string())?;
        if owed > balance {
            return Err(format!(
                "distribution owes {owed} but holds only {balance}"
            ));
        }
        Ok(())
    }

    fn set_rewards(&self, ctx: &mut Context<'_>, pub_key: &str, amount: u64) -> Result<(), ModuleError> {
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(&rewards_key(pub_key), &amount))
            .map_err(distr_error)
    }

    fn set_community_pool(&self, ctx: &mut Context<'_>, amount: u64) -> Result<(), ModuleError> {
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(COMMUNITY_POOL_KEY, &amount))
            .map_err(distr_error)
    }
}

fn rewards_key(pub_key: &str) -> Vec<u8> {
    format!("{REWARDS_PREFIX}{pub_key}").into_bytes()
}

fn mul_div(amount: u64, numerator: u64, denominator: u64) -> u64 {
    let product = u128::from(amount) * u128::from(numerator) / u128::from(denominator);
    u64::try_from(product).unwrap_or(u64::MAX)
}

/// Starts a reward record for every new validator.
pub struct DistributionHooks {
    keeper: DistributionKeeper,
}

impl DistributionHooks {
    pub fn new(keeper: DistributionKeeper) -> Self {
        Self { keeper }
    }
}

impl StakingHooks for DistributionHooks {
    fn after_validator_created(
        &self,
        ctx: &mut Context<'_>,
        validator: &Validator,
    ) -> Result<(), ModuleError> {
        self.keeper.set_rewards(ctx, &validator.pub_key, 0)
    }
}

pub struct DistributionModule {
    keeper: DistributionKeeper,
}

impl DistributionModule {
    pub fn new(keeper: DistributionKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for DistributionModule {
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
        let state: DistributionGenesis = decode_genesis(MODULE_NAME, genesis)?;
        self.keeper.set_params(ctx, &state.params)?;
        self.keeper.set_community_pool(ctx, state.community_pool)?;
        Ok(Vec::new())
    }

    fn begin_block(&self, ctx: &mut Context<'_>, _req: &RequestBeginBlock) -> Result<(), ModuleError> {
        self.keeper.allocate_fees(ctx).map(|_| ())
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &DistributionGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        let state: DistributionGenesis = decode_genesis(MODULE_NAME, genesis)?;
        validate_tax(&serde_json::Value::from(state.params.community_tax_bps)).map_err(distr_error)
    }

    fn register_invariants(&self, registry: &mut InvariantRegistry) -> Result<(), RegistryError> {
        let keeper = self.keeper.clone();
        registry.register(MODULE_NAME, "can-withdraw", move |ctx| {
            keeper.check_can_withdraw(ctx)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_rounds_down() {
        assert_eq!(mul_div(1_000, 200, 10_000), 20);
        assert_eq!(mul_div(99, 1, 2), 49);
        assert_eq!(mul_div(u64::MAX, 2, 1), u64::MAX);
    }

    #[test]
    fn test_validate_tax_bounds() {
        assert!(validate_tax(&serde_json::json!(10_000)).is_ok());
        assert!(validate_tax(&serde_json::json!(10_001)).is_err());
        assert!(validate_tax(&serde_json::json!("200")).is_err());
    }
}
