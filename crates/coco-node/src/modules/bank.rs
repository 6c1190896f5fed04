//! # Bank
//!
//! Multi-denomination balances and total supply.
//!
//! ## Store Layout
//!
//! ```text
//! balances/{address}/{denom}  -> u64
//! supply/{denom}              -> u64
//! ```
//!
//! Module accounts are addressed by name. Minting and burning check the
//! permission table; sends to blocked module addresses are refused.

use std::collections::BTreeMap;
use std::fmt;

use cc_01_store::{Context, StoreKey};
use cc_02_params::{KeyTable, ParamsError, Subspace};
use cc_04_module_manager::{AppModule, InvariantRegistry, ModuleDescriptor, RegistryError};
use cc_05_module_accounts::Permission;
use serde::{Deserialize, Serialize};
use shared_types::{AccAddress, Event, ModuleError, Phase, ValidatorUpdate};
use tracing::debug;

use super::auth::AuthKeeper;
use super::{decode_genesis, encode_genesis, module_error};

pub const MODULE_NAME: &str = "bank";
pub const STORE_KEY: &str = "bank";

const KEY_DEFAULT_SEND_ENABLED: &str = "DefaultSendEnabled";
const BALANCES_PREFIX: &str = "balances/";
const SUPPLY_PREFIX: &str = "supply/";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u64,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankParams {
    pub default_send_enabled: bool,
}

impl Default for BankParams {
    fn default() -> Self {
        Self {
            default_send_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Hex address.
    pub address: String,
    pub coins: Vec<Coin>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankGenesis {
    pub params: BankParams,
    pub balances: Vec<Balance>,
    /// Expected total supply. Empty means "sum of balances".
    #[serde(default)]
    pub supply: Vec<Coin>,
}

impl BankGenesis {
    pub fn validate(&self) -> Result<(), String> {
        let mut computed: BTreeMap<&str, u64> = BTreeMap::new();
        for balance in &self.balances {
            AccAddress::from_hex(&balance.address).map_err(|e| e.to_string())?;
            for coin in &balance.coins {
                if coin.denom.trim().is_empty() {
                    return Err(format!("empty denom in balance of {}", balance.address));
                }
                let total = computed.entry(coin.denom.as_str()).or_default();
                *total = total
                    .checked_add(coin.amount)
                    .ok_or_else(|| format!("supply overflow for {}", coin.denom))?;
            }
        }
        if self.supply.is_empty() {
            return Ok(());
        }
        for coin in &self.supply {
            let have = computed.get(coin.denom.as_str()).copied().unwrap_or(0);
            if have != coin.amount {
                return Err(format!(
                    "genesis supply {} does not match balances {}{}",
                    coin, have, coin.denom
                ));
            }
        }
        Ok(())
    }
}

fn validate_bool(value: &serde_json::Value) -> Result<(), String> {
    match value.as_bool() {
        Some(_) => Ok(()),
        None => Err(format!("expected bool, got {value}")),
    }
}

fn key_table() -> Result<KeyTable, ParamsError> {
    KeyTable::new().register(KEY_DEFAULT_SEND_ENABLED, validate_bool)
}

fn bank_error(err: impl fmt::Display) -> ModuleError {
    module_error(MODULE_NAME, err)
}

#[derive(Debug, Clone)]
pub struct BankKeeper {
    store_key: StoreKey,
    subspace: Subspace,
    auth: AuthKeeper,
}

impl BankKeeper {
    pub fn new(store_key: StoreKey, subspace: Subspace, auth: AuthKeeper) -> Result<Self, ParamsError> {
        let subspace = if subspace.has_key_table() {
            subspace
        } else {
            subspace.with_key_table(key_table()?)?
        };
        Ok(Self {
            store_key,
            subspace,
            auth,
        })
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<BankParams, ModuleError> {
        Ok(BankParams {
            default_send_enabled: self
                .subspace
                .get_or(ctx, KEY_DEFAULT_SEND_ENABLED, true)
                .map_err(bank_error)?,
        })
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &BankParams) -> Result<(), ModuleError> {
        self.subspace
            .set(ctx, KEY_DEFAULT_SEND_ENABLED, &params.default_send_enabled)
            .map_err(bank_error)
    }

    pub fn balance(&self, ctx: &Context<'_>, addr: &AccAddress, denom: &str) -> Result<u64, ModuleError> {
        Ok(ctx
            .kv(&self.store_key)
            .and_then(|s| s.get_json(&balance_key(addr, denom)))
            .map_err(bank_error)?
            .unwrap_or(0))
    }

    /// Balance of the module account `module`.
    pub fn module_balance(&self, ctx: &Context<'_>, module: &str, denom: &str) -> Result<u64, ModuleError> {
        let addr = self.module_address(module)?;
        self.balance(ctx, &addr, denom)
    }

    pub fn all_balances(
        &self,
        ctx: &Context<'_>,
        addr: &AccAddress,
    ) -> Result<BTreeMap<String, u64>, ModuleError> {
        let store = ctx.kv(&self.store_key).map_err(bank_error)?;
        let prefix = format!("{BALANCES_PREFIX}{addr}/");
        let mut balances = BTreeMap::new();
        for (key, value) in store.iter_prefix(prefix.as_bytes()) {
            let denom = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            let amount: u64 = serde_json::from_slice(value).map_err(bank_error)?;
            balances.insert(denom, amount);
        }
        Ok(balances)
    }

    pub fn supply(&self, ctx: &Context<'_>, denom: &str) -> Result<u64, ModuleError> {
        Ok(ctx
            .kv(&self.store_key)
            .and_then(|s| s.get_json(&supply_key(denom)))
            .map_err(bank_error)?
            .unwrap_or(0))
    }

    pub fn total_supply(&self, ctx: &Context<'_>) -> Result<BTreeMap<String, u64>, ModuleError> {
        let store = ctx.kv(&self.store_key).map_err(bank_error)?;
        let mut supply = BTreeMap::new();
        for (key, value) in store.iter_prefix(SUPPLY_PREFIX.as_bytes()) {
            let denom = String::from_utf8_lossy(&key[SUPPLY_PREFIX.len()..]).into_owned();
            supply.insert(denom, serde_json::from_slice(value).map_err(bank_error)?);
        }
        Ok(supply)
    }

    /// Move `coin` between two accounts.
    pub fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &AccAddress,
        to: &AccAddress,
        coin: &Coin,
    ) -> Result<(), ModuleError> {
        if !self.params(ctx)?.default_send_enabled {
            return Err(bank_error("sends are disabled"));
        }
        self.sub_balance(ctx, from, coin)?;
        self.add_balance(ctx, to, coin)?;
        self.auth.ensure_account(ctx, to)?;

        ctx.emit(
            Event::new("transfer")
                .attr("sender", from)
                .attr("recipient", to)
                .attr("amount", coin),
        );
        Ok(())
    }

    /// Pay out of a module account.
    ///
    /// # Errors
    ///
    /// Refused when the recipient is a blocked module address.
    pub fn send_from_module_to_account(
        &self,
        ctx: &mut Context<'_>,
        module: &str,
        to: &AccAddress,
        coin: &Coin,
    ) -> Result<(), ModuleError> {
        if self.auth.module_accounts().is_blocked(to) {
            return Err(bank_error(format!("{to} is not allowed to receive funds")));
        }
        let from = self.module_address(module)?;
        self.send_coins(ctx, &from, to, coin)
    }

    pub fn send_from_account_to_module(
        &self,
        ctx: &mut Context<'_>,
        from: &AccAddress,
        module: &str,
        coin: &Coin,
    ) -> Result<(), ModuleError> {
        let to = self.module_address(module)?;
        self.send_coins(ctx, from, &to, coin)
    }

    pub fn send_from_module_to_module(
        &self,
        ctx: &mut Context<'_>,
        from: &str,
        to: &str,
        coin: &Coin,
    ) -> Result<(), ModuleError> {
        let from = self.module_address(from)?;
        let to = self.module_address(to)?;
        self.send_coins(ctx, &from, &to, coin)
    }

    /// Create `coin` in the account of `module`, which needs `Mint`.
    pub fn mint_coins(&self, ctx: &mut Context<'_>, module: &str, coin: &Coin) -> Result<(), ModuleError> {
        self.require_permission(module, Permission::Mint)?;
        let addr = self.module_address(module)?;
        self.add_balance(ctx, &addr, coin)?;
        let supply = self
            .supply(ctx, &coin.denom)?
            .checked_add(coin.amount)
            .ok_or_else(|| bank_error(format!("supply overflow for {}", coin.denom)))?;
        self.set_supply(ctx, &coin.denom, supply)?;

        debug!("[Bank] {} minted {}", module, coin);
        ctx.emit(Event::new("mint").attr("minter", module).attr("amount", coin));
        Ok(())
    }

    /// Destroy `coin` from the account of `module`, which needs `Burn`.
    pub fn burn_coins(&self, ctx: &mut Context<'_>, module: &str, coin: &Coin) -> Result<(), ModuleError> {
        self.require_permission(module, Permission::Burn)?;
        let addr = self.module_address(module)?;
        self.sub_balance(ctx, &addr, coin)?;
        let supply = self.supply(ctx, &coin.denom)?.saturating_sub(coin.amount);
        self.set_supply(ctx, &coin.denom, supply)?;

        debug!("[Bank] {} burned {}", module, coin);
        ctx.emit(Event::new("burn").attr("burner", module).attr("amount", coin));
        Ok(())
    }

    /// Sum of all balances per denom equals the recorded supply.
    pub fn check_total_supply(&self, ctx: &Context<'_>) -> Result<(), String> {
        let store = ctx.kv(&self.store_key).map_err(|e| e.to_string())?;
        let mut computed: BTreeMap<String, u64> = BTreeMap::new();
        for (key, value) in store.iter_prefix(BALANCES_PREFIX.as_bytes()) {
            let key = String::from_utf8_lossy(key);
            let denom = key.splitn(3, '/').nth(2).unwrap_or_default().to_string();
            let amount: u64 = serde_json::from_slice(value).map_err(|e| e.to_string())?;
            *computed.entry(denom).or_default() += amount;
        }
        let recorded = self.total_supply(ctx).map_err(|e| e.to_string())?;
        computed.retain(|_, amount| *amount > 0);
        let recorded: BTreeMap<String, u64> =
            recorded.into_iter().filter(|(_, amount)| *amount > 0).collect();
        if computed != recorded {
            return Err(format!(
                "total supply {recorded:?} does not match sum of balances {computed:?}"
            ));
        }
        Ok(())
    }

    fn module_address(&self, module: &str) -> Result<AccAddress, ModuleError> {
        self.auth
            .module_address(module)
            .ok_or_else(|| bank_error(format!("unknown module account {module}")))
    }

    fn require_permission(&self, module: &str, permission: Permission) -> Result<(), ModuleError> {
        if self.auth.module_accounts().has_permission(module, permission) {
            Ok(())
        } else {
            Err(bank_error(format!(
                "module account {module} lacks {} permission",
                permission.as_str()
            )))
        }
    }

    fn add_balance(&self, ctx: &mut Context<'_>, addr: &AccAddress, coin: &Coin) -> Result<(), ModuleError> {
        let balance = self
            .balance(ctx, addr, &coin.denom)?
            .checked_add(coin.amount)
            .ok_or_else(|| bank_error(format!("balance overflow for {addr}")))?;
        self.set_balance(ctx, addr, &coin.denom, balance)
    }

    fn sub_balance(&self, ctx: &mut Context<'_>, addr: &AccAddress, coin: &Coin) -> Result<(), ModuleError> {
        let balance = self.balance(ctx, addr, &coin.denom)?;
        let remaining = balance.checked_sub(coin.amount).ok_or_else(|| {
            bank_error(format!("insufficient funds: {addr} has {balance}{}, needs {coin}", coin.denom))
        })?;
        self.set_balance(ctx, addr, &coin.denom, remaining)
    }

    fn set_balance(
        &self,
        ctx: &mut Context<'_>,
        addr: &AccAddress,
        denom: &str,
        amount: u64,
    ) -> Result<(), ModuleError> {
        let store = ctx.kv_mut(&self.store_key).map_err(bank_error)?;
        if amount == 0 {
            store.delete(&balance_key(addr, denom));
            Ok(())
        } else {
            store.set_json(&balance_key(addr, denom), &amount).map_err(bank_error)
        }
    }

    fn set_supply(&self, ctx: &mut Context<'_>, denom: &str, amount: u64) -> Result<(), ModuleError> {
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(&supply_key(denom), &amount))
            .map_err(bank_error)
    }
}

fn balance_key(addr: &AccAddress, denom: &str) -> Vec<u8> {
    format!("{BALANCES_PREFIX}{addr}/{denom}").into_bytes()
}

fn supply_key(denom: &str) -> Vec<u8> {
    format!("{SUPPLY_PREFIX}{denom}").into_bytes()
}

pub struct BankModule {
    keeper: BankKeeper,
}

impl BankModule {
    pub fn new(keeper: BankKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for BankModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(MODULE_NAME)
            .with_hooks(&[Phase::InitGenesis])
            .depends_on(crate::app::layout::dependencies_of(MODULE_NAME))
    }

    fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &serde_json::Value,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        let state: BankGenesis = decode_genesis(MODULE_NAME, genesis)?;
        state.validate().map_err(bank_error)?;
        self.keeper.set_params(ctx, &state.params)?;

        let mut supply: BTreeMap<String, u64> = BTreeMap::new();
        for balance in &state.balances {
            let addr = AccAddress::from_hex(&balance.address).map_err(bank_error)?;
            self.keeper.auth.ensure_account(ctx, &addr)?;
            for coin in &balance.coins {
                self.keeper.add_balance(ctx, &addr, coin)?;
                *supply.entry(coin.denom.clone()).or_default() += coin.amount;
            }
        }
        for (denom, amount) in &supply {
            self.keeper.set_supply(ctx, denom, *amount)?;
        }

        debug!(
            "[Bank] Genesis: {} balances, supply {:?}",
            state.balances.len(),
            supply
        );
        Ok(Vec::new())
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &BankGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        decode_genesis::<BankGenesis>(MODULE_NAME, genesis)?
            .validate()
            .map_err(bank_error)
    }

    fn register_invariants(&self, registry: &mut InvariantRegistry) -> Result<(), RegistryError> {
        let keeper = self.keeper.clone();
        registry.register(MODULE_NAME, "total-supply", move |ctx| {
            keeper.check_total_supply(ctx)
        })
    }
}
