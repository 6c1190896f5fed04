//! # Auth
//!
//! Account registry. Creates genesis accounts and the module accounts of
//! the permission table.

use std::collections::BTreeSet;
use std::sync::Arc;

use cc_01_store::{Context, StoreKey};
use cc_02_params::domain::validate_positive_u64;
use cc_02_params::{KeyTable, ParamsError, Subspace};
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use cc_05_module_accounts::ModuleAccountTable;
use serde::{Deserialize, Serialize};
use shared_types::{AccAddress, ModuleError, Phase, ValidatorUpdate};
use tracing::debug;

use super::{decode_genesis, encode_genesis, module_error};

pub const MODULE_NAME: &str = "auth";
pub const STORE_KEY: &str = "acc";

const KEY_MAX_MEMO: &str = "MaxMemoCharacters";
const KEY_TX_SIG_LIMIT: &str = "TxSigLimit";
const NEXT_ACCOUNT_NUMBER: &[u8] = b"next_account_number";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthParams {
    pub max_memo_characters: u64,
    pub tx_sig_limit: u64,
}

impl Default for AuthParams {
    fn default() -> Self {
        Self {
            max_memo_characters: 256,
            tx_sig_limit: 7,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthGenesis {
    pub params: AuthParams,
    /// Hex addresses of genesis accounts.
    pub accounts: Vec<String>,
}

impl AuthGenesis {
    pub fn validate(&self) -> Result<(), String> {
        if self.params.max_memo_characters == 0 || self.params.tx_sig_limit == 0 {
            return Err("auth params must be positive".to_string());
        }
        let mut seen = BTreeSet::new();
        for account in &self.accounts {
            let addr = AccAddress::from_hex(account).map_err(|e| e.to_string())?;
            if !seen.insert(addr) {
                return Err(format!("duplicate genesis account {account}"));
            }
        }
        Ok(())
    }
}

fn key_table() -> Result<KeyTable, ParamsError> {
    KeyTable::new()
        .register(KEY_MAX_MEMO, validate_positive_u64)?
        .register(KEY_TX_SIG_LIMIT, validate_positive_u64)
}

#[derive(Debug, Clone)]
pub struct AuthKeeper {
    store_key: StoreKey,
    subspace: Subspace,
    accounts: Arc<ModuleAccountTable>,
}

impl AuthKeeper {
    pub fn new(
        store_key: StoreKey,
        subspace: Subspace,
        accounts: Arc<ModuleAccountTable>,
    ) -> Result<Self, ParamsError> {
        let subspace = if subspace.has_key_table() {
            subspace
        } else {
            subspace.with_key_table(key_table()?)?
        };
        Ok(Self {
            store_key,
            subspace,
            accounts,
        })
    }

    pub fn module_accounts(&self) -> &ModuleAccountTable {
        &self.accounts
    }

    pub fn module_address(&self, name: &str) -> Option<AccAddress> {
        self.accounts.address_of(name)
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<AuthParams, ModuleError> {
        let defaults = AuthParams::default();
        let read = |key, default| {
            self.subspace
                .get_or(ctx, key, default)
                .map_err(|e| module_error(MODULE_NAME, e))
        };
        Ok(AuthParams {
            max_memo_characters: read(KEY_MAX_MEMO, defaults.max_memo_characters)?,
            tx_sig_limit: read(KEY_TX_SIG_LIMIT, defaults.tx_sig_limit)?,
        })
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &AuthParams) -> Result<(), ModuleError> {
        self.subspace
            .set(ctx, KEY_MAX_MEMO, &params.max_memo_characters)
            .and_then(|_| self.subspace.set(ctx, KEY_TX_SIG_LIMIT, &params.tx_sig_limit))
            .map_err(|e| module_error(MODULE_NAME, e))
    }

    /// Account number of `addr`, if the account exists.
    pub fn account_number(
        &self,
        ctx: &Context<'_>,
        addr: &AccAddress,
    ) -> Result<Option<u64>, ModuleError> {
        ctx.kv(&self.store_key)
            .and_then(|s| s.get_json(&account_key(addr)))
            .map_err(|e| module_error(MODULE_NAME, e))
    }

    pub fn has_account(&self, ctx: &Context<'_>, addr: &AccAddress) -> Result<bool, ModuleError> {
        Ok(self.account_number(ctx, addr)?.is_some())
    }

    /// Create `addr` if it does not exist yet; returns its account number.
    pub fn ensure_account(
        &self,
        ctx: &mut Context<'_>,
        addr: &AccAddress,
    ) -> Result<u64, ModuleError> {
        if let Some(number) = self.account_number(ctx, addr)? {
            return Ok(number);
        }
        let store = ctx
            .kv_mut(&self.store_key)
            .map_err(|e| module_error(MODULE_NAME, e))?;
        let number: u64 = store
            .get_json(NEXT_ACCOUNT_NUMBER)
            .map_err(|e| module_error(MODULE_NAME, e))?
            .unwrap_or(0);
        store
            .set_json(&account_key(addr), &number)
            .and_then(|_| store.set_json(NEXT_ACCOUNT_NUMBER, &(number + 1)))
            .map_err(|e| module_error(MODULE_NAME, e))?;
        Ok(number)
    }
}

fn account_key(addr: &AccAddress) -> Vec<u8> {
    format!("accounts/{addr}").into_bytes()
}

pub struct AuthModule {
    keeper: AuthKeeper,
}

impl AuthModule {
    pub fn new(keeper: AuthKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for AuthModule {
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
        let state: AuthGenesis = decode_genesis(MODULE_NAME, genesis)?;
        self.keeper.set_params(ctx, &state.params)?;

        for account in &state.accounts {
            let addr = AccAddress::from_hex(account).map_err(|e| module_error(MODULE_NAME, e))?;
            self.keeper.ensure_account(ctx, &addr)?;
        }
        for addr in self.keeper.accounts.module_account_addrs() {
            self.keeper.ensure_account(ctx, &addr)?;
        }

        debug!(
            "[Auth] Genesis: {} accounts, {} module accounts",
            state.accounts.len(),
            self.keeper.accounts.len()
        );
        Ok(Vec::new())
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &AuthGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        decode_genesis::<AuthGenesis>(MODULE_NAME, genesis)?
            .validate()
            .map_err(|e| module_error(MODULE_NAME, e))
    }
}
