//! # Genesis Document Builder
//!
//! Creates, validates and persists the genesis document handed to
//! InitChain.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use cc_04_module_manager::GenesisState;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{AccAddress, RequestInitChain, ADDRESS_LEN, DEFAULT_STAKE_DENOM};
use thiserror::Error;
use tracing::info;

use crate::app::ConsensusParams;
use crate::modules::auth::{self, AuthGenesis};
use crate::modules::bank::{self, Balance, BankGenesis, Coin};
use crate::modules::genutil::{self, GenTx, GenutilGenesis};

/// Genesis document errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenesisError {
    #[error("Failed to access {path}: {message}")]
    Io {
        /// File that failed
        path: String,
        /// I/O error message
        message: String,
    },

    #[error("Failed to parse genesis: {0}")]
    Parse(String),

    /// Invalid genesis configuration.
    #[error("Invalid genesis configuration: {0}")]
    InvalidConfig(String),

    /// The app state has no section for a module the builder edits.
    #[error("Genesis app state has no {0} section")]
    MissingModule(String),
}

/// The document `cocod init` writes and `cocod start` replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisDoc {
    /// Unix seconds.
    pub genesis_time: u64,
    pub chain_id: String,
    #[serde(default)]
    pub consensus_params: Option<ConsensusParams>,
    /// Module name to module genesis.
    pub app_state: GenesisState,
}

impl GenesisDoc {
    pub fn load(path: &Path) -> Result<Self, GenesisError> {
        let raw = fs::read(path).map_err(|e| GenesisError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let doc: Self =
            serde_json::from_slice(&raw).map_err(|e| GenesisError::Parse(e.to_string()))?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn save(&self, path: &Path) -> Result<(), GenesisError> {
        let raw =
            serde_json::to_vec_pretty(self).map_err(|e| GenesisError::Parse(e.to_string()))?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| GenesisError::Io {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?;
        }
        fs::write(path, raw).map_err(|e| GenesisError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Document-level checks. Module payloads are checked by the modules
    /// themselves at InitChain.
    pub fn validate(&self) -> Result<(), GenesisError> {
        if self.chain_id.trim().is_empty() {
            return Err(GenesisError::InvalidConfig("chain_id must not be empty".into()));
        }
        if self.app_state.is_empty() {
            return Err(GenesisError::InvalidConfig("app_state is empty".into()));
        }
        Ok(())
    }

    pub fn to_request(&self) -> Result<RequestInitChain, GenesisError> {
        let app_state_bytes =
            serde_json::to_vec(&self.app_state).map_err(|e| GenesisError::Parse(e.to_string()))?;
        let consensus_params = self
            .consensus_params
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| GenesisError::Parse(e.to_string()))?;
        Ok(RequestInitChain {
            chain_id: self.chain_id.clone(),
            time: self.genesis_time,
            app_state_bytes,
            consensus_params,
        })
    }
}

/// Builds a genesis document from the modules' default genesis.
pub struct GenesisBuilder {
    chain_id: String,
    genesis_time: Option<u64>,
    consensus_params: ConsensusParams,
    app_state: GenesisState,
}

impl GenesisBuilder {
    pub fn new(chain_id: impl Into<String>, app_state: GenesisState) -> Self {
        Self {
            chain_id: chain_id.into(),
            genesis_time: None,
            consensus_params: ConsensusParams::default(),
            app_state,
        }
    }

    /// Fix the genesis time. Defaults to now.
    pub fn genesis_time(mut self, time: u64) -> Self {
        self.genesis_time = Some(time);
        self
    }

    pub fn consensus_params(mut self, params: ConsensusParams) -> Self {
        self.consensus_params = params;
        self
    }

    /// Fund a deterministic development account and bond part of it into a
    /// validator through a genesis transaction.
    pub fn with_dev_validator(
        mut self,
        moniker: &str,
        balance: u64,
        self_bond: u64,
    ) -> Result<Self, GenesisError> {
        if self_bond == 0 || self_bond > balance {
            return Err(GenesisError::InvalidConfig(format!(
                "self bond {self_bond} must be positive and within balance {balance}"
            )));
        }
        let pub_key = dev_pub_key(moniker);
        let operator = operator_address(&pub_key)?;
        let coin = Coin::new(DEFAULT_STAKE_DENOM, balance);

        self.edit(auth::MODULE_NAME, |state: &mut AuthGenesis| {
            state.accounts.push(operator.to_string());
        })?;
        self.edit(bank::MODULE_NAME, |state: &mut BankGenesis| {
            if let Some(supply) = state.supply.iter_mut().find(|c| c.denom == coin.denom) {
                supply.amount += coin.amount;
            }
            state.balances.push(Balance {
                address: operator.to_string(),
                coins: vec![coin.clone()],
            });
        })?;
        self.edit(genutil::MODULE_NAME, |state: &mut GenutilGenesis| {
            state.gen_txs.push(GenTx {
                operator: operator.to_string(),
                pub_key: pub_key.clone(),
                self_bond,
            });
        })?;

        info!("[Genesis] Added dev validator {} ({})", moniker, operator);
        Ok(self)
    }

    fn edit<T, F>(&mut self, module: &str, f: F) -> Result<(), GenesisError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let raw = self
            .app_state
            .get_mut(module)
            .ok_or_else(|| GenesisError::MissingModule(module.to_string()))?;
        let mut state: T = serde_json::from_value(raw.clone())
            .map_err(|e| GenesisError::Parse(format!("{module}: {e}")))?;
        f(&mut state);
        *raw = serde_json::to_value(&state).map_err(|e| GenesisError::Parse(e.to_string()))?;
        Ok(())
    }

    pub fn build(self) -> Result<GenesisDoc, GenesisError> {
        let genesis_time = match self.genesis_time {
            Some(time) => time,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| GenesisError::InvalidConfig(e.to_string()))?
                .as_secs(),
        };
        let doc = GenesisDoc {
            genesis_time,
            chain_id: self.chain_id,
            consensus_params: Some(self.consensus_params),
            app_state: self.app_state,
        };
        doc.validate()?;
        Ok(doc)
    }
}

/// Hex consensus key derived from a moniker; development only.
pub fn dev_pub_key(moniker: &str) -> String {
    hex::encode(Sha256::digest(format!("cocod/dev/{moniker}").as_bytes()))
}

/// Account address controlled by a consensus key: the first 20 bytes of
/// SHA-256 over the decoded key.
pub fn operator_address(pub_key: &str) -> Result<AccAddress, GenesisError> {
    let raw = hex::decode(pub_key).map_err(|e| GenesisError::InvalidConfig(e.to_string()))?;
    let digest = Sha256::digest(&raw);
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
    Ok(AccAddress(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn app_state() -> GenesisState {
        [
            (auth::MODULE_NAME, serde_json::to_value(AuthGenesis::default()).unwrap()),
            (bank::MODULE_NAME, serde_json::to_value(BankGenesis::default()).unwrap()),
            (genutil::MODULE_NAME, serde_json::to_value(GenutilGenesis::default()).unwrap()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn test_dev_validator_funds_and_bonds() {
        let doc = GenesisBuilder::new("coco-test", app_state())
            .genesis_time(1_700_000_000)
            .with_dev_validator("alice", 1_000, 400)
            .unwrap()
            .build()
            .unwrap();

        let operator = operator_address(&dev_pub_key("alice")).unwrap().to_string();
        let auth: AuthGenesis = serde_json::from_value(doc.app_state["auth"].clone()).unwrap();
        let bank: BankGenesis = serde_json::from_value(doc.app_state["bank"].clone()).unwrap();
        let genutil: GenutilGenesis =
            serde_json::from_value(doc.app_state["genutil"].clone()).unwrap();

        assert_eq!(auth.accounts, vec![operator.clone()]);
        assert_eq!(bank.balances[0].coins, vec![Coin::new(DEFAULT_STAKE_DENOM, 1_000)]);
        assert_eq!(genutil.gen_txs[0].operator, operator);
        assert_eq!(genutil.gen_txs[0].self_bond, 400);
        assert!(genutil.validate().is_ok());
    }

    #[test]
    fn test_bond_beyond_balance_rejected() {
        let result = GenesisBuilder::new("coco-test", app_state()).with_dev_validator("bob", 10, 11);
        assert!(matches!(result, Err(GenesisError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_section_reported() {
        let mut state = app_state();
        state.remove(genutil::MODULE_NAME);
        let result = GenesisBuilder::new("coco-test", state).with_dev_validator("carol", 10, 5);
        assert_eq!(
            result.err(),
            Some(GenesisError::MissingModule(genutil::MODULE_NAME.to_string()))
        );
    }

    #[test]
    fn test_save_load_and_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("genesis.json");
        let doc = GenesisBuilder::new("coco-test", app_state())
            .genesis_time(42)
            .build()
            .unwrap();
        doc.save(&path).unwrap();

        let loaded = GenesisDoc::load(&path).unwrap();
        assert_eq!(loaded, doc);

        let req = loaded.to_request().unwrap();
        assert_eq!(req.time, 42);
        let state: serde_json::Value = serde_json::from_slice(&req.app_state_bytes).unwrap();
        assert_eq!(state["genutil"], json!({"gen_txs": []}));
        assert!(req.consensus_params.is_some());
    }

    #[test]
    fn test_empty_chain_id_rejected() {
        let result = GenesisBuilder::new(" ", app_state()).genesis_time(1).build();
        assert!(matches!(result, Err(GenesisError::InvalidConfig(_))));
    }
}
