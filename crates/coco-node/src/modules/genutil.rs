//! # Genutil
//!
//! Genesis transactions. Each entry bonds stake from a funded genesis
//! account into a new validator; the resulting power changes become the
//! chain's initial validator set.

use std::collections::BTreeSet;

use cc_01_store::Context;
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use serde::{Deserialize, Serialize};
use shared_types::{AccAddress, ModuleError, Phase, ValidatorUpdate};
use tracing::info;

use super::staking::StakingKeeper;
use super::{decode_genesis, encode_genesis, module_error};

pub const MODULE_NAME: &str = "genutil";

/// A validator creation signed into genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenTx {
    /// Hex address paying the self bond.
    pub operator: String,
    /// Consensus key, hex encoded.
    pub pub_key: String,
    pub self_bond: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenutilGenesis {
    pub gen_txs: Vec<GenTx>,
}

impl GenutilGenesis {
    pub fn validate(&self) -> Result<(), String> {
        let mut keys = BTreeSet::new();
        for tx in &self.gen_txs {
            AccAddress::from_hex(&tx.operator).map_err(|e| e.to_string())?;
            if tx.pub_key.trim().is_empty() {
                return Err(format!("gentx from {} has no pub key", tx.operator));
            }
            if tx.self_bond == 0 {
                return Err(format!("gentx {} bonds nothing", tx.pub_key));
            }
            if !keys.insert(tx.pub_key.as_str()) {
                return Err(format!("duplicate gentx for {}", tx.pub_key));
            }
        }
        Ok(())
    }
}

pub struct GenutilModule {
    staking: StakingKeeper,
}

impl GenutilModule {
    pub fn new(staking: StakingKeeper) -> Self {
        Self { staking }
    }
}

impl AppModule for GenutilModule {
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
        let state: GenutilGenesis = decode_genesis(MODULE_NAME, genesis)?;
        state.validate().map_err(|e| module_error(MODULE_NAME, e))?;
        if state.gen_txs.is_empty() {
            return Ok(Vec::new());
        }

        for tx in &state.gen_txs {
            let operator =
                AccAddress::from_hex(&tx.operator).map_err(|e| module_error(MODULE_NAME, e))?;
            self.staking
                .create_validator(ctx, &operator, &tx.pub_key, tx.self_bond)?;
        }
        info!("[Genutil] Delivered {} genesis transactions", state.gen_txs.len());
        self.staking.apply_and_return_updates(ctx)
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &GenutilGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        decode_genesis::<GenutilGenesis>(MODULE_NAME, genesis)?
            .validate()
            .map_err(|e| module_error(MODULE_NAME, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gentx(pub_key: &str, self_bond: u64) -> GenTx {
        GenTx {
            operator: AccAddress::for_module("operator").to_string(),
            pub_key: pub_key.to_string(),
            self_bond,
        }
    }

    #[test]
    fn test_validate_gentxs() {
        let ok = GenutilGenesis {
            gen_txs: vec![gentx("aa01", 100), gentx("aa02", 50)],
        };
        assert!(ok.validate().is_ok());

        let duplicate = GenutilGenesis {
            gen_txs: vec![gentx("aa01", 100), gentx("aa01", 50)],
        };
        assert!(duplicate.validate().unwrap_err().contains("duplicate"));

        let unbonded = GenutilGenesis {
            gen_txs: vec![gentx("aa01", 0)],
        };
        assert!(unbonded.validate().is_err());

        let bad_operator = GenutilGenesis {
            gen_txs: vec![GenTx {
                operator: "zz".to_string(),
                ..gentx("aa01", 1)
            }],
        };
        assert!(bad_operator.validate().is_err());
    }
}
