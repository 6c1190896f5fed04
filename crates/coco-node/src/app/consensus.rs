//! # Consensus Parameters
//!
//! Block, evidence and validator limits shared with the consensus engine.
//! They live in the `baseapp` subspace, sealed with its own key table, and
//! are written once at InitChain.

use cc_01_store::Context;
use cc_02_params::{KeyTable, ParamsError, Subspace};
use serde::{Deserialize, Serialize};

const KEY_BLOCK_PARAMS: &str = "BlockParams";
const KEY_EVIDENCE_PARAMS: &str = "EvidenceParams";
const KEY_VALIDATOR_PARAMS: &str = "ValidatorParams";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockParams {
    pub max_bytes: u64,
    /// Gas limit per block; 0 means unlimited.
    pub max_gas: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceParams {
    /// Evidence older than this many blocks is rejected.
    pub max_age_num_blocks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorParams {
    pub pub_key_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub block: BlockParams,
    pub evidence: EvidenceParams,
    pub validator: ValidatorParams,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            block: BlockParams {
                max_bytes: 22_020_096,
                max_gas: 0,
            },
            evidence: EvidenceParams {
                max_age_num_blocks: 100_000,
            },
            validator: ValidatorParams {
                pub_key_types: vec!["ed25519".to_string()],
            },
        }
    }
}

fn validate_block_params(value: &serde_json::Value) -> Result<(), String> {
    let params: BlockParams = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    if params.max_bytes == 0 {
        return Err("block max bytes must be positive".to_string());
    }
    Ok(())
}

fn validate_evidence_params(value: &serde_json::Value) -> Result<(), String> {
    let params: EvidenceParams =
        serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    if params.max_age_num_blocks == 0 {
        return Err("evidence max age must be positive".to_string());
    }
    Ok(())
}

fn validate_validator_params(value: &serde_json::Value) -> Result<(), String> {
    let params: ValidatorParams =
        serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    if params.pub_key_types.is_empty() {
        return Err("at least one validator key type is required".to_string());
    }
    Ok(())
}

/// Key table of the `baseapp` subspace.
pub fn key_table() -> Result<KeyTable, ParamsError> {
    KeyTable::new()
        .register(KEY_BLOCK_PARAMS, validate_block_params)?
        .register(KEY_EVIDENCE_PARAMS, validate_evidence_params)?
        .register(KEY_VALIDATOR_PARAMS, validate_validator_params)
}

pub fn store(subspace: &Subspace, ctx: &mut Context<'_>, params: &ConsensusParams) -> Result<(), ParamsError> {
    subspace
        .set(ctx, KEY_BLOCK_PARAMS, &params.block)
        .and_then(|_| subspace.set(ctx, KEY_EVIDENCE_PARAMS, &params.evidence))
        .and_then(|_| subspace.set(ctx, KEY_VALIDATOR_PARAMS, &params.validator))
}

/// Stored parameters, or `None` before InitChain.
pub fn load(subspace: &Subspace, ctx: &Context<'_>) -> Result<Option<ConsensusParams>, ParamsError> {
    let block = subspace.get(ctx, KEY_BLOCK_PARAMS)?;
    let evidence = subspace.get(ctx, KEY_EVIDENCE_PARAMS)?;
    let validator = subspace.get(ctx, KEY_VALIDATOR_PARAMS)?;
    Ok(match (block, evidence, validator) {
        (Some(block), Some(evidence), Some(validator)) => Some(ConsensusParams {
            block,
            evidence,
            validator,
        }),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validators() {
        assert!(validate_block_params(&json!({"max_bytes": 1, "max_gas": 0})).is_ok());
        assert!(validate_block_params(&json!({"max_bytes": 0, "max_gas": 0})).is_err());
        assert!(validate_evidence_params(&json!({"max_age_num_blocks": 0})).is_err());
        assert!(validate_validator_params(&json!({"pub_key_types": []})).is_err());
        assert!(validate_validator_params(&json!("ed25519")).is_err());
    }

    #[test]
    fn test_key_table_declares_three_keys() {
        let table = key_table().unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.contains(KEY_BLOCK_PARAMS));
    }
}
