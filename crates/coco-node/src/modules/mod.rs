//! # Application Modules
//!
//! Thin keepers for the fifteen modules the CoCo chain installs. Each one
//! owns its store partition and parameter subspace and implements
//! `AppModule`. Business rules stay small; most of the code here is the
//! wiring between modules.
//!
//! | Module | Store | Hooks |
//! |--------|-------|-------|
//! | auth | `acc` | init |
//! | bank | `bank` | init |
//! | capability | `capability`, `mem_capability` | init |
//! | crisis | - | init, end |
//! | distribution | `distribution` | init, begin |
//! | evidence | `evidence` | init, begin |
//! | genutil | - | init |
//! | gov | `gov` | init, end |
//! | ibc | `ibc` | init, begin |
//! | mint | `mint` | init, begin |
//! | params | `params`, `transient_params` | - |
//! | slashing | `slashing` | init, begin |
//! | staking | `staking` | init, begin, end |
//! | transfer | `transfer` | init |
//! | upgrade | `upgrade` | begin |

use std::fmt::Display;

use cc_01_store::Context;
use cc_06_routing::{Evidence, EvidenceHandler, ProposalContent, ProposalHandler};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::ModuleError;

pub mod auth;
pub mod bank;
pub mod capability;
pub mod crisis;
pub mod distribution;
pub mod evidence;
pub mod genutil;
pub mod gov;
pub mod ibc;
pub mod mint;
pub mod params;
pub mod slashing;
pub mod staking;
pub mod transfer;
pub mod upgrade;

/// Module account collecting fees.
pub const FEE_COLLECTOR: &str = "fee_collector";
/// Module account holding bonded stake.
pub const BONDED_POOL: &str = "bonded_tokens_pool";
/// Module account holding unbonding stake.
pub const NOT_BONDED_POOL: &str = "not_bonded_tokens_pool";

pub(crate) fn module_error(module: &str, err: impl Display) -> ModuleError {
    ModuleError::new(module, err.to_string())
}

/// Decode a module's genesis payload.
pub(crate) fn decode_genesis<T: DeserializeOwned>(
    module: &str,
    raw: &serde_json::Value,
) -> Result<T, ModuleError> {
    serde_json::from_value(raw.clone())
        .map_err(|e| module_error(module, format!("malformed genesis: {e}")))
}

pub(crate) fn encode_genesis<T: Serialize>(
    module: &str,
    state: &T,
) -> Result<serde_json::Value, ModuleError> {
    serde_json::to_value(state)
        .map_err(|e| module_error(module, format!("unencodable genesis: {e}")))
}

/// Box a closure as a governance route handler.
pub(crate) fn proposal_handler<F>(handler: F) -> Box<dyn ProposalHandler>
where
    F: Fn(&mut Context<'_>, &ProposalContent) -> Result<(), ModuleError> + Send + Sync + 'static,
{
    Box::new(handler)
}

/// Box a closure as an evidence route handler.
pub(crate) fn evidence_handler<F>(handler: F) -> Box<dyn EvidenceHandler>
where
    F: Fn(&mut Context<'_>, &Evidence) -> Result<(), ModuleError> + Send + Sync + 'static,
{
    Box::new(handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_unencodable_genesis_reported() {
        let state: BTreeMap<(u8, u8), u64> = [((1, 2), 3)].into_iter().collect();
        let err = encode_genesis("mint", &state).unwrap_err();
        assert_eq!(err.module, "mint");
        assert!(err.message.starts_with("unencodable genesis"));
    }
}
