//! # Evidence
//!
//! Accepts misbehaviour evidence, hands it to the module registered for
//! its route and keeps a record of everything accepted. Double signs
//! reported by consensus go straight to slashing in BeginBlock.

use std::fmt;
use std::sync::Arc;

use cc_01_store::{Context, StoreKey};
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use cc_06_routing::{Evidence, EvidenceRouter};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{Event, ModuleError, Phase, RequestBeginBlock, ValidatorUpdate};
use tracing::{debug, info};

use super::slashing::SlashingKeeper;
use super::{decode_genesis, encode_genesis, module_error};

pub const MODULE_NAME: &str = "evidence";
pub const STORE_KEY: &str = "evidence";

const EVIDENCE_PREFIX: &str = "evidence/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceGenesis {
    pub evidence: Vec<Evidence>,
}

impl EvidenceGenesis {
    pub fn validate(&self) -> Result<(), String> {
        match self.evidence.iter().find(|e| e.route.is_empty()) {
            Some(e) => Err(format!("{} evidence has no route", e.kind)),
            None => Ok(()),
        }
    }
}

fn evidence_error(err: impl fmt::Display) -> ModuleError {
    module_error(MODULE_NAME, err)
}

/// Hex SHA-256 of the evidence's JSON encoding.
pub fn evidence_id(evidence: &Evidence) -> Result<String, ModuleError> {
    let bytes = serde_json::to_vec(evidence).map_err(evidence_error)?;
    Ok(hex::encode(Sha256::digest(bytes)))
}

fn evidence_key(id: &str) -> Vec<u8> {
    format!("{EVIDENCE_PREFIX}{id}").into_bytes()
}

#[derive(Debug, Clone)]
pub struct EvidenceKeeper {
    store_key: StoreKey,
    slashing: SlashingKeeper,
    router: Arc<EvidenceRouter>,
}

impl EvidenceKeeper {
    /// The router is sealed here; routes cannot be added afterwards.
    pub fn new(store_key: StoreKey, slashing: SlashingKeeper, mut router: EvidenceRouter) -> Self {
        router.seal();
        Self {
            store_key,
            slashing,
            router: Arc::new(router),
        }
    }

    pub fn router(&self) -> &EvidenceRouter {
        &self.router
    }

    /// Route `evidence` to its handler and record it.
    ///
    /// Returns the evidence id. Evidence already on record is rejected
    /// before its handler runs.
    pub fn submit_evidence(&self, ctx: &mut Context<'_>, evidence: &Evidence) -> Result<String, ModuleError> {
        let id = evidence_id(evidence)?;
        if self.has_evidence(ctx, &id)? {
            return Err(evidence_error(format!("evidence {id} already submitted")));
        }

        self.router.dispatch(ctx, evidence).map_err(evidence_error)?;
        self.set_evidence(ctx, &id, evidence)?;

        info!("[Evidence] Accepted {} evidence {} via {}", evidence.kind, id, evidence.route);
        ctx.emit(
            Event::new("submit_evidence")
                .attr("evidence_id", &id)
                .attr("route", &evidence.route),
        );
        Ok(id)
    }

    pub fn get_evidence(&self, ctx: &Context<'_>, id: &str) -> Result<Option<Evidence>, ModuleError> {
        ctx.kv(&self.store_key)
            .and_then(|s| s.get_json(&evidence_key(id)))
            .map_err(evidence_error)
    }

    pub fn has_evidence(&self, ctx: &Context<'_>, id: &str) -> Result<bool, ModuleError> {
        ctx.kv(&self.store_key)
            .map(|s| s.has(&evidence_key(id)))
            .map_err(evidence_error)
    }

    pub fn all_evidence(&self, ctx: &Context<'_>) -> Result<Vec<Evidence>, ModuleError> {
        ctx.kv(&self.store_key)
            .map_err(evidence_error)?
            .iter_prefix(EVIDENCE_PREFIX.as_bytes())
            .map(|(_, raw)| serde_json::from_slice(raw).map_err(evidence_error))
            .collect()
    }

    /// Pass double signs reported by consensus to slashing.
    pub fn handle_byzantine(&self, ctx: &mut Context<'_>, pub_keys: &[String]) -> Result<(), ModuleError> {
        for pub_key in pub_keys {
            debug!("[Evidence] Double sign reported for {}", pub_key);
            self.slashing.handle_double_sign(ctx, pub_key)?;
        }
        Ok(())
    }

    fn set_evidence(&self, ctx: &mut Context<'_>, id: &str, evidence: &Evidence) -> Result<(), ModuleError> {
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(&evidence_key(id), evidence))
            .map_err(evidence_error)
    }
}

pub struct EvidenceModule {
    keeper: EvidenceKeeper,
}

impl EvidenceModule {
    pub fn new(keeper: EvidenceKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for EvidenceModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(MODULE_NAME)
            .with_hooks(&[Phase::InitGenesis, Phase::BeginBlock])
            .depends_on(crate::app::layout::dependencies_of(MODULE_NAME))
    }

    /// Genesis evidence is recorded as-is; its handlers already ran on the
    /// chain that exported it.
    fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &serde_json::Value,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        let state: EvidenceGenesis = decode_genesis(MODULE_NAME, genesis)?;
        for evidence in &state.evidence {
            let id = evidence_id(evidence)?;
            self.keeper.set_evidence(ctx, &id, evidence)?;
        }
        Ok(Vec::new())
    }

    fn begin_block(&self, ctx: &mut Context<'_>, req: &RequestBeginBlock) -> Result<(), ModuleError> {
        self.keeper.handle_byzantine(ctx, &req.byzantine_validators)
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &EvidenceGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        decode_genesis::<EvidenceGenesis>(MODULE_NAME, genesis)?
            .validate()
            .map_err(evidence_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn misbehaviour(client_id: &str) -> Evidence {
        Evidence {
            route: "clientmisbehaviour".to_string(),
            kind: "ClientMisbehaviour".to_string(),
            height: 7,
            data: serde_json::json!({ "client_id": client_id }),
        }
    }

    #[test]
    fn test_evidence_id_is_content_hash() {
        let a = evidence_id(&misbehaviour("07-tendermint-0")).unwrap();
        let b = evidence_id(&misbehaviour("07-tendermint-0")).unwrap();
        let c = evidence_id(&misbehaviour("07-tendermint-1")).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_genesis_requires_route() {
        let valid = EvidenceGenesis {
            evidence: vec![misbehaviour("07-tendermint-0")],
        };
        assert!(valid.validate().is_ok());

        let unrouted = EvidenceGenesis {
            evidence: vec![Evidence {
                route: String::new(),
                ..misbehaviour("07-tendermint-0")
            }],
        };
        assert!(unrouted.validate().is_err());
    }
}
