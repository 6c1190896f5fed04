//! # Params
//!
//! The params module has no block hooks and no genesis of its own; it
//! contributes the `params` governance route, which applies parameter
//! changes to other modules' subspaces.

use cc_01_store::Context;
use cc_02_params::{ParamChange, ParamsKeeper};
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use cc_06_routing::ProposalHandler;
use serde::{Deserialize, Serialize};
use shared_types::ModuleError;
use tracing::info;

use super::{module_error, proposal_handler};

pub const MODULE_NAME: &str = cc_02_params::MODULE_NAME;
/// Governance route for parameter changes.
pub const ROUTE: &str = "params";
pub const PARAMETER_CHANGE: &str = "ParameterChange";

/// Payload of a parameter change proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterChangeProposal {
    pub changes: Vec<ParamChange>,
}

/// Apply every change in order, stopping at the first invalid one.
///
/// Subspaces are resolved before anything is written, so an unknown
/// subspace rejects the whole proposal. Changes before a rejected value
/// stay applied.
pub fn apply_changes(
    keeper: &ParamsKeeper,
    ctx: &mut Context<'_>,
    changes: &[ParamChange],
) -> Result<(), ModuleError> {
    if changes.is_empty() {
        return Err(module_error(MODULE_NAME, "parameter change proposal has no changes"));
    }
    let subspaces = changes
        .iter()
        .map(|c| keeper.get_subspace(&c.subspace))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| module_error(MODULE_NAME, e))?;
    for (change, subspace) in changes.iter().zip(subspaces) {
        subspace
            .update(ctx, &change.key, &change.value)
            .map_err(|e| module_error(MODULE_NAME, e))?;
        info!(
            "[Params] Updated {}/{} to {}",
            change.subspace, change.key, change.value
        );
    }
    Ok(())
}

/// Handler for the `params` governance route.
pub fn proposal_route(keeper: ParamsKeeper) -> Box<dyn ProposalHandler> {
    proposal_handler(move |ctx, content| {
        if content.kind != PARAMETER_CHANGE {
            return Err(module_error(
                MODULE_NAME,
                format!("unrecognized params proposal kind {}", content.kind),
            ));
        }
        let proposal: ParameterChangeProposal = serde_json::from_value(content.payload.clone())
            .map_err(|e| module_error(MODULE_NAME, e))?;
        apply_changes(&keeper, ctx, &proposal.changes)
    })
}

pub struct ParamsModule;

impl AppModule for ParamsModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(MODULE_NAME)
            .depends_on(crate::app::layout::dependencies_of(MODULE_NAME))
    }
}
