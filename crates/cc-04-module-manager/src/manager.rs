//! # Module Manager
//!
//! The frozen registry. Runs lifecycle phases strictly in the configured
//! order, one module at a time, over the caller's context.
//!
//! A failing hook aborts the phase. Writes made by hooks that already ran
//! stay in the context; rolling them back is the caller's business.

use std::collections::BTreeMap;

use cc_01_store::Context;
use shared_types::{
    Phase, RequestBeginBlock, RequestEndBlock, ResponseBeginBlock, ResponseEndBlock,
    ResponseInitChain, ValidatorUpdate,
};
use tracing::{debug, info, warn};

use crate::crisis::InvariantRegistry;
use crate::domain::{GenesisState, ModuleDescriptor, PhaseError, RegistryError};
use crate::ports::AppModule;

pub struct ModuleManager {
    modules: BTreeMap<String, Box<dyn AppModule>>,
    descriptors: BTreeMap<String, ModuleDescriptor>,
    declared: Vec<String>,
    orders: BTreeMap<Phase, Vec<String>>,
    dependency_order: Vec<String>,
}

impl ModuleManager {
    pub(crate) fn new(
        modules: BTreeMap<String, Box<dyn AppModule>>,
        descriptors: BTreeMap<String, ModuleDescriptor>,
        declared: Vec<String>,
        orders: BTreeMap<Phase, Vec<String>>,
        dependency_order: Vec<String>,
    ) -> Self {
        Self {
            modules,
            descriptors,
            declared,
            orders,
            dependency_order,
        }
    }

    /// Module names in registration order.
    pub fn module_names(&self) -> &[String] {
        &self.declared
    }

    /// The configured order for `phase`.
    pub fn order(&self, phase: Phase) -> &[String] {
        self.orders.get(&phase).map(Vec::as_slice).unwrap_or_default()
    }

    /// Module names sorted so that dependencies come first.
    pub fn dependency_order(&self) -> &[String] {
        &self.dependency_order
    }

    pub fn descriptor(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.get(name)
    }

    pub fn module(&self, name: &str) -> Option<&dyn AppModule> {
        self.modules.get(name).map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn ordered(&self, phase: Phase) -> impl Iterator<Item = (&str, &dyn AppModule)> {
        self.order(phase)
            .iter()
            .filter_map(|name| self.modules.get(name).map(|m| (name.as_str(), m.as_ref())))
    }

    /// Route every payload of `genesis` to its module, in InitGenesis order.
    pub fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &GenesisState,
    ) -> Result<ResponseInitChain, PhaseError> {
        self.check_genesis_keys(genesis)?;

        let mut validators = ValidatorSource::new(Phase::InitGenesis);
        for (name, module) in self.ordered(Phase::InitGenesis) {
            let payload = genesis
                .get(name)
                .ok_or_else(|| PhaseError::MissingGenesis(name.to_string()))?;

            debug!("[Registry] init_genesis -> {}", name);
            let updates = module
                .init_genesis(ctx, payload)
                .map_err(|source| hook_failed(Phase::InitGenesis, name, source))?;
            validators.record(name, updates)?;
        }

        info!(
            "[Registry] InitGenesis complete for {} modules",
            self.order(Phase::InitGenesis).len()
        );
        Ok(ResponseInitChain {
            validators: validators.into_updates(),
        })
    }

    pub fn begin_block(
        &self,
        ctx: &mut Context<'_>,
        req: &RequestBeginBlock,
    ) -> Result<ResponseBeginBlock, PhaseError> {
        for (name, module) in self.ordered(Phase::BeginBlock) {
            debug!("[Registry] begin_block -> {}", name);
            module
                .begin_block(ctx, req)
                .map_err(|source| hook_failed(Phase::BeginBlock, name, source))?;
        }
        Ok(ResponseBeginBlock {
            events: ctx.take_events(),
        })
    }

    pub fn end_block(
        &self,
        ctx: &mut Context<'_>,
        req: &RequestEndBlock,
    ) -> Result<ResponseEndBlock, PhaseError> {
        let mut validators = ValidatorSource::new(Phase::EndBlock);
        for (name, module) in self.ordered(Phase::EndBlock) {
            debug!("[Registry] end_block -> {}", name);
            let updates = module
                .end_block(ctx, req)
                .map_err(|source| hook_failed(Phase::EndBlock, name, source))?;
            validators.record(name, updates)?;
        }
        Ok(ResponseEndBlock {
            validator_updates: validators.into_updates(),
            events: ctx.take_events(),
        })
    }

    /// Default genesis of every module that has one.
    pub fn default_genesis(&self) -> Result<GenesisState, PhaseError> {
        let mut genesis = GenesisState::new();
        for name in &self.declared {
            let Some(module) = self.modules.get(name) else {
                continue;
            };
            let payload = module
                .default_genesis()
                .map_err(|source| PhaseError::DefaultGenesis {
                    module: name.clone(),
                    source,
                })?;
            if let Some(state) = payload {
                genesis.insert(name.clone(), state);
            }
        }
        Ok(genesis)
    }

    /// Have each module check its own payload without touching state.
    pub fn validate_genesis(&self, genesis: &GenesisState) -> Result<(), PhaseError> {
        self.check_genesis_keys(genesis)?;

        for (name, module) in self.ordered(Phase::InitGenesis) {
            let payload = genesis
                .get(name)
                .ok_or_else(|| PhaseError::MissingGenesis(name.to_string()))?;
            module
                .validate_genesis(payload)
                .map_err(|source| PhaseError::InvalidGenesis {
                    module: name.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Collect invariant routes from every module, in registration order.
    pub fn register_invariants(
        &self,
        registry: &mut InvariantRegistry,
    ) -> Result<(), RegistryError> {
        for name in &self.declared {
            if let Some(module) = self.modules.get(name) {
                module.register_invariants(registry)?;
            }
        }
        Ok(())
    }

    fn check_genesis_keys(&self, genesis: &GenesisState) -> Result<(), PhaseError> {
        let accepting = self.order(Phase::InitGenesis);
        match genesis.keys().find(|k| !accepting.contains(k)) {
            Some(unknown) => Err(PhaseError::UnknownGenesisModule(unknown.clone())),
            None => Ok(()),
        }
    }
}

fn hook_failed(phase: Phase, module: &str, source: shared_types::ModuleError) -> PhaseError {
    warn!("[Registry] {} aborted in {}: {}", phase, module, source);
    PhaseError::HookFailed {
        phase,
        module: module.to_string(),
        source,
    }
}

/// Tracks which module supplied validator updates during one phase.
struct ValidatorSource {
    phase: Phase,
    source: Option<(String, Vec<ValidatorUpdate>)>,
}

impl ValidatorSource {
    fn new(phase: Phase) -> Self {
        Self { phase, source: None }
    }

    fn record(&mut self, module: &str, updates: Vec<ValidatorUpdate>) -> Result<(), PhaseError> {
        if updates.is_empty() {
            return Ok(());
        }
        if let Some((first, _)) = &self.source {
            return Err(PhaseError::ConflictingValidatorUpdates {
                phase: self.phase,
                first: first.clone(),
                second: module.to_string(),
            });
        }
        self.source = Some((module.to_string(), updates));
        Ok(())
    }

    fn into_updates(self) -> Vec<ValidatorUpdate> {
        self.source.map(|(_, updates)| updates).unwrap_or_default()
    }
}
