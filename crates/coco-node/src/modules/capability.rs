//! # Capability
//!
//! Lifecycle adapter around the root capability keeper. Scoping and
//! sealing happen during assembly; this module only loads the persistent
//! owner records at genesis.

use cc_01_store::Context;
use cc_03_capability::{CapabilityGenesis, CapabilityKeeper};
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use shared_types::{ModuleError, Phase, ValidatorUpdate};

use super::{decode_genesis, encode_genesis, module_error};

pub const MODULE_NAME: &str = cc_03_capability::MODULE_NAME;

pub struct CapabilityModule {
    keeper: CapabilityKeeper,
}

impl CapabilityModule {
    pub fn new(keeper: CapabilityKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for CapabilityModule {
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
        let state: CapabilityGenesis = decode_genesis(MODULE_NAME, genesis)?;
        self.keeper
            .init_genesis(ctx, &state)
            .map_err(|e| module_error(MODULE_NAME, e))?;
        Ok(Vec::new())
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &CapabilityGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        decode_genesis::<CapabilityGenesis>(MODULE_NAME, genesis)?
            .validate()
            .map_err(|e| module_error(MODULE_NAME, e))
    }
}
