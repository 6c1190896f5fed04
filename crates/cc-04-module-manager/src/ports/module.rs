//! # AppModule Port
//!
//! The lifecycle contract consumed by the module manager and implemented by
//! every installed module.
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! struct MintModule { keeper: MintKeeper }
//!
//! impl AppModule for MintModule {
//!     fn descriptor(&self) -> ModuleDescriptor {
//!         ModuleDescriptor::new("mint")
//!             .with_hooks(&[Phase::InitGenesis, Phase::BeginBlock])
//!             .depends_on(&["staking", "bank"])
//!     }
//!
//!     fn begin_block(&self, ctx: &mut Context<'_>, _req: &RequestBeginBlock)
//!         -> Result<(), ModuleError>
//!     {
//!         self.keeper.mint_block_provision(ctx)
//!     }
//! }
//! ```
//!
//! Hooks a module does not declare in its descriptor are never called, so
//! the default bodies below only matter for hooks it does declare and
//! chooses not to override.

use cc_01_store::Context;
use shared_types::{ModuleError, RequestBeginBlock, RequestEndBlock, ValidatorUpdate};

use crate::crisis::InvariantRegistry;
use crate::domain::{ModuleDescriptor, RegistryError};

pub trait AppModule: Send + Sync {
    /// Name, hooks and construction dependencies.
    fn descriptor(&self) -> ModuleDescriptor;

    /// Load this module's genesis payload.
    ///
    /// Returning a non-empty validator set makes this module the source of
    /// the initial validators; at most one module may do so.
    fn init_genesis(
        &self,
        _ctx: &mut Context<'_>,
        _genesis: &serde_json::Value,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        Ok(Vec::new())
    }

    fn begin_block(
        &self,
        _ctx: &mut Context<'_>,
        _req: &RequestBeginBlock,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Returns validator set changes, if this module manages them.
    fn end_block(
        &self,
        _ctx: &mut Context<'_>,
        _req: &RequestEndBlock,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        Ok(Vec::new())
    }

    /// Default genesis payload, or `None` when the module has no genesis.
    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        Ok(None)
    }

    fn validate_genesis(&self, _genesis: &serde_json::Value) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Register invariant routes checked by crisis.
    fn register_invariants(&self, _registry: &mut InvariantRegistry) -> Result<(), RegistryError> {
        Ok(())
    }
}
