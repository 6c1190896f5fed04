//! # Application Errors
//!
//! `AssemblyError` aggregates every fatal configuration error that can
//! surface while the application is put together; the binary refuses to
//! start on any of them. `AppError` covers failures while the assembled
//! application processes the chain.

use cc_01_store::StoreError;
use cc_02_params::ParamsError;
use cc_03_capability::CapabilityError;
use cc_04_module_manager::{PhaseError, RegistryError};
use cc_05_module_accounts::AccountsError;
use cc_06_routing::RouteError;
use shared_types::ModuleError;
use thiserror::Error;

use super::BlockStage;

/// Fatal errors raised while assembling the application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("Store key allocation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Parameter subspace setup failed: {0}")]
    Params(#[from] ParamsError),

    #[error("Capability scoping failed: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Module registry rejected configuration: {0}")]
    Registry(#[from] RegistryError),

    #[error("Module account table rejected configuration: {0}")]
    Accounts(#[from] AccountsError),

    #[error("Route registration failed: {0}")]
    Route(#[from] RouteError),

    /// A one-time wiring step (hooks, routers, invariants) failed.
    #[error("Wiring failed: {0}")]
    Wiring(#[from] ModuleError),

    /// A keeper was requested before the keeper it depends on was built.
    #[error("Keeper {module} needs {dependency}, which is not built yet")]
    MissingKeeper {
        /// Keeper being constructed
        module: String,
        /// Keeper it asked for
        dependency: String,
    },

    #[error("No store key issued for {0}")]
    MissingStoreKey(String),

    /// A module in the dependency order has no constructor.
    #[error("No keeper constructor for module {0}")]
    UnknownModule(String),
}

/// Errors raised while the assembled application runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error("Malformed genesis app state: {0}")]
    Genesis(String),

    #[error("Chain already initialized at height {0}")]
    AlreadyInitialized(u64),

    #[error("Chain not initialized")]
    NotInitialized,

    #[error("Expected block {expected}, got {got}")]
    UnexpectedHeight {
        /// Next height the application accepts
        expected: u64,
        /// Height that was offered
        got: u64,
    },

    #[error("Capability initialization failed: {0}")]
    Capability(#[from] CapabilityError),

    /// A lifecycle call arrived in the wrong block stage.
    #[error("{call} called out of order: block is {stage}")]
    OutOfOrder {
        /// Rejected call
        call: &'static str,
        /// Stage the block was in
        stage: BlockStage,
    },
}
