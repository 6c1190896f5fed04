//! # Domain Errors
//!
//! Two disjoint classes: `RegistryError` is raised while the application is
//! assembled and stops the node from starting; `PhaseError` is raised while
//! a phase runs and is handed back to the execution pipeline.

use shared_types::{ModuleError, Phase};
use thiserror::Error;

/// Fatal configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A module with this name is already registered.
    #[error("Duplicate module registration: {0}")]
    DuplicateModule(String),

    /// Module names must be non-empty.
    #[error("Module name must not be empty")]
    EmptyModuleName,

    /// An order names a module that was never registered.
    #[error("Unknown module {module} in {phase} order")]
    UnknownModule {
        /// Phase being ordered
        phase: Phase,
        /// Offending name
        module: String,
    },

    /// An order lists the same module twice.
    #[error("Module {module} listed more than once in {phase} order")]
    DuplicateInOrder {
        /// Phase being ordered
        phase: Phase,
        /// Offending name
        module: String,
    },

    /// An order lists a module that does not implement the phase hook.
    #[error("Module {module} does not implement {phase} but is listed in its order")]
    ExtraInOrder {
        /// Phase being ordered
        phase: Phase,
        /// Offending name
        module: String,
    },

    /// An order leaves out modules that implement the phase hook.
    #[error("{phase} order is missing modules: {missing:?}")]
    MissingFromOrder {
        /// Phase being ordered
        phase: Phase,
        /// Modules implementing the phase but absent from the order
        missing: Vec<String>,
    },

    /// Modules implement a phase but no order was ever set for it.
    #[error("No {phase} order set although modules implement it: {modules:?}")]
    OrderNotSet {
        /// Phase left unordered
        phase: Phase,
        /// Modules implementing it
        modules: Vec<String>,
    },

    /// A module depends on a module that is not part of the graph.
    #[error("Module {module} depends on unknown module {dependency}")]
    UnknownDependency {
        /// Dependent module
        module: String,
        /// Missing dependency
        dependency: String,
    },

    /// Module dependencies form a cycle.
    #[error("Dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    /// An invariant route was registered twice.
    #[error("Duplicate invariant route: {module}/{route}")]
    DuplicateInvariant {
        /// Owning module
        module: String,
        /// Route name
        route: String,
    },
}

/// Recoverable errors raised while a phase runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    /// A module hook failed; the rest of the phase was not run.
    #[error("{phase} aborted in {module}: {source}")]
    HookFailed {
        /// Phase that aborted
        phase: Phase,
        /// Module whose hook failed
        module: String,
        /// Failure reported by the hook
        source: ModuleError,
    },

    /// The genesis document has no payload for a module that needs one.
    #[error("Genesis state missing for module {0}")]
    MissingGenesis(String),

    /// The genesis document has a payload no module accepts.
    #[error("Genesis state for unknown module {0}")]
    UnknownGenesisModule(String),

    /// A module rejected its genesis payload during validation.
    #[error("Invalid genesis for {module}: {source}")]
    InvalidGenesis {
        /// Module that rejected the payload
        module: String,
        /// Validation failure
        source: ModuleError,
    },

    /// A module could not produce its default genesis payload.
    #[error("Default genesis for {module} failed: {source}")]
    DefaultGenesis {
        /// Module that failed
        module: String,
        /// Encoding failure
        source: ModuleError,
    },

    /// Two modules both returned validator set updates in one phase.
    #[error("{phase}: validator updates from {second} but already set by {first}")]
    ConflictingValidatorUpdates {
        /// Phase that produced both updates
        phase: Phase,
        /// First module to return updates
        first: String,
        /// Second module to return updates
        second: String,
    },
}

/// An invariant route reported broken state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invariant broken: {module}/{route}: {message}")]
pub struct BrokenInvariant {
    /// Module owning the route
    pub module: String,
    /// Route name
    pub route: String,
    /// What the check found
    pub message: String,
}
