//! # CC-04 Module Manager
//!
//! Holds the installed modules and runs their lifecycle hooks in three
//! explicitly configured orders.
//!
//! **Subsystem ID:** 04
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - `ModuleManagerBuilder` collects modules and the InitGenesis,
//!   BeginBlock and EndBlock orders, validating each order against the
//!   modules that actually implement the phase
//! - `ModuleManagerBuilder::build` converts the builder into an immutable
//!   `ModuleManager`; nothing can be registered or reordered afterwards
//! - `ModuleManager` runs every phase sequentially, each implementing
//!   module exactly once, aborting the phase on the first hook failure
//! - `DependencyGraph` sorts modules by their declared dependencies and
//!   rejects cycles
//! - `InvariantRegistry` collects the invariant routes asserted by crisis
//!
//! ## Error Classes
//!
//! | Error | Raised | Class |
//! |-------|--------|-------|
//! | `RegistryError` | while assembling | fatal, the node must not start |
//! | `PhaseError` | while running a phase | recoverable, reported to the caller |
//!
//! ## Module Structure
//!
//! ```text
//! cc-04-module-manager/
//! ├── domain/
//! │   ├── entities.rs    # ModuleDescriptor, GenesisState
//! │   ├── errors.rs      # RegistryError, PhaseError, BrokenInvariant
//! │   └── invariants.rs  # phase order rules
//! ├── ports/
//! │   └── module.rs      # AppModule (implemented by every module)
//! ├── builder.rs         # ModuleManagerBuilder
//! ├── manager.rs         # ModuleManager (phase runner)
//! ├── dependency.rs      # DependencyGraph (topological sort)
//! └── crisis.rs          # InvariantRegistry
//! ```

#![warn(clippy::all)]

pub mod builder;
pub mod crisis;
pub mod dependency;
pub mod domain;
pub mod manager;
pub mod ports;

pub use builder::ModuleManagerBuilder;
pub use crisis::{InvariantFn, InvariantRegistry};
pub use dependency::DependencyGraph;
pub use domain::{BrokenInvariant, GenesisState, ModuleDescriptor, PhaseError, RegistryError};
pub use manager::ModuleManager;
pub use ports::AppModule;
