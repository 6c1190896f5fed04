//! # CC-03 Capability Scoping
//!
//! Object capabilities bound to the module that owns them.
//!
//! **Subsystem ID:** 03
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - `CapabilityKeeper::scope_to_module` hands each module its own scoped
//!   keeper; capabilities created through one scope cannot be authenticated
//!   through another
//! - `CapabilityKeeper::initialize_and_seal` runs once before block
//!   processing: it rebuilds the in-memory lookup tables from the
//!   persistent owner records and forbids any further scoping
//!
//! ## Security
//!
//! | Defense | Description |
//! |---------|-------------|
//! | Private token fields | Only a scoped keeper can mint a `Capability` |
//! | Scope-bound tokens | A token carries its owning module and is rejected elsewhere |
//! | Sealing | No new scope after startup, so no module can impersonate another |
//!
//! ## Module Structure
//!
//! ```text
//! cc-03-capability/
//! ├── domain/          # Capability, Owner, CapabilityGenesis, CapabilityError
//! ├── keeper.rs        # CapabilityKeeper (scoping + sealing)
//! └── scoped.rs        # ScopedCapabilityKeeper
//! ```

#![warn(clippy::all)]

pub mod domain;
pub mod keeper;
pub mod scoped;

pub use domain::{Capability, CapabilityError, CapabilityGenesis, Owner, OwnerEntry};
pub use keeper::CapabilityKeeper;
pub use scoped::ScopedCapabilityKeeper;

/// Module name of the capability module.
pub const MODULE_NAME: &str = "capability";

/// Persistent store key name.
pub const STORE_KEY: &str = "capability";

/// In-memory store key name.
pub const MEM_STORE_KEY: &str = "mem_capability";
