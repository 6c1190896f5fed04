//! # CC-02 Parameter Subspaces
//!
//! Isolated, namespaced configuration stores, one per module.
//!
//! **Subsystem ID:** 02
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - `ParamsKeeper::subspace` creates a subspace on first use and returns
//!   the same instance afterwards
//! - `Subspace::with_key_table` seals a subspace to a fixed set of keys,
//!   at most once
//! - Writes are recorded in the transient store so a block can tell which
//!   parameters changed
//!
//! ## Module Structure
//!
//! ```text
//! cc-02-params/
//! ├── domain/          # KeyTable, ParamChange, ParamsError
//! ├── subspace.rs      # Subspace handle
//! └── keeper.rs        # ParamsKeeper (subspace registry)
//! ```

#![warn(clippy::all)]

pub mod domain;
pub mod keeper;
pub mod subspace;

pub use domain::{KeyTable, ParamChange, ParamValidator, ParamsError};
pub use keeper::ParamsKeeper;
pub use subspace::Subspace;

/// Module name of the params module.
pub const MODULE_NAME: &str = "params";

/// Persistent store key name.
pub const STORE_KEY: &str = "params";

/// Transient store key name.
pub const TSTORE_KEY: &str = "transient_params";
