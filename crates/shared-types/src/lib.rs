//! # Shared Types Crate
//!
//! Types shared by every CoCo crate: block lifecycle requests and
//! responses, module account addresses, and the failure type returned by
//! module hooks.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Opaque Modules**: Nothing in this crate knows what a module does; it
//!   only describes what flows in and out of a lifecycle hook.

pub mod address;
pub mod entities;
pub mod errors;

pub use address::*;
pub use entities::*;
pub use errors::*;
