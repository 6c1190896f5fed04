//! # Domain Module
//!
//! Core domain types for module account permissions.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
