//! # Domain Module
//!
//! Core domain types for parameter subspaces.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
