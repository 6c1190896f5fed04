//! # Domain Module
//!
//! Core domain types for store key allocation.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
