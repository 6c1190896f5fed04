//! # Domain Module
//!
//! Core domain types for capability scoping.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
