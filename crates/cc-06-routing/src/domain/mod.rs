//! # Domain Module
//!
//! Core domain types for capability routing.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
