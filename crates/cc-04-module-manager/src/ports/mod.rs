//! # Ports
//!
//! The lifecycle contract every installed module implements.

pub mod module;

pub use module::AppModule;
