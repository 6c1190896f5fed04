//! # Genesis
//!
//! The genesis document: chain id, genesis time, consensus parameters and
//! the per-module app state routed to InitGenesis.

mod builder;

pub use builder::{dev_pub_key, operator_address, GenesisBuilder, GenesisDoc, GenesisError};
