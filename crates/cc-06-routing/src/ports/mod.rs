//! # Ports
//!
//! Handler traits implemented by the modules that own routes.

pub mod handlers;

pub use handlers::{EvidenceHandler, PortCallbacks, ProposalHandler};
