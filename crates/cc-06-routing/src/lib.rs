//! # CC-06 Capability Routing
//!
//! Per-domain dispatch tables mapping a route key to the module handler
//! registered for it.
//!
//! **Subsystem ID:** 06
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - `Router<H>` is one dispatch table for one `RouteDomain`; routes are
//!   added fluently during assembly and the table is sealed when handed to
//!   its owning keeper
//! - Registration failures (`RouteError`) are fatal; an unmatched key at
//!   dispatch time (`DispatchError::Unrecognized`) is an ordinary rejected
//!   message
//!
//! ## Routers
//!
//! | Alias | Domain | Handler port |
//! |-------|--------|--------------|
//! | `GovRouter` | governance proposals | `ProposalHandler` |
//! | `EvidenceRouter` | misbehaviour evidence | `EvidenceHandler` |
//! | `PortRouter` | cross-chain ports | `PortCallbacks` |
//!
//! ## Module Structure
//!
//! ```text
//! cc-06-routing/
//! ├── domain/          # RouteDomain, payloads, RouteError, DispatchError
//! ├── ports/
//! │   └── handlers.rs  # ProposalHandler, EvidenceHandler, PortCallbacks
//! └── router.rs        # Router<H>
//! ```

#![warn(clippy::all)]

pub mod domain;
pub mod ports;
pub mod router;

pub use domain::{
    Acknowledgement, ChannelOrder, DispatchError, Evidence, Packet, ProposalContent, RouteDomain,
    RouteError,
};
pub use ports::{EvidenceHandler, PortCallbacks, ProposalHandler};
pub use router::{EvidenceRouter, GovRouter, PortRouter, Router};
