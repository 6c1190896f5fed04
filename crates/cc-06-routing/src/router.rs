//! # Router
//!
//! One dispatch table per domain. Keys are validated and checked for
//! duplicates on insertion; lookups are exact matches.

use std::collections::BTreeMap;
use std::fmt;

use cc_01_store::Context;
use tracing::{debug, info};

use crate::domain::{
    Acknowledgement, DispatchError, Evidence, Packet, ProposalContent, RouteDomain, RouteError,
};
use crate::ports::{EvidenceHandler, PortCallbacks, ProposalHandler};

pub type GovRouter = Router<dyn ProposalHandler>;
pub type EvidenceRouter = Router<dyn EvidenceHandler>;
pub type PortRouter = Router<dyn PortCallbacks>;

pub struct Router<H: ?Sized> {
    domain: RouteDomain,
    routes: BTreeMap<String, Box<H>>,
    sealed: bool,
}

impl<H: ?Sized> fmt::Debug for Router<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("domain", &self.domain)
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("sealed", &self.sealed)
            .finish()
    }
}

impl<H: ?Sized> Router<H> {
    pub fn new(domain: RouteDomain) -> Self {
        Self {
            domain,
            routes: BTreeMap::new(),
            sealed: false,
        }
    }

    pub fn domain(&self) -> RouteDomain {
        self.domain
    }

    /// Register `handler` under `key`. Chainable.
    ///
    /// # Errors
    ///
    /// - `Sealed` if the router was already sealed
    /// - `InvalidKey` if `key` is not acceptable in this domain
    /// - `DuplicateRoute` if `key` is already taken
    pub fn add_route(&mut self, key: &str, handler: Box<H>) -> Result<&mut Self, RouteError> {
        if self.sealed {
            return Err(RouteError::Sealed(self.domain));
        }
        if !self.domain.is_valid_key(key) {
            return Err(RouteError::InvalidKey {
                domain: self.domain,
                key: key.to_string(),
            });
        }
        if self.routes.contains_key(key) {
            return Err(RouteError::DuplicateRoute {
                domain: self.domain,
                key: key.to_string(),
            });
        }

        debug!("[Router] {} route added: {}", self.domain, key);
        self.routes.insert(key.to_string(), handler);
        Ok(self)
    }

    /// Forbid further registration.
    pub fn seal(&mut self) {
        if !self.sealed {
            info!(
                "[Router] {} router sealed with {} routes",
                self.domain,
                self.routes.len()
            );
        }
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn has_route(&self, key: &str) -> bool {
        self.routes.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The handler for `key`.
    pub fn route(&self, key: &str) -> Result<&H, DispatchError> {
        self.routes
            .get(key)
            .map(|h| h.as_ref())
            .ok_or_else(|| DispatchError::Unrecognized {
                domain: self.domain,
                key: key.to_string(),
            })
    }
}

impl Router<dyn ProposalHandler> {
    /// Execute a passed proposal through the handler of its route.
    pub fn dispatch(
        &self,
        ctx: &mut Context<'_>,
        content: &ProposalContent,
    ) -> Result<(), DispatchError> {
        self.route(&content.route)?.handle(ctx, content)?;
        Ok(())
    }
}

impl Router<dyn EvidenceHandler> {
    pub fn dispatch(&self, ctx: &mut Context<'_>, evidence: &Evidence) -> Result<(), DispatchError> {
        self.route(&evidence.route)?.handle(ctx, evidence)?;
        Ok(())
    }
}

impl Router<dyn PortCallbacks> {
    /// Deliver a packet to the module bound to its destination port.
    pub fn recv_packet(
        &self,
        ctx: &mut Context<'_>,
        packet: &Packet,
    ) -> Result<Acknowledgement, DispatchError> {
        Ok(self
            .route(&packet.destination_port)?
            .on_recv_packet(ctx, packet))
    }
}
