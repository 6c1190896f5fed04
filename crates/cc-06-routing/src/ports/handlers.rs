//! # Handler Ports
//!
//! Implemented by modules that register routes. Closures with the right
//! signature implement `ProposalHandler` and `EvidenceHandler` directly.

use cc_01_store::Context;
use cc_03_capability::Capability;
use shared_types::ModuleError;

use crate::domain::{Acknowledgement, ChannelOrder, Evidence, Packet, ProposalContent};

/// Executes a passed governance proposal.
pub trait ProposalHandler: Send + Sync {
    fn handle(&self, ctx: &mut Context<'_>, content: &ProposalContent) -> Result<(), ModuleError>;
}

impl<F> ProposalHandler for F
where
    F: Fn(&mut Context<'_>, &ProposalContent) -> Result<(), ModuleError> + Send + Sync,
{
    fn handle(&self, ctx: &mut Context<'_>, content: &ProposalContent) -> Result<(), ModuleError> {
        self(ctx, content)
    }
}

/// Processes submitted misbehaviour evidence.
pub trait EvidenceHandler: Send + Sync {
    fn handle(&self, ctx: &mut Context<'_>, evidence: &Evidence) -> Result<(), ModuleError>;
}

impl<F> EvidenceHandler for F
where
    F: Fn(&mut Context<'_>, &Evidence) -> Result<(), ModuleError> + Send + Sync,
{
    fn handle(&self, ctx: &mut Context<'_>, evidence: &Evidence) -> Result<(), ModuleError> {
        self(ctx, evidence)
    }
}

/// Channel and packet callbacks of a module bound to a port.
pub trait PortCallbacks: Send + Sync {
    /// Accept or refuse a channel opened on this port.
    ///
    /// `channel_cap` is the channel capability as issued to the routing
    /// module; the bound module claims it to obtain its own handle.
    fn on_chan_open_init(
        &self,
        ctx: &mut Context<'_>,
        order: ChannelOrder,
        port_id: &str,
        channel_id: &str,
        channel_cap: &Capability,
        version: &str,
    ) -> Result<(), ModuleError>;

    /// Handle an incoming packet. Failures become error acknowledgements.
    fn on_recv_packet(&self, ctx: &mut Context<'_>, packet: &Packet) -> Acknowledgement;

    fn on_acknowledgement_packet(
        &self,
        ctx: &mut Context<'_>,
        packet: &Packet,
        ack: &Acknowledgement,
    ) -> Result<(), ModuleError>;

    fn on_timeout_packet(&self, ctx: &mut Context<'_>, packet: &Packet) -> Result<(), ModuleError>;
}
