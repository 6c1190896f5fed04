//! # IBC
//!
//! Light client registry, port binding, channels and packet relay.
//!
//! Ports and channels are guarded by capabilities: binding a port creates
//! `ports/{port}` in this module's scope, opening a channel creates
//! `capabilities/ports/{port}/channels/{channel}` and hands it to the
//! module bound to the port, which claims its own handle. Sending a packet
//! requires the sender to authenticate its channel handle.
//!
//! Channels open in a single step: this node relays to itself, so there is
//! no counterparty handshake.
//!
//! ## Store Layout
//!
//! ```text
//! clients/{client_id}                     -> ClientState
//! next_client_sequence                    -> u64
//! next_channel_sequence                   -> u64
//! channels/{port}/{channel}               -> ChannelEnd
//! next_sequence_send/{port}/{channel}     -> u64
//! commitments/{port}/{channel}/{seq}      -> hex sha256 of packet data
//! acks/{port}/{channel}/{seq}             -> Acknowledgement
//! localhost_height                        -> u64
//! upgraded_consensus/{height}             -> UpgradedConsensus
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use cc_01_store::{Context, StoreKey};
use cc_02_params::{KeyTable, ParamsError, Subspace};
use cc_03_capability::{Capability, ScopedCapabilityKeeper};
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use cc_06_routing::{
    Acknowledgement, ChannelOrder, EvidenceHandler, Packet, PortRouter, RouteDomain,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{Event, ModuleError, Phase, RequestBeginBlock, ValidatorUpdate};
use tracing::{debug, info, warn};

use super::staking::StakingKeeper;
use super::upgrade::UpgradeKeeper;
use super::{decode_genesis, encode_genesis, evidence_handler, module_error};

pub const MODULE_NAME: &str = "ibc";
pub const STORE_KEY: &str = "ibc";
/// Evidence route for light client misbehaviour.
pub const MISBEHAVIOUR_ROUTE: &str = "clientmisbehaviour";
pub const TENDERMINT_CLIENT: &str = "07-tendermint";
pub const LOCALHOST_CLIENT: &str = "09-localhost";

const KEY_ALLOWED_CLIENTS: &str = "AllowedClients";
const NEXT_CLIENT_SEQUENCE: &[u8] = b"next_client_sequence";
const NEXT_CHANNEL_SEQUENCE: &[u8] = b"next_channel_sequence";
const LOCALHOST_HEIGHT: &[u8] = b"localhost_height";
const CLIENTS_PREFIX: &str = "clients/";

/// Capability name of a bound port.
pub fn port_path(port_id: &str) -> String {
    format!("ports/{port_id}")
}

/// Capability name of an open channel.
pub fn channel_capability_path(port_id: &str, channel_id: &str) -> String {
    format!("capabilities/ports/{port_id}/channels/{channel_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcParams {
    pub allowed_clients: Vec<String>,
}

impl Default for IbcParams {
    fn default() -> Self {
        Self {
            allowed_clients: vec![TENDERMINT_CLIENT.to_string(), LOCALHOST_CLIENT.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    pub client_id: String,
    pub client_type: String,
    pub chain_id: String,
    pub latest_height: u64,
    #[serde(default)]
    pub frozen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEnd {
    pub ordering: ChannelOrder,
    pub counterparty_port: String,
    pub counterparty_channel: String,
    pub version: String,
}

/// Consensus snapshot stored one block before a scheduled upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradedConsensus {
    pub chain_id: String,
    pub height: u64,
    pub plan: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcGenesis {
    pub params: IbcParams,
    #[serde(default)]
    pub clients: Vec<ClientState>,
    #[serde(default)]
    pub next_client_sequence: u64,
    #[serde(default)]
    pub next_channel_sequence: u64,
}

impl IbcGenesis {
    pub fn validate(&self) -> Result<(), String> {
        let mut ids = std::collections::BTreeSet::new();
        for client in &self.clients {
            if !self.params.allowed_clients.contains(&client.client_type) {
                return Err(format!("client type {} not allowed", client.client_type));
            }
            if !ids.insert(client.client_id.as_str()) {
                return Err(format!("duplicate client {}", client.client_id));
            }
        }
        if (self.clients.len() as u64) > self.next_client_sequence {
            return Err("next client sequence below number of clients".to_string());
        }
        Ok(())
    }
}

/// Evidence payload for light client misbehaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Misbehaviour {
    pub client_id: String,
}

fn validate_client_list(value: &serde_json::Value) -> Result<(), String> {
    let list: Vec<String> = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    if list.iter().any(|c| c.trim().is_empty()) {
        return Err("client types must not be empty".to_string());
    }
    Ok(())
}

fn key_table() -> Result<KeyTable, ParamsError> {
    KeyTable::new().register(KEY_ALLOWED_CLIENTS, validate_client_list)
}

fn ibc_error(err: impl fmt::Display) -> ModuleError {
    module_error(MODULE_NAME, err)
}

#[derive(Clone)]
pub struct IbcKeeper {
    store_key: StoreKey,
    subspace: Subspace,
    scoped: ScopedCapabilityKeeper,
    staking: StakingKeeper,
    upgrade: UpgradeKeeper,
    router: Arc<OnceLock<PortRouter>>,
}

impl fmt::Debug for IbcKeeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbcKeeper")
            .field("store_key", &self.store_key)
            .field("router", &self.router.get())
            .finish()
    }
}

impl IbcKeeper {
    pub fn new(
        store_key: StoreKey,
        subspace: Subspace,
        scoped: ScopedCapabilityKeeper,
        staking: StakingKeeper,
        upgrade: UpgradeKeeper,
    ) -> Result<Self, ParamsError> {
        let subspace = if subspace.has_key_table() {
            subspace
        } else {
            subspace.with_key_table(key_table()?)?
        };
        Ok(Self {
            store_key,
            subspace,
            scoped,
            staking,
            upgrade,
            router: Arc::new(OnceLock::new()),
        })
    }

    /// Install the port router. It is sealed on installation.
    ///
    /// # Errors
    ///
    /// The router can only be set once.
    pub fn set_router(&self, mut router: PortRouter) -> Result<(), ModuleError> {
        router.seal();
        let ports = router.keys().join(", ");
        self.router
            .set(router)
            .map_err(|_| ibc_error("cannot set port router twice"))?;
        info!("[IBC] Port router installed: {}", ports);
        Ok(())
    }

    pub fn router(&self) -> Result<&PortRouter, ModuleError> {
        self.router
            .get()
            .ok_or_else(|| ibc_error("port router not set"))
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<IbcParams, ModuleError> {
        Ok(IbcParams {
            allowed_clients: self
                .subspace
                .get_or(ctx, KEY_ALLOWED_CLIENTS, IbcParams::default().allowed_clients)
                .map_err(ibc_error)?,
        })
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &IbcParams) -> Result<(), ModuleError> {
        self.subspace
            .set(ctx, KEY_ALLOWED_CLIENTS, &params.allowed_clients)
            .map_err(ibc_error)
    }

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    pub fn create_client(
        &self,
        ctx: &mut Context<'_>,
        client_type: &str,
        chain_id: &str,
        height: u64,
    ) -> Result<String, ModuleError> {
        if !self.params(ctx)?.allowed_clients.iter().any(|c| c == client_type) {
            return Err(ibc_error(format!("client type {client_type} not allowed")));
        }
        let sequence = self.next_sequence(ctx, NEXT_CLIENT_SEQUENCE)?;
        let client = ClientState {
            client_id: format!("{client_type}-{sequence}"),
            client_type: client_type.to_string(),
            chain_id: chain_id.to_string(),
            latest_height: height,
            frozen: false,
        };
        self.set_client(ctx, &client)?;

        info!("[IBC] Created client {} for {}", client.client_id, chain_id);
        ctx.emit(
            Event::new("create_client")
                .attr("client_id", &client.client_id)
                .attr("client_type", client_type),
        );
        Ok(client.client_id)
    }

    pub fn client_state(&self, ctx: &Context<'_>, client_id: &str) -> Result<Option<ClientState>, ModuleError> {
        self.get(ctx, format!("{CLIENTS_PREFIX}{client_id}"))
    }

    /// Freeze a client after misbehaviour. Frozen clients verify nothing.
    pub fn freeze_client(&self, ctx: &mut Context<'_>, client_id: &str) -> Result<(), ModuleError> {
        let mut client = self
            .client_state(ctx, client_id)?
            .ok_or_else(|| ibc_error(format!("unknown client {client_id}")))?;
        if client.frozen {
            return Err(ibc_error(format!("client {client_id} already frozen")));
        }
        client.frozen = true;
        self.set_client(ctx, &client)?;

        warn!("[IBC] Client {} frozen for misbehaviour", client_id);
        ctx.emit(Event::new("client_misbehaviour").attr("client_id", client_id));
        Ok(())
    }

    /// Handler for the `clientmisbehaviour` evidence route.
    pub fn misbehaviour_handler(&self) -> Box<dyn EvidenceHandler> {
        let keeper = self.clone();
        evidence_handler(move |ctx, evidence| {
            let misbehaviour: Misbehaviour =
                serde_json::from_value(evidence.data.clone()).map_err(ibc_error)?;
            keeper.freeze_client(ctx, &misbehaviour.client_id)
        })
    }

    // -------------------------------------------------------------------------
    // Ports and channels
    // -------------------------------------------------------------------------

    /// Bind `port_id` and return this module's port capability.
    pub fn bind_port(&self, ctx: &mut Context<'_>, port_id: &str) -> Result<Capability, ModuleError> {
        if !RouteDomain::Port.is_valid_key(port_id) {
            return Err(ibc_error(format!("invalid port identifier {port_id}")));
        }
        if self.is_bound(ctx, port_id)? {
            return Err(ibc_error(format!("port {port_id} is already bound")));
        }
        let cap = self
            .scoped
            .new_capability(ctx, &port_path(port_id))
            .map_err(ibc_error)?;
        info!("[IBC] Bound port {}", port_id);
        Ok(cap)
    }

    pub fn is_bound(&self, ctx: &Context<'_>, port_id: &str) -> Result<bool, ModuleError> {
        Ok(self
            .scoped
            .get_capability(ctx, &port_path(port_id))
            .map_err(ibc_error)?
            .is_some())
    }

    /// Open a channel on a bound port and let the port's module accept it.
    pub fn chan_open_init(
        &self,
        ctx: &mut Context<'_>,
        port_id: &str,
        order: ChannelOrder,
        counterparty_port: &str,
        counterparty_channel: &str,
        version: &str,
    ) -> Result<String, ModuleError> {
        if !self.is_bound(ctx, port_id)? {
            return Err(ibc_error(format!("port {port_id} is not bound")));
        }
        let callbacks = self.router()?.route(port_id).map_err(ibc_error)?;

        let sequence = self.next_sequence(ctx, NEXT_CHANNEL_SEQUENCE)?;
        let channel_id = format!("channel-{sequence}");
        let cap = self
            .scoped
            .new_capability(ctx, &channel_capability_path(port_id, &channel_id))
            .map_err(ibc_error)?;

        callbacks.on_chan_open_init(ctx, order, port_id, &channel_id, &cap, version)?;

        let channel = ChannelEnd {
            ordering: order,
            counterparty_port: counterparty_port.to_string(),
            counterparty_channel: counterparty_channel.to_string(),
            version: version.to_string(),
        };
        self.set(ctx, channel_key(port_id, &channel_id), &channel)?;

        info!("[IBC] Opened {}/{} ({})", port_id, channel_id, version);
        ctx.emit(
            Event::new("channel_open_init")
                .attr("port_id", port_id)
                .attr("channel_id", &channel_id),
        );
        Ok(channel_id)
    }

    pub fn channel(
        &self,
        ctx: &Context<'_>,
        port_id: &str,
        channel_id: &str,
    ) -> Result<Option<ChannelEnd>, ModuleError> {
        self.get(ctx, channel_key(port_id, channel_id))
    }

    // -------------------------------------------------------------------------
    // Packets
    // -------------------------------------------------------------------------

    /// Commit an outgoing packet. `owner` must hold `channel_cap`.
    ///
    /// Fills in the packet sequence and returns it.
    pub fn send_packet(
        &self,
        ctx: &mut Context<'_>,
        owner: &ScopedCapabilityKeeper,
        channel_cap: &Capability,
        mut packet: Packet,
    ) -> Result<u64, ModuleError> {
        let cap_name = channel_capability_path(&packet.source_port, &packet.source_channel);
        if !owner
            .authenticate_capability(ctx, channel_cap, &cap_name)
            .map_err(ibc_error)?
        {
            return Err(ibc_error(format!(
                "{} does not own channel {}/{}",
                owner.module(),
                packet.source_port,
                packet.source_channel
            )));
        }
        let channel = self
            .channel(ctx, &packet.source_port, &packet.source_channel)?
            .ok_or_else(|| {
                ibc_error(format!(
                    "channel {}/{} not found",
                    packet.source_port, packet.source_channel
                ))
            })?;
        if packet.destination_port != channel.counterparty_port
            || packet.destination_channel != channel.counterparty_channel
        {
            return Err(ibc_error("packet destination does not match channel counterparty"));
        }
        if packet.timeout_height != 0 && packet.timeout_height <= ctx.block_height() {
            return Err(ibc_error("packet timeout height already passed"));
        }

        let seq_key = format!(
            "next_sequence_send/{}/{}",
            packet.source_port, packet.source_channel
        );
        packet.sequence = self.next_sequence(ctx, seq_key.as_bytes())? + 1;
        self.set(
            ctx,
            commitment_key(&packet.source_port, &packet.source_channel, packet.sequence),
            &commitment(&packet.data),
        )?;

        debug!(
            "[IBC] Sent packet {} on {}/{}",
            packet.sequence, packet.source_port, packet.source_channel
        );
        ctx.emit(
            Event::new("send_packet")
                .attr("sequence", packet.sequence)
                .attr("src_port", &packet.source_port)
                .attr("src_channel", &packet.source_channel),
        );
        Ok(packet.sequence)
    }

    /// Deliver a packet to the module bound to its destination port and
    /// write the acknowledgement.
    pub fn recv_packet(&self, ctx: &mut Context<'_>, packet: &Packet) -> Result<Acknowledgement, ModuleError> {
        if self
            .channel(ctx, &packet.destination_port, &packet.destination_channel)?
            .is_none()
        {
            return Err(ibc_error(format!(
                "channel {}/{} not found",
                packet.destination_port, packet.destination_channel
            )));
        }
        if packet.timeout_height != 0 && ctx.block_height() >= packet.timeout_height {
            return Err(ibc_error("packet timed out"));
        }
        let ack_key = ack_key(
            &packet.destination_port,
            &packet.destination_channel,
            packet.sequence,
        );
        if self.get::<Acknowledgement>(ctx, ack_key.clone())?.is_some() {
            return Err(ibc_error(format!("packet {} already received", packet.sequence)));
        }

        let ack = self.router()?.recv_packet(ctx, packet).map_err(ibc_error)?;
        self.set(ctx, ack_key, &ack)?;

        debug!(
            "[IBC] Received packet {} on {}/{}: success={}",
            packet.sequence,
            packet.destination_port,
            packet.destination_channel,
            ack.is_success()
        );
        ctx.emit(
            Event::new("write_acknowledgement")
                .attr("sequence", packet.sequence)
                .attr("dst_port", &packet.destination_port)
                .attr("success", ack.is_success()),
        );
        Ok(ack)
    }

    pub fn acknowledgement(
        &self,
        ctx: &Context<'_>,
        port_id: &str,
        channel_id: &str,
        sequence: u64,
    ) -> Result<Option<Acknowledgement>, ModuleError> {
        self.get(ctx, ack_key(port_id, channel_id, sequence))
    }

    /// Hand an acknowledgement back to the sending module.
    pub fn acknowledge_packet(
        &self,
        ctx: &mut Context<'_>,
        packet: &Packet,
        ack: &Acknowledgement,
    ) -> Result<(), ModuleError> {
        self.clear_commitment(ctx, packet)?;
        self.router()?
            .route(&packet.source_port)
            .map_err(ibc_error)?
            .on_acknowledgement_packet(ctx, packet, ack)
    }

    /// Refund a packet whose timeout height has been reached.
    pub fn timeout_packet(&self, ctx: &mut Context<'_>, packet: &Packet) -> Result<(), ModuleError> {
        if packet.timeout_height == 0 || ctx.block_height() < packet.timeout_height {
            return Err(ibc_error(format!(
                "packet {} has not timed out at height {}",
                packet.sequence,
                ctx.block_height()
            )));
        }
        self.clear_commitment(ctx, packet)?;
        self.router()?
            .route(&packet.source_port)
            .map_err(ibc_error)?
            .on_timeout_packet(ctx, packet)
    }

    pub fn has_commitment(&self, ctx: &Context<'_>, packet: &Packet) -> Result<bool, ModuleError> {
        Ok(self
            .get::<String>(
                ctx,
                commitment_key(&packet.source_port, &packet.source_channel, packet.sequence),
            )?
            .is_some())
    }

    // -------------------------------------------------------------------------
    // Block hooks
    // -------------------------------------------------------------------------

    pub fn localhost_height(&self, ctx: &Context<'_>) -> Result<u64, ModuleError> {
        Ok(self.get(ctx, LOCALHOST_HEIGHT)?.unwrap_or(0))
    }

    pub fn upgraded_consensus(&self, ctx: &Context<'_>, height: u64) -> Result<Option<UpgradedConsensus>, ModuleError> {
        self.get(ctx, format!("upgraded_consensus/{height}"))
    }

    /// Track our own height and, one block ahead of a scheduled upgrade,
    /// record the consensus state counterparties will need.
    pub fn begin_block(&self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        let height = ctx.block_height();
        self.set(ctx, LOCALHOST_HEIGHT, &height)?;

        let localhost: Vec<ClientState> = self
            .clients(ctx)?
            .into_iter()
            .filter(|c| c.client_type == LOCALHOST_CLIENT && !c.frozen)
            .collect();
        for mut client in localhost {
            client.latest_height = height;
            self.set_client(ctx, &client)?;
        }

        if let Some(plan) = self.upgrade.get_plan(ctx)? {
            if plan.height == height + 1 {
                let snapshot = UpgradedConsensus {
                    chain_id: ctx.chain_id().to_string(),
                    height,
                    plan: plan.name.clone(),
                };
                self.set(ctx, format!("upgraded_consensus/{}", plan.height), &snapshot)?;
                info!("[IBC] Stored upgraded consensus state for {}", plan.name);
            }
        }

        if let Some(info) = self.staking.historical_info(ctx, height)? {
            debug!(
                "[IBC] Self consensus at {}: {} validators",
                height,
                info.validators.len()
            );
        }
        Ok(())
    }

    fn clients(&self, ctx: &Context<'_>) -> Result<Vec<ClientState>, ModuleError> {
        let store = ctx.kv(&self.store_key).map_err(ibc_error)?;
        store
            .iter_prefix(CLIENTS_PREFIX.as_bytes())
            .map(|(_, raw)| serde_json::from_slice(raw).map_err(ibc_error))
            .collect()
    }

    fn set_client(&self, ctx: &mut Context<'_>, client: &ClientState) -> Result<(), ModuleError> {
        self.set(ctx, format!("{CLIENTS_PREFIX}{}", client.client_id), client)
    }

    fn clear_commitment(&self, ctx: &mut Context<'_>, packet: &Packet) -> Result<(), ModuleError> {
        let key = commitment_key(&packet.source_port, &packet.source_channel, packet.sequence);
        let stored: Option<String> = self.get(ctx, key.clone())?;
        if stored.as_deref() != Some(commitment(&packet.data).as_str()) {
            return Err(ibc_error(format!(
                "no commitment for packet {} on {}/{}",
                packet.sequence, packet.source_port, packet.source_channel
            )));
        }
        ctx.kv_mut(&self.store_key)
            .map_err(ibc_error)?
            .delete(key.as_bytes());
        Ok(())
    }

    /// Read the counter under `key` and advance it.
    fn next_sequence(&self, ctx: &mut Context<'_>, key: &[u8]) -> Result<u64, ModuleError> {
        let current: u64 = self.get(ctx, key)?.unwrap_or(0);
        self.set(ctx, key, &(current + 1))?;
        Ok(current)
    }

    fn get<T: serde::de::DeserializeOwned>(
        &self,
        ctx: &Context<'_>,
        key: impl AsRef<[u8]>,
    ) -> Result<Option<T>, ModuleError> {
        ctx.kv(&self.store_key)
            .and_then(|s| s.get_json(key.as_ref()))
            .map_err(ibc_error)
    }

    fn set<T: Serialize>(
        &self,
        ctx: &mut Context<'_>,
        key: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<(), ModuleError> {
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(key.as_ref(), value))
            .map_err(ibc_error)
    }
}

fn channel_key(port_id: &str, channel_id: &str) -> String {
    format!("channels/{port_id}/{channel_id}")
}

fn commitment_key(port_id: &str, channel_id: &str, sequence: u64) -> String {
    format!("commitments/{port_id}/{channel_id}/{sequence}")
}

fn ack_key(port_id: &str, channel_id: &str, sequence: u64) -> String {
    format!("acks/{port_id}/{channel_id}/{sequence}")
}

fn commitment(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub struct IbcModule {
    keeper: IbcKeeper,
}

impl IbcModule {
    pub fn new(keeper: IbcKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for IbcModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(MODULE_NAME)
            .with_hooks(&[Phase::InitGenesis, Phase::BeginBlock])
            .depends_on(crate::app::layout::dependencies_of(MODULE_NAME))
    }

    fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &serde_json::Value,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        let state: IbcGenesis = decode_genesis(MODULE_NAME, genesis)?;
        state.validate().map_err(ibc_error)?;
        self.keeper.set_params(ctx, &state.params)?;
        for client in &state.clients {
            self.keeper.set_client(ctx, client)?;
        }
        self.keeper
            .set(ctx, NEXT_CLIENT_SEQUENCE, &state.next_client_sequence)?;
        self.keeper
            .set(ctx, NEXT_CHANNEL_SEQUENCE, &state.next_channel_sequence)?;

        debug!("[IBC] Genesis: {} clients", state.clients.len());
        Ok(Vec::new())
    }

    fn begin_block(&self, ctx: &mut Context<'_>, _req: &RequestBeginBlock) -> Result<(), ModuleError> {
        self.keeper.begin_block(ctx)
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &IbcGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        decode_genesis::<IbcGenesis>(MODULE_NAME, genesis)?
            .validate()
            .map_err(ibc_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_paths() {
        assert_eq!(port_path("transfer"), "ports/transfer");
        assert_eq!(
            channel_capability_path("transfer", "channel-0"),
            "capabilities/ports/transfer/channels/channel-0"
        );
    }

    #[test]
    fn test_genesis_rejects_disallowed_client() {
        let genesis = IbcGenesis {
            params: IbcParams {
                allowed_clients: vec![TENDERMINT_CLIENT.to_string()],
            },
            clients: vec![ClientState {
                client_id: "09-localhost-0".to_string(),
                client_type: LOCALHOST_CLIENT.to_string(),
                chain_id: "coco".to_string(),
                latest_height: 1,
                frozen: false,
            }],
            next_client_sequence: 1,
            next_channel_sequence: 0,
        };
        assert!(genesis.validate().is_err());
    }
}
