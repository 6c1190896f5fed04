//! # Transfer
//!
//! Fungible token transfer over IBC channels.
//!
//! Tokens leaving their origin are escrowed; tokens returning to their
//! origin are burned on the way out. Incoming vouchers carry their path as
//! a denom prefix: `{port}/{channel}/{base_denom}`.

use std::fmt;

use cc_01_store::{Context, StoreKey};
use cc_02_params::{KeyTable, ParamsError, Subspace};
use cc_03_capability::{Capability, ScopedCapabilityKeeper};
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use cc_06_routing::{Acknowledgement, ChannelOrder, Packet, PortCallbacks};
use serde::{Deserialize, Serialize};
use shared_types::{AccAddress, Event, ModuleError, Phase, ValidatorUpdate};
use tracing::{debug, info, warn};

use super::auth::AuthKeeper;
use super::bank::{BankKeeper, Coin};
use super::ibc::{channel_capability_path, port_path, IbcKeeper};
use super::{decode_genesis, encode_genesis, module_error};

pub const MODULE_NAME: &str = "transfer";
pub const STORE_KEY: &str = "transfer";
pub const PORT_ID: &str = "transfer";
pub const VERSION: &str = "ics20-1";

const KEY_SEND_ENABLED: &str = "SendEnabled";
const KEY_RECEIVE_ENABLED: &str = "ReceiveEnabled";
const PORT_KEY: &[u8] = b"port";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParams {
    pub send_enabled: bool,
    pub receive_enabled: bool,
}

impl Default for TransferParams {
    fn default() -> Self {
        Self {
            send_enabled: true,
            receive_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferGenesis {
    pub port_id: String,
    pub params: TransferParams,
}

impl Default for TransferGenesis {
    fn default() -> Self {
        Self {
            port_id: PORT_ID.to_string(),
            params: TransferParams::default(),
        }
    }
}

/// Packet payload of a fungible token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleTokenPacketData {
    /// Full denom path as known on the sending chain.
    pub denom: String,
    pub amount: u64,
    pub sender: String,
    pub receiver: String,
}

/// Address holding escrowed tokens for one channel.
pub fn escrow_address(port_id: &str, channel_id: &str) -> AccAddress {
    AccAddress::for_module(&format!("escrow/{port_id}/{channel_id}"))
}

/// Whether `denom` left this chain through `port/channel` and is now
/// coming back to its origin.
fn has_path_prefix(port_id: &str, channel_id: &str, denom: &str) -> bool {
    denom.starts_with(&format!("{port_id}/{channel_id}/"))
}

fn validate_bool(value: &serde_json::Value) -> Result<(), String> {
    value
        .as_bool()
        .map(|_| ())
        .ok_or_else(|| format!("expected bool, got {value}"))
}

fn key_table() -> Result<KeyTable, ParamsError> {
    KeyTable::new()
        .register(KEY_SEND_ENABLED, validate_bool)?
        .register(KEY_RECEIVE_ENABLED, validate_bool)
}

fn transfer_error(err: impl fmt::Display) -> ModuleError {
    module_error(MODULE_NAME, err)
}

#[derive(Debug, Clone)]
pub struct TransferKeeper {
    store_key: StoreKey,
    subspace: Subspace,
    scoped: ScopedCapabilityKeeper,
    ibc: IbcKeeper,
    auth: AuthKeeper,
    bank: BankKeeper,
}

impl TransferKeeper {
    pub fn new(
        store_key: StoreKey,
        subspace: Subspace,
        scoped: ScopedCapabilityKeeper,
        ibc: IbcKeeper,
        auth: AuthKeeper,
        bank: BankKeeper,
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
            ibc,
            auth,
            bank,
        })
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<TransferParams, ModuleError> {
        Ok(TransferParams {
            send_enabled: self
                .subspace
                .get_or(ctx, KEY_SEND_ENABLED, true)
                .map_err(transfer_error)?,
            receive_enabled: self
                .subspace
                .get_or(ctx, KEY_RECEIVE_ENABLED, true)
                .map_err(transfer_error)?,
        })
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &TransferParams) -> Result<(), ModuleError> {
        self.subspace
            .set(ctx, KEY_SEND_ENABLED, &params.send_enabled)
            .and_then(|_| self.subspace.set(ctx, KEY_RECEIVE_ENABLED, &params.receive_enabled))
            .map_err(transfer_error)
    }

    /// Port this module is bound to.
    pub fn port(&self, ctx: &Context<'_>) -> Result<String, ModuleError> {
        Ok(ctx
            .kv(&self.store_key)
            .and_then(|s| s.get_json(PORT_KEY))
            .map_err(transfer_error)?
            .unwrap_or_else(|| PORT_ID.to_string()))
    }

    /// Bind `port_id` through the routing module and claim the port
    /// capability into this scope.
    pub fn bind_port(&self, ctx: &mut Context<'_>, port_id: &str) -> Result<Capability, ModuleError> {
        let ibc_cap = self.ibc.bind_port(ctx, port_id)?;
        self.scoped
            .claim_capability(ctx, &ibc_cap, &port_path(port_id))
            .map_err(transfer_error)
    }

    pub fn is_bound(&self, ctx: &Context<'_>, port_id: &str) -> Result<bool, ModuleError> {
        self.ibc.is_bound(ctx, port_id)
    }

    /// Whether this module holds the capability for `port_id`.
    pub fn owns_port(&self, ctx: &Context<'_>, port_id: &str) -> Result<bool, ModuleError> {
        Ok(self
            .scoped
            .get_capability(ctx, &port_path(port_id))
            .map_err(transfer_error)?
            .is_some())
    }

    /// Send `coin` from `sender` to `receiver` on the other end of
    /// `source_channel`. Returns the packet sequence.
    pub fn send_transfer(
        &self,
        ctx: &mut Context<'_>,
        source_channel: &str,
        coin: &Coin,
        sender: &AccAddress,
        receiver: &str,
        timeout_height: u64,
    ) -> Result<u64, ModuleError> {
        if !self.params(ctx)?.send_enabled {
            return Err(transfer_error("transfers are disabled"));
        }
        if coin.amount == 0 {
            return Err(transfer_error("transfer amount must be positive"));
        }
        let port = self.port(ctx)?;
        let channel = self
            .ibc
            .channel(ctx, &port, source_channel)?
            .ok_or_else(|| transfer_error(format!("channel {port}/{source_channel} not found")))?;
        let cap = self
            .scoped
            .get_capability(ctx, &channel_capability_path(&port, source_channel))
            .map_err(transfer_error)?
            .ok_or_else(|| transfer_error(format!("no capability for {port}/{source_channel}")))?;

        if has_path_prefix(&port, source_channel, &coin.denom) {
            // Returning a voucher to its origin.
            self.bank
                .send_from_account_to_module(ctx, sender, MODULE_NAME, coin)?;
            self.bank.burn_coins(ctx, MODULE_NAME, coin)?;
        } else {
            let escrow = escrow_address(&port, source_channel);
            self.bank.send_coins(ctx, sender, &escrow, coin)?;
        }

        let data = FungibleTokenPacketData {
            denom: coin.denom.clone(),
            amount: coin.amount,
            sender: sender.to_string(),
            receiver: receiver.to_string(),
        };
        let packet = Packet {
            sequence: 0,
            source_port: port.clone(),
            source_channel: source_channel.to_string(),
            destination_port: channel.counterparty_port,
            destination_channel: channel.counterparty_channel,
            data: serde_json::to_vec(&data).map_err(transfer_error)?,
            timeout_height,
        };
        let sequence = self.ibc.send_packet(ctx, &self.scoped, &cap, packet)?;

        info!(
            "[Transfer] {} sent {} to {} over {}/{}",
            sender, coin, receiver, port, source_channel
        );
        Ok(sequence)
    }

    fn on_recv(&self, ctx: &mut Context<'_>, packet: &Packet) -> Result<(), ModuleError> {
        if !self.params(ctx)?.receive_enabled {
            return Err(transfer_error("receiving transfers is disabled"));
        }
        let data = decode_packet(packet)?;
        let receiver = AccAddress::from_hex(&data.receiver).map_err(transfer_error)?;

        if has_path_prefix(&packet.source_port, &packet.source_channel, &data.denom) {
            // Our own token coming home: release from escrow.
            let prefix_len = packet.source_port.len() + packet.source_channel.len() + 2;
            let denom = &data.denom[prefix_len..];
            let escrow = escrow_address(&packet.destination_port, &packet.destination_channel);
            self.bank
                .send_coins(ctx, &escrow, &receiver, &Coin::new(denom, data.amount))?;
        } else {
            let voucher = Coin::new(
                format!(
                    "{}/{}/{}",
                    packet.destination_port, packet.destination_channel, data.denom
                ),
                data.amount,
            );
            self.bank.mint_coins(ctx, MODULE_NAME, &voucher)?;
            self.bank
                .send_from_module_to_account(ctx, MODULE_NAME, &receiver, &voucher)?;
        }
        self.auth.ensure_account(ctx, &receiver)?;
        Ok(())
    }

    /// Undo the send side of a failed or timed out packet.
    fn refund(&self, ctx: &mut Context<'_>, packet: &Packet) -> Result<(), ModuleError> {
        let data = decode_packet(packet)?;
        let sender = AccAddress::from_hex(&data.sender).map_err(transfer_error)?;
        let coin = Coin::new(data.denom.clone(), data.amount);

        if has_path_prefix(&packet.source_port, &packet.source_channel, &data.denom) {
            self.bank.mint_coins(ctx, MODULE_NAME, &coin)?;
            self.bank
                .send_from_module_to_account(ctx, MODULE_NAME, &sender, &coin)?;
        } else {
            let escrow = escrow_address(&packet.source_port, &packet.source_channel);
            self.bank.send_coins(ctx, &escrow, &sender, &coin)?;
        }
        warn!(
            "[Transfer] Refunded {} to {} for packet {}",
            coin, sender, packet.sequence
        );
        Ok(())
    }
}

fn decode_packet(packet: &Packet) -> Result<FungibleTokenPacketData, ModuleError> {
    serde_json::from_slice(&packet.data)
        .map_err(|e| transfer_error(format!("malformed packet data: {e}")))
}

/// Channel and packet callbacks registered on the transfer port.
pub struct TransferIbcModule {
    keeper: TransferKeeper,
}

impl TransferIbcModule {
    pub fn new(keeper: TransferKeeper) -> Self {
        Self { keeper }
    }
}

impl PortCallbacks for TransferIbcModule {
    fn on_chan_open_init(
        &self,
        ctx: &mut Context<'_>,
        order: ChannelOrder,
        port_id: &str,
        channel_id: &str,
        channel_cap: &Capability,
        version: &str,
    ) -> Result<(), ModuleError> {
        if order != ChannelOrder::Unordered {
            return Err(transfer_error("transfer channels must be unordered"));
        }
        if version != VERSION {
            return Err(transfer_error(format!(
                "invalid version {version}, expected {VERSION}"
            )));
        }
        let bound = self.keeper.port(ctx)?;
        if port_id != bound {
            return Err(transfer_error(format!(
                "invalid port {port_id}, expected {bound}"
            )));
        }
        self.keeper
            .scoped
            .claim_capability(ctx, channel_cap, &channel_capability_path(port_id, channel_id))
            .map_err(transfer_error)?;
        debug!("[Transfer] Accepted channel {}/{}", port_id, channel_id);
        Ok(())
    }

    fn on_recv_packet(&self, ctx: &mut Context<'_>, packet: &Packet) -> Acknowledgement {
        match self.keeper.on_recv(ctx, packet) {
            Ok(()) => {
                ctx.emit(
                    Event::new("fungible_token_packet")
                        .attr("sequence", packet.sequence)
                        .attr("success", true),
                );
                Acknowledgement::Success(vec![1])
            }
            Err(e) => {
                warn!("[Transfer] Packet {} rejected: {}", packet.sequence, e);
                Acknowledgement::Error(e.message)
            }
        }
    }

    fn on_acknowledgement_packet(
        &self,
        ctx: &mut Context<'_>,
        packet: &Packet,
        ack: &Acknowledgement,
    ) -> Result<(), ModuleError> {
        if ack.is_success() {
            return Ok(());
        }
        self.keeper.refund(ctx, packet)
    }

    fn on_timeout_packet(&self, ctx: &mut Context<'_>, packet: &Packet) -> Result<(), ModuleError> {
        self.keeper.refund(ctx, packet)
    }
}

pub struct TransferModule {
    keeper: TransferKeeper,
}

impl TransferModule {
    pub fn new(keeper: TransferKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for TransferModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(MODULE_NAME)
            .with_hooks(&[Phase::InitGenesis])
            .depends_on(crate::app::layout::dependencies_of(MODULE_NAME))
    }

    fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &serde_json::Value,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        let state: TransferGenesis = decode_genesis(MODULE_NAME, genesis)?;
        self.keeper.set_params(ctx, &state.params)?;
        ctx.kv_mut(&self.keeper.store_key)
            .and_then(|s| s.set_json(PORT_KEY, &state.port_id))
            .map_err(transfer_error)?;

        if !self.keeper.is_bound(ctx, &state.port_id)? {
            self.keeper.bind_port(ctx, &state.port_id)?;
        }
        debug!("[Transfer] Genesis: bound to port {}", state.port_id);
        Ok(Vec::new())
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &TransferGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        let state: TransferGenesis = decode_genesis(MODULE_NAME, genesis)?;
        if !cc_06_routing::RouteDomain::Port.is_valid_key(&state.port_id) {
            return Err(transfer_error(format!("invalid port {}", state.port_id)));
        }
        Ok(())
    }
}
