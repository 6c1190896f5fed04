//! # Routing Entities
//!
//! Route domains and the payloads dispatched through them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Port identifiers must be between these lengths (inclusive).
pub const PORT_ID_MIN_LEN: usize = 2;
pub const PORT_ID_MAX_LEN: usize = 128;

/// Which dispatch table a route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RouteDomain {
    /// Governance proposal handlers.
    Governance,
    /// Misbehaviour evidence handlers.
    Evidence,
    /// Cross-chain port callbacks.
    Port,
}

impl RouteDomain {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Governance => "governance",
            Self::Evidence => "evidence",
            Self::Port => "port",
        }
    }

    /// Whether `key` is an acceptable route key in this domain.
    ///
    /// Governance and evidence keys are non-empty ASCII alphanumerics. Port
    /// identifiers additionally allow `._+-#[]<>` and are length bounded.
    pub fn is_valid_key(&self, key: &str) -> bool {
        match self {
            Self::Governance | Self::Evidence => {
                !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric())
            }
            Self::Port => {
                (PORT_ID_MIN_LEN..=PORT_ID_MAX_LEN).contains(&key.len())
                    && key
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || "._+-#[]<>".contains(c))
            }
        }
    }
}

impl fmt::Display for RouteDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content of a governance proposal, routed by `route`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalContent {
    /// Router key of the module that executes the proposal.
    pub route: String,
    /// Proposal type within that module (e.g. `ParameterChange`).
    pub kind: String,
    pub title: String,
    pub description: String,
    /// Type-specific body, interpreted by the handler.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ProposalContent {
    pub fn new(route: &str, kind: &str, title: &str) -> Self {
        Self {
            route: route.to_string(),
            kind: kind.to_string(),
            title: title.to_string(),
            description: String::new(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Submitted misbehaviour evidence, routed by `route`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub route: String,
    pub kind: String,
    /// Height at which the misbehaviour happened.
    pub height: u64,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Channel ordering requested at handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelOrder {
    Ordered,
    Unordered,
}

/// A cross-chain packet, routed by `destination_port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub sequence: u64,
    pub source_port: String,
    pub source_channel: String,
    pub destination_port: String,
    pub destination_channel: String,
    pub data: Vec<u8>,
    /// Height after which the packet times out (0 disables).
    pub timeout_height: u64,
}

/// Result written back for a received packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Acknowledgement {
    Success(Vec<u8>),
    Error(String),
}

impl Acknowledgement {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
