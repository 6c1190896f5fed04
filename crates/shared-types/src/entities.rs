//! # Core Lifecycle Entities
//!
//! Defines what crosses the boundary between the execution pipeline and a
//! module hook.
//!
//! ## Clusters
//!
//! - **Phases**: `Phase`
//! - **Blocks**: `BlockHeader`, `Event`, `ValidatorUpdate`
//! - **Lifecycle messages**: `RequestInitChain`, `ResponseInitChain`,
//!   `RequestBeginBlock`, `ResponseBeginBlock`, `RequestEndBlock`,
//!   `ResponseEndBlock`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// CLUSTER A: PHASES
// =============================================================================

/// One of the three block-lifecycle points at which modules run hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Genesis initialization (once per chain).
    InitGenesis,
    /// Start of every block.
    BeginBlock,
    /// End of every block.
    EndBlock,
}

impl Phase {
    /// All phases in lifecycle order.
    pub const ALL: [Phase; 3] = [Phase::InitGenesis, Phase::BeginBlock, Phase::EndBlock];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitGenesis => "init_genesis",
            Self::BeginBlock => "begin_block",
            Self::EndBlock => "end_block",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CLUSTER B: BLOCKS
// =============================================================================

/// Header of the block being processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    /// Chain identifier.
    pub chain_id: String,
    /// Block height (0 during genesis).
    pub height: u64,
    /// Unix timestamp in seconds.
    pub time: u64,
    /// Proposer address, hex encoded.
    pub proposer: String,
}

/// A typed event emitted by a hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    pub attributes: BTreeMap<String, String>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute (builder style).
    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.insert(key.into(), value.to_string());
        self
    }
}

/// A change of voting power for one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    /// Consensus public key, hex encoded.
    pub pub_key: String,
    /// New voting power (0 removes the validator).
    pub power: u64,
}

// =============================================================================
// CLUSTER C: LIFECYCLE MESSAGES
// =============================================================================

/// Chain initialization request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequestInitChain {
    pub chain_id: String,
    /// Genesis time (Unix seconds).
    pub time: u64,
    /// Raw JSON app state: module name to module genesis.
    pub app_state_bytes: Vec<u8>,
    /// Consensus parameters; the application default applies when absent.
    #[serde(default)]
    pub consensus_params: Option<serde_json::Value>,
}

/// Chain initialization response.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ResponseInitChain {
    /// Initial validator set.
    pub validators: Vec<ValidatorUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequestBeginBlock {
    pub header: BlockHeader,
    /// Consensus keys of validators that failed to sign the previous block.
    #[serde(default)]
    pub missed_validators: Vec<String>,
    /// Consensus keys of validators caught double signing.
    #[serde(default)]
    pub byzantine_validators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ResponseBeginBlock {
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequestEndBlock {
    pub height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ResponseEndBlock {
    pub validator_updates: Vec<ValidatorUpdate>,
    pub events: Vec<Event>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::InitGenesis.to_string(), "init_genesis");
        assert_eq!(Phase::BeginBlock.to_string(), "begin_block");
        assert_eq!(Phase::EndBlock.to_string(), "end_block");
    }

    #[test]
    fn test_event_builder() {
        let event = Event::new("mint").attr("amount", 42).attr("denom", "coco");
        assert_eq!(event.kind, "mint");
        assert_eq!(event.attributes.get("amount").map(String::as_str), Some("42"));
        assert_eq!(event.attributes.len(), 2);
    }
}
