//! # Addresses
//!
//! Account address type, module account address derivation and the chain's
//! human-readable address prefixes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Staking denomination of the chain.
pub const DEFAULT_STAKE_DENOM: &str = "coco";

/// Main human-readable address prefix.
pub const BECH32_MAIN_PREFIX: &str = "cosmic";

pub const PREFIX_ACCOUNT: &str = "acc";
pub const PREFIX_VALIDATOR: &str = "val";
pub const PREFIX_CONSENSUS: &str = "cons";
pub const PREFIX_PUBLIC: &str = "pub";
pub const PREFIX_OPERATOR: &str = "oper";
pub const PREFIX_ADDRESS: &str = "addr";

/// Length in bytes of an account address.
pub const ADDRESS_LEN: usize = 20;

/// Full set of address prefixes derived from a main prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPrefixes {
    pub account_addr: String,
    pub account_pub: String,
    pub validator_addr: String,
    pub validator_pub: String,
    pub consensus_addr: String,
    pub consensus_pub: String,
}

impl AddressPrefixes {
    /// Derive all prefixes from `main`.
    pub fn from_main(main: &str) -> Self {
        let valoper = format!("{main}{PREFIX_VALIDATOR}{PREFIX_OPERATOR}");
        let valcons = format!("{main}{PREFIX_VALIDATOR}{PREFIX_CONSENSUS}");
        Self {
            account_addr: main.to_string(),
            account_pub: format!("{main}{PREFIX_PUBLIC}"),
            validator_pub: format!("{valoper}{PREFIX_PUBLIC}"),
            validator_addr: valoper,
            consensus_pub: format!("{valcons}{PREFIX_PUBLIC}"),
            consensus_addr: valcons,
        }
    }
}

impl Default for AddressPrefixes {
    fn default() -> Self {
        Self::from_main(BECH32_MAIN_PREFIX)
    }
}

/// A 20-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccAddress(pub [u8; ADDRESS_LEN]);

impl AccAddress {
    /// Address of the account owned by module `name`.
    ///
    /// Derived as the first 20 bytes of SHA-256 over the name, so two
    /// distinct names never share an account in practice and the mapping is
    /// identical on every node.
    pub fn for_module(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(bytes)
    }

    /// Parse a hex-encoded address.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let raw = hex::decode(s).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        if raw.len() != ADDRESS_LEN {
            return Err(AddressError::InvalidLength(raw.len()));
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Display for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Address parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid hex address: {0}")]
    InvalidHex(String),

    #[error("Invalid address length: {0} bytes, expected 20")]
    InvalidLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_address_deterministic() {
        let a = AccAddress::for_module("distribution");
        let b = AccAddress::for_module("distribution");
        assert_eq!(a, b);
        assert_ne!(a, AccAddress::for_module("Distribution"));
    }

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = AccAddress::for_module("mint");
        let parsed = AccAddress::from_hex(&addr.to_string()).unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn test_address_rejects_short_hex() {
        assert_eq!(
            AccAddress::from_hex("abcd"),
            Err(AddressError::InvalidLength(2))
        );
    }

    #[test]
    fn test_prefixes() {
        let p = AddressPrefixes::default();
        assert_eq!(p.account_addr, "cosmic");
        assert_eq!(p.account_pub, "cosmicpub");
        assert_eq!(p.validator_addr, "cosmicvaloper");
        assert_eq!(p.validator_pub, "cosmicvaloperpub");
        assert_eq!(p.consensus_addr, "cosmicvalcons");
        assert_eq!(p.consensus_pub, "cosmicvalconspub");
    }
}
