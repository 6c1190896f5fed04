//! # Module Account Entities

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Operation a module account may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    /// Create new coins.
    #[serde(rename = "minter")]
    Mint,
    /// Destroy coins held by the account.
    #[serde(rename = "burner")]
    Burn,
    /// Hold delegated stake.
    #[serde(rename = "staking")]
    Stake,
}

impl Permission {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mint => "minter",
            Self::Burn => "burner",
            Self::Stake => "staking",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the permission table: account name to granted operations.
pub type MaccPerms = BTreeMap<String, BTreeSet<Permission>>;

/// One module account and what it may do.
///
/// Fixed at registration; nothing mutates it at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAccountPermission {
    pub account: String,
    pub permissions: BTreeSet<Permission>,
    /// May be credited by ordinary transactions.
    pub receiving_allowed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_tags() {
        assert_eq!(Permission::Mint.to_string(), "minter");
        assert_eq!(
            serde_json::to_string(&Permission::Stake).unwrap(),
            "\"staking\""
        );
    }
}
