//! # Capability Entities

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An unforgeable handle to an underlying object.
///
/// Fields are private: the only way to obtain one is through a
/// `ScopedCapabilityKeeper`, which stamps its own module name into it.
/// Two modules owning the same object therefore hold different handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Capability {
    index: u64,
    scope: String,
}

impl Capability {
    pub(crate) fn new(index: u64, scope: &str) -> Self {
        Self {
            index,
            scope: scope.to_string(),
        }
    }

    /// Global index of the underlying object.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Module whose scope issued this handle.
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

/// One `(module, name)` ownership of a capability.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub module: String,
    pub name: String,
}

impl Owner {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

/// Owners of one capability index, as exported in genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerEntry {
    pub index: u64,
    pub owners: BTreeSet<Owner>,
}

/// Genesis state of the capability module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityGenesis {
    /// Next index to hand out.
    pub index: u64,
    pub owners: Vec<OwnerEntry>,
}

impl Default for CapabilityGenesis {
    fn default() -> Self {
        Self {
            index: 1,
            owners: Vec::new(),
        }
    }
}

impl CapabilityGenesis {
    /// Check that indices are unique, below `index`, and owned.
    pub fn validate(&self) -> Result<(), String> {
        if self.index == 0 {
            return Err("capability index must be positive".to_string());
        }
        let mut seen = BTreeSet::new();
        for entry in &self.owners {
            if entry.index >= self.index {
                return Err(format!(
                    "owner index {} must be lower than next index {}",
                    entry.index, self.index
                ));
            }
            if !seen.insert(entry.index) {
                return Err(format!("duplicate owner index {}", entry.index));
            }
            if entry.owners.is_empty() {
                return Err(format!("capability {} has no owners", entry.index));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_genesis_valid() {
        assert!(CapabilityGenesis::default().validate().is_ok());
    }

    #[test]
    fn test_genesis_rejects_index_overflow() {
        let genesis = CapabilityGenesis {
            index: 2,
            owners: vec![OwnerEntry {
                index: 2,
                owners: [Owner::new("ibc", "ports/transfer")].into_iter().collect(),
            }],
        };
        assert!(genesis.validate().is_err());
    }

    #[test]
    fn test_genesis_rejects_ownerless_entry() {
        let genesis = CapabilityGenesis {
            index: 3,
            owners: vec![OwnerEntry {
                index: 1,
                owners: BTreeSet::new(),
            }],
        };
        assert!(genesis.validate().is_err());
    }
}
