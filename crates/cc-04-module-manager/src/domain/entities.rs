//! # Registry Entities

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use shared_types::Phase;

/// Genesis document app state: module name to that module's raw payload.
///
/// The registry routes payloads; it never looks inside them.
pub type GenesisState = BTreeMap<String, serde_json::Value>;

/// What a module declares about itself when it is registered.
///
/// Immutable once the manager is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Unique module name.
    pub name: String,
    /// Phases whose hook this module implements.
    pub hooks: BTreeSet<Phase>,
    /// Modules whose keepers must exist before this one is built.
    pub dependencies: Vec<String>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: BTreeSet::new(),
            dependencies: Vec::new(),
        }
    }

    /// Declare the phases this module takes part in.
    pub fn with_hooks(mut self, phases: &[Phase]) -> Self {
        self.hooks.extend(phases.iter().copied());
        self
    }

    /// Declare construction dependencies.
    pub fn depends_on(mut self, modules: &[&str]) -> Self {
        self.dependencies
            .extend(modules.iter().map(|m| (*m).to_string()));
        self
    }

    #[must_use]
    pub fn implements(&self, phase: Phase) -> bool {
        self.hooks.contains(&phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let desc = ModuleDescriptor::new("mint")
            .with_hooks(&[Phase::InitGenesis, Phase::BeginBlock])
            .depends_on(&["staking", "bank"]);

        assert!(desc.implements(Phase::BeginBlock));
        assert!(!desc.implements(Phase::EndBlock));
        assert_eq!(desc.dependencies, vec!["staking", "bank"]);
    }
}
