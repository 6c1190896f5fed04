//! # Phase Order Rules
//!
//! An order for a phase must be a permutation of exactly the modules that
//! implement that phase's hook.

use std::collections::{BTreeMap, BTreeSet};

use shared_types::Phase;

use super::entities::ModuleDescriptor;
use super::errors::RegistryError;

/// Names of registered modules implementing `phase`.
pub fn implementers(
    modules: &BTreeMap<String, ModuleDescriptor>,
    phase: Phase,
) -> BTreeSet<String> {
    modules
        .values()
        .filter(|d| d.implements(phase))
        .map(|d| d.name.clone())
        .collect()
}

/// Check `order` against the registered modules.
///
/// Rejects unknown names, repeats, modules that do not implement the phase
/// and modules that implement it but were left out.
pub fn validate_order(
    phase: Phase,
    order: &[String],
    modules: &BTreeMap<String, ModuleDescriptor>,
) -> Result<(), RegistryError> {
    let mut seen = BTreeSet::new();

    for name in order {
        let Some(desc) = modules.get(name) else {
            return Err(RegistryError::UnknownModule {
                phase,
                module: name.clone(),
            });
        };
        if !seen.insert(name.clone()) {
            return Err(RegistryError::DuplicateInOrder {
                phase,
                module: name.clone(),
            });
        }
        if !desc.implements(phase) {
            return Err(RegistryError::ExtraInOrder {
                phase,
                module: name.clone(),
            });
        }
    }

    let missing: Vec<String> = implementers(modules, phase)
        .difference(&seen)
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(RegistryError::MissingFromOrder { phase, missing });
    }

    Ok(())
}
