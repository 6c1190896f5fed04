//! # Module Manager Builder
//!
//! The mutable half of the registry. Everything is checked here so that a
//! successfully built `ModuleManager` is known to be consistent.

use std::collections::BTreeMap;

use shared_types::Phase;
use tracing::info;

use crate::dependency::DependencyGraph;
use crate::domain::{implementers, validate_order, ModuleDescriptor, RegistryError};
use crate::manager::ModuleManager;
use crate::ports::AppModule;

#[derive(Default)]
pub struct ModuleManagerBuilder {
    modules: BTreeMap<String, Box<dyn AppModule>>,
    descriptors: BTreeMap<String, ModuleDescriptor>,
    declared: Vec<String>,
    orders: BTreeMap<Phase, Vec<String>>,
}

impl ModuleManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module.
    ///
    /// # Errors
    ///
    /// `DuplicateModule` if a module with the same name is already present.
    pub fn register(&mut self, module: Box<dyn AppModule>) -> Result<&mut Self, RegistryError> {
        let descriptor = module.descriptor();
        let name = descriptor.name.clone();

        if name.is_empty() {
            return Err(RegistryError::EmptyModuleName);
        }
        if self.modules.contains_key(&name) {
            return Err(RegistryError::DuplicateModule(name));
        }

        info!("[Registry] Registering module {}", name);
        self.declared.push(name.clone());
        self.descriptors.insert(name.clone(), descriptor);
        self.modules.insert(name, module);
        Ok(self)
    }

    /// Set the order in which `phase` hooks run.
    ///
    /// `names` must contain exactly the registered modules implementing the
    /// phase. Register every module before setting orders.
    pub fn set_order(&mut self, phase: Phase, names: &[&str]) -> Result<&mut Self, RegistryError> {
        let order: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();
        validate_order(phase, &order, &self.descriptors)?;
        self.orders.insert(phase, order);
        Ok(self)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Freeze the registry.
    ///
    /// Orders are validated again against the final module set, every phase
    /// with implementers must have an order, and the dependency graph must
    /// be acyclic.
    pub fn build(self) -> Result<ModuleManager, RegistryError> {
        let mut orders = BTreeMap::new();
        for phase in Phase::ALL {
            match self.orders.get(&phase) {
                Some(order) => {
                    validate_order(phase, order, &self.descriptors)?;
                    orders.insert(phase, order.clone());
                }
                None => {
                    let modules = implementers(&self.descriptors, phase);
                    if !modules.is_empty() {
                        return Err(RegistryError::OrderNotSet {
                            phase,
                            modules: modules.into_iter().collect(),
                        });
                    }
                    orders.insert(phase, Vec::new());
                }
            }
        }

        let mut graph = DependencyGraph::new();
        for name in &self.declared {
            if let Some(desc) = self.descriptors.get(name) {
                graph.add(name.clone(), &desc.dependencies);
            }
        }
        let dependency_order = graph.sort()?;

        info!(
            "[Registry] Module manager built with {} modules",
            self.modules.len()
        );
        Ok(ModuleManager::new(
            self.modules,
            self.descriptors,
            self.declared,
            orders,
            dependency_order,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub(ModuleDescriptor);

    impl AppModule for Stub {
        fn descriptor(&self) -> ModuleDescriptor {
            self.0.clone()
        }
    }

    fn stub(name: &str, hooks: &[Phase], deps: &[&str]) -> Box<dyn AppModule> {
        Box::new(Stub(
            ModuleDescriptor::new(name).with_hooks(hooks).depends_on(deps),
        ))
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let mut builder = ModuleManagerBuilder::new();
        builder.register(stub("bank", &[], &[])).unwrap();
        assert_eq!(
            builder.register(stub("bank", &[], &[])).err(),
            Some(RegistryError::DuplicateModule("bank".to_string()))
        );
    }

    #[test]
    fn test_build_requires_order_for_implemented_phase() {
        let mut builder = ModuleManagerBuilder::new();
        builder.register(stub("crisis", &[Phase::EndBlock], &[])).unwrap();
        assert!(matches!(
            builder.build(),
            Err(RegistryError::OrderNotSet { phase: Phase::EndBlock, .. })
        ));
    }

    #[test]
    fn test_build_revalidates_orders_after_late_registration() {
        let mut builder = ModuleManagerBuilder::new();
        builder.register(stub("gov", &[Phase::EndBlock], &[])).unwrap();
        builder.set_order(Phase::EndBlock, &["gov"]).unwrap();
        builder.register(stub("staking", &[Phase::EndBlock], &[])).unwrap();

        assert!(matches!(
            builder.build(),
            Err(RegistryError::MissingFromOrder { phase: Phase::EndBlock, .. })
        ));
    }

    #[test]
    fn test_build_rejects_dependency_cycle() {
        let mut builder = ModuleManagerBuilder::new();
        builder
            .register(stub("mint", &[], &["staking"]))
            .unwrap()
            .register(stub("staking", &[], &["mint"]))
            .unwrap();
        assert!(matches!(builder.build(), Err(RegistryError::DependencyCycle(_))));
    }

    #[test]
    fn test_build_computes_dependency_order() {
        let mut builder = ModuleManagerBuilder::new();
        builder
            .register(stub("slashing", &[], &["staking"]))
            .unwrap()
            .register(stub("staking", &[], &["bank"]))
            .unwrap()
            .register(stub("bank", &[], &[]))
            .unwrap();

        let manager = builder.build().unwrap();
        assert_eq!(manager.dependency_order(), ["bank", "staking", "slashing"]);
        assert_eq!(manager.module_names(), ["slashing", "staking", "bank"]);
    }
}
