//! # Invariant Registry
//!
//! Modules register named checks over their own state; the crisis module
//! asserts all of them periodically and halts the chain when one breaks.

use std::collections::BTreeSet;
use std::fmt;

use cc_01_store::Context;
use tracing::{debug, error};

use crate::domain::{BrokenInvariant, RegistryError};

/// A state check. `Err` carries a description of what is broken.
pub type InvariantFn = Box<dyn Fn(&Context<'_>) -> Result<(), String> + Send + Sync>;

struct InvariantRoute {
    module: String,
    route: String,
    check: InvariantFn,
}

#[derive(Default)]
pub struct InvariantRegistry {
    routes: Vec<InvariantRoute>,
    keys: BTreeSet<(String, String)>,
}

impl fmt::Debug for InvariantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvariantRegistry")
            .field("routes", &self.route_names())
            .finish()
    }
}

impl InvariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, module: &str, route: &str, check: F) -> Result<(), RegistryError>
    where
        F: Fn(&Context<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        if !self.keys.insert((module.to_string(), route.to_string())) {
            return Err(RegistryError::DuplicateInvariant {
                module: module.to_string(),
                route: route.to_string(),
            });
        }
        debug!("[Crisis] Registered invariant {}/{}", module, route);
        self.routes.push(InvariantRoute {
            module: module.to_string(),
            route: route.to_string(),
            check: Box::new(check),
        });
        Ok(())
    }

    /// `module/route` for every registered invariant, in registration order.
    pub fn route_names(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| format!("{}/{}", r.module, r.route))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Run one invariant by module and route.
    pub fn assert_route(
        &self,
        ctx: &Context<'_>,
        module: &str,
        route: &str,
    ) -> Option<Result<(), BrokenInvariant>> {
        self.routes
            .iter()
            .find(|r| r.module == module && r.route == route)
            .map(|r| run(r, ctx))
    }

    /// Run every invariant, stopping at the first broken one.
    pub fn assert_all(&self, ctx: &Context<'_>) -> Result<(), BrokenInvariant> {
        for route in &self.routes {
            run(route, ctx)?;
        }
        debug!(
            "[Crisis] {} invariants hold at height {}",
            self.routes.len(),
            ctx.block_height()
        );
        Ok(())
    }
}

fn run(route: &InvariantRoute, ctx: &Context<'_>) -> Result<(), BrokenInvariant> {
    (route.check)(ctx).map_err(|message| {
        error!(
            "[Crisis] Invariant {}/{} broken: {}",
            route.module, route.route, message
        );
        BrokenInvariant {
            module: route.module.clone(),
            route: route.route.clone(),
            message,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_01_store::MultiStore;
    use shared_types::BlockHeader;

    #[test]
    fn test_duplicate_route_rejected() {
        let mut registry = InvariantRegistry::new();
        registry.register("bank", "total-supply", |_| Ok(())).unwrap();
        assert!(matches!(
            registry.register("bank", "total-supply", |_| Ok(())),
            Err(RegistryError::DuplicateInvariant { .. })
        ));
        registry.register("staking", "total-supply", |_| Ok(())).unwrap();
        assert_eq!(
            registry.route_names(),
            vec!["bank/total-supply", "staking/total-supply"]
        );
    }

    #[test]
    fn test_assert_all_reports_first_broken() {
        let mut registry = InvariantRegistry::new();
        registry.register("bank", "nonnegative", |_| Ok(())).unwrap();
        registry
            .register("staking", "module-accounts", |_| Err("pool mismatch".into()))
            .unwrap();
        registry
            .register("distribution", "can-withdraw", |_| Err("never reached".into()))
            .unwrap();

        let mut ms = MultiStore::new();
        let ctx = Context::new(&mut ms, BlockHeader::default());

        let broken = registry.assert_all(&ctx).unwrap_err();
        assert_eq!(broken.module, "staking");
        assert_eq!(broken.message, "pool mismatch");

        assert_eq!(registry.assert_route(&ctx, "bank", "nonnegative"), Some(Ok(())));
        assert_eq!(registry.assert_route(&ctx, "bank", "missing"), None);
    }
}
