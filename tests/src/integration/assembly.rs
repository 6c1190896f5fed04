//! # Assembly Scenarios
//!
//! Wiring mistakes that must stop the application before its first block:
//! bad phase orders, duplicate store keys, dependency cycles and duplicate
//! invariant routes. Also the module account exports built at assembly.

#[cfg(test)]
mod tests {
    use cc_01_store::{MultiStore, StoreError, StoreKeyAllocator, StoreKind};
    use cc_04_module_manager::{InvariantRegistry, ModuleManagerBuilder, RegistryError};
    use cc_05_module_accounts::{ModuleAccountsBuilder, Permission};
    use shared_types::{AccAddress, Phase};

    use crate::integration::fixtures::{with_context, CallLog, RecordingModule};

    fn two_module_builder(log: &CallLog) -> ModuleManagerBuilder {
        let mut builder = ModuleManagerBuilder::new();
        builder
            .register(RecordingModule::new("a", &[Phase::BeginBlock], log).boxed())
            .unwrap()
            .register(RecordingModule::new("b", &[Phase::BeginBlock, Phase::EndBlock], log).boxed())
            .unwrap();
        builder
    }

    // =========================================================================
    // PHASE ORDERS
    // =========================================================================

    #[test]
    fn test_order_omitting_implementer_rejected() {
        let log = CallLog::new();
        let mut builder = two_module_builder(&log);
        assert_eq!(
            builder.set_order(Phase::BeginBlock, &["a"]).err(),
            Some(RegistryError::MissingFromOrder {
                phase: Phase::BeginBlock,
                missing: vec!["b".to_string()],
            })
        );
    }

    #[test]
    fn test_order_listing_non_implementer_rejected() {
        let log = CallLog::new();
        let mut builder = two_module_builder(&log);
        assert_eq!(
            builder.set_order(Phase::EndBlock, &["a", "b"]).err(),
            Some(RegistryError::ExtraInOrder {
                phase: Phase::EndBlock,
                module: "a".to_string(),
            })
        );
    }

    #[test]
    fn test_order_with_unknown_or_repeated_module_rejected() {
        let log = CallLog::new();
        let mut builder = two_module_builder(&log);
        assert!(matches!(
            builder.set_order(Phase::BeginBlock, &["a", "b", "mint"]),
            Err(RegistryError::UnknownModule { .. })
        ));
        assert!(matches!(
            builder.set_order(Phase::BeginBlock, &["a", "b", "a"]),
            Err(RegistryError::DuplicateInOrder { .. })
        ));
    }

    #[test]
    fn test_build_without_order_rejected() {
        let log = CallLog::new();
        let mut builder = two_module_builder(&log);
        builder.set_order(Phase::BeginBlock, &["b", "a"]).unwrap();

        match builder.build() {
            Err(RegistryError::OrderNotSet { phase, modules }) => {
                assert_eq!(phase, Phase::EndBlock);
                assert_eq!(modules, vec!["b".to_string()]);
            }
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("build should fail without an EndBlock order"),
        }
    }

    #[test]
    fn test_phase_without_implementers_needs_no_order() {
        let log = CallLog::new();
        let mut builder = ModuleManagerBuilder::new();
        builder
            .register(RecordingModule::new("params", &[], &log).boxed())
            .unwrap();
        let manager = builder.build().unwrap();
        for phase in Phase::ALL {
            assert!(manager.order(phase).is_empty());
        }
    }

    #[test]
    fn test_dependency_cycle_rejected() {
        let log = CallLog::new();
        let mut builder = ModuleManagerBuilder::new();
        builder
            .register(RecordingModule::new("x", &[], &log).depends_on(&["y"]).boxed())
            .unwrap()
            .register(RecordingModule::new("y", &[], &log).depends_on(&["x"]).boxed())
            .unwrap();
        assert!(matches!(
            builder.build(),
            Err(RegistryError::DependencyCycle(_))
        ));
    }

    #[test]
    fn test_dependencies_built_first() {
        let log = CallLog::new();
        let mut builder = ModuleManagerBuilder::new();
        builder
            .register(
                RecordingModule::new("gov", &[], &log)
                    .depends_on(&["bank", "staking"])
                    .boxed(),
            )
            .unwrap()
            .register(RecordingModule::new("staking", &[], &log).depends_on(&["bank"]).boxed())
            .unwrap()
            .register(RecordingModule::new("bank", &[], &log).boxed())
            .unwrap();
        let manager = builder.build().unwrap();

        let order = manager.dependency_order();
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(pos("bank") < pos("staking"));
        assert!(pos("staking") < pos("gov"));
    }

    // =========================================================================
    // STORE KEYS
    // =========================================================================

    #[test]
    fn test_duplicate_store_key_rejected() {
        let mut allocator = StoreKeyAllocator::new();
        allocator
            .new_kv_store_keys(&["acc", "bank", "staking"])
            .unwrap();

        assert_eq!(
            allocator.new_store_key("bank", StoreKind::Persistent).err(),
            Some(StoreError::DuplicateKey {
                name: "bank".to_string(),
                kind: StoreKind::Persistent,
            })
        );
        assert!(allocator.new_store_key("bank", StoreKind::Transient).is_ok());
        assert_eq!(allocator.len(), 4);
    }

    #[test]
    fn test_unmounted_store_unreachable() {
        let mut allocator = StoreKeyAllocator::new();
        let keys = allocator.new_kv_store_keys(&["acc", "bank"]).unwrap();

        let mut store = MultiStore::new();
        store.mount(keys["acc"].clone()).unwrap();

        with_context(&mut store, 1, |ctx| {
            assert!(ctx.kv(&keys["acc"]).is_ok());
            assert!(matches!(
                ctx.kv(&keys["bank"]),
                Err(StoreError::NotMounted(_))
            ));
        });
    }

    // =========================================================================
    // INVARIANT ROUTES
    // =========================================================================

    #[test]
    fn test_duplicate_invariant_route_rejected() {
        let mut registry = InvariantRegistry::new();
        registry
            .register("bank", "total-supply", |_| Ok(()))
            .unwrap();
        assert_eq!(
            registry.register("bank", "total-supply", |_| Ok(())),
            Err(RegistryError::DuplicateInvariant {
                module: "bank".to_string(),
                route: "total-supply".to_string(),
            })
        );
        assert!(registry.register("staking", "total-supply", |_| Ok(())).is_ok());
        assert_eq!(
            registry.route_names(),
            vec!["bank/total-supply", "staking/total-supply"]
        );
    }

    #[test]
    fn test_first_broken_invariant_reported() {
        let mut registry = InvariantRegistry::new();
        registry.register("bank", "total-supply", |_| Ok(())).unwrap();
        registry
            .register("staking", "bonded-tokens", |_| Err("pool short by 1".to_string()))
            .unwrap();
        registry
            .register("distribution", "can-withdraw", |_| Err("unreachable".to_string()))
            .unwrap();

        let mut store = MultiStore::new();
        let broken = with_context(&mut store, 7, |ctx| registry.assert_all(ctx).unwrap_err());
        assert_eq!(broken.module, "staking");
        assert_eq!(broken.route, "bonded-tokens");
        assert_eq!(
            broken.to_string(),
            "Invariant broken: staking/bonded-tokens: pool short by 1"
        );
    }

    // =========================================================================
    // MODULE ACCOUNTS
    // =========================================================================

    fn accounts() -> cc_05_module_accounts::ModuleAccountTable {
        let mut builder = ModuleAccountsBuilder::new();
        builder
            .add("fee_collector", &[])
            .unwrap()
            .add("distribution", &[])
            .unwrap()
            .add("mint", &[Permission::Mint])
            .unwrap()
            .add("bonded_tokens_pool", &[Permission::Burn, Permission::Stake])
            .unwrap()
            .allow_receiving("distribution")
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_macc_perms_returns_copy() {
        let table = accounts();
        let mut perms = table.get_macc_perms();
        perms.clear();
        perms.insert("rogue".to_string(), [Permission::Mint].into_iter().collect());

        let fresh = table.get_macc_perms();
        assert_eq!(fresh.len(), 4);
        assert!(!fresh.contains_key("rogue"));
        assert!(fresh["mint"].contains(&Permission::Mint));
    }

    #[test]
    fn test_blocked_addresses_exclude_receivers() {
        let table = accounts();
        assert_eq!(table.module_account_addrs().len(), 4);

        let blocked = table.blocked_module_addrs();
        assert_eq!(blocked.len(), 3);
        assert!(!blocked.contains(&AccAddress::for_module("distribution")));
        assert!(blocked.contains(&AccAddress::for_module("mint")));
    }

    #[test]
    fn test_duplicate_module_account_rejected() {
        let mut builder = ModuleAccountsBuilder::new();
        builder.add("mint", &[Permission::Mint]).unwrap();
        assert!(builder.add("mint", &[]).is_err());
        assert!(builder.allow_receiving("gov").is_err());
    }
}
