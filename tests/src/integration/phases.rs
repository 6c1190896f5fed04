//! # Phase Ordering Scenarios
//!
//! Three modules with overlapping hooks:
//!
//! | module | InitGenesis | BeginBlock | EndBlock |
//! |--------|-------------|------------|----------|
//! | A      | yes         | yes        |          |
//! | B      | yes         |            | yes      |
//! | C      |             | yes        |          |
//!
//! Every phase must call exactly its implementers, once each, in the order
//! configured for that phase, regardless of registration order.

#[cfg(test)]
mod tests {
    use cc_01_store::MultiStore;
    use cc_04_module_manager::{GenesisState, ModuleManager, ModuleManagerBuilder, PhaseError};
    use proptest::prelude::*;
    use shared_types::{Phase, RequestBeginBlock, RequestEndBlock};

    use crate::integration::fixtures::{header, with_context, CallLog, RecordingModule};

    fn scenario(log: &CallLog) -> ModuleManagerBuilder {
        let mut builder = ModuleManagerBuilder::new();
        builder
            .register(
                RecordingModule::new("a", &[Phase::InitGenesis, Phase::BeginBlock], log)
                    .boxed(),
            )
            .unwrap()
            .register(
                RecordingModule::new("b", &[Phase::InitGenesis, Phase::EndBlock], log)
                    .boxed(),
            )
            .unwrap()
            .register(RecordingModule::new("c", &[Phase::BeginBlock], log).boxed())
            .unwrap();
        builder
    }

    fn assembled(log: &CallLog) -> ModuleManager {
        let mut builder = scenario(log);
        builder
            .set_order(Phase::InitGenesis, &["b", "a"])
            .unwrap()
            .set_order(Phase::BeginBlock, &["c", "a"])
            .unwrap()
            .set_order(Phase::EndBlock, &["b"])
            .unwrap();
        builder.build().unwrap()
    }

    fn run_block(manager: &ModuleManager, store: &mut MultiStore, height: u64) {
        with_context(store, height, |ctx| {
            let begin = RequestBeginBlock {
                header: header(height),
                ..RequestBeginBlock::default()
            };
            manager.begin_block(ctx, &begin).unwrap();
            manager.end_block(ctx, &RequestEndBlock { height }).unwrap();
        });
        store.commit();
    }

    // =========================================================================
    // CONFIGURED ORDERS
    // =========================================================================

    #[test]
    fn test_each_phase_runs_its_configured_order() {
        let log = CallLog::new();
        let manager = assembled(&log);
        let mut store = MultiStore::new();

        with_context(&mut store, 0, |ctx| {
            manager.init_genesis(ctx, &manager.default_genesis().unwrap()).unwrap();
        });
        run_block(&manager, &mut store, 1);

        assert_eq!(log.calls(Phase::InitGenesis), vec!["b", "a"]);
        assert_eq!(log.calls(Phase::BeginBlock), vec!["c", "a"]);
        assert_eq!(log.calls(Phase::EndBlock), vec!["b"]);
    }

    #[test]
    fn test_hooks_run_once_per_block() {
        let log = CallLog::new();
        let manager = assembled(&log);
        let mut store = MultiStore::new();

        for height in 1..=3 {
            run_block(&manager, &mut store, height);
        }

        assert_eq!(log.calls(Phase::BeginBlock).len(), 6);
        assert_eq!(log.calls(Phase::EndBlock), vec!["b", "b", "b"]);
        assert!(log.calls(Phase::InitGenesis).is_empty());
        assert_eq!(store.version(), 3);
    }

    #[test]
    fn test_default_genesis_covers_init_order() {
        let log = CallLog::new();
        let manager = assembled(&log);
        let genesis = manager.default_genesis().unwrap();

        let keys: Vec<&str> = genesis.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(manager.validate_genesis(&genesis).is_ok());
    }

    #[test]
    fn test_genesis_for_unordered_module_rejected() {
        let log = CallLog::new();
        let manager = assembled(&log);
        let mut genesis = manager.default_genesis().unwrap();
        genesis.insert("c".to_string(), serde_json::json!({}));

        let mut store = MultiStore::new();
        let result = with_context(&mut store, 0, |ctx| manager.init_genesis(ctx, &genesis));
        assert_eq!(
            result.err(),
            Some(PhaseError::UnknownGenesisModule("c".to_string()))
        );
        assert!(log.calls(Phase::InitGenesis).is_empty());
    }

    #[test]
    fn test_missing_genesis_payload_rejected() {
        let log = CallLog::new();
        let manager = assembled(&log);
        let genesis: GenesisState = [("b".to_string(), serde_json::json!({}))]
            .into_iter()
            .collect();

        assert_eq!(
            manager.validate_genesis(&genesis).err(),
            Some(PhaseError::MissingGenesis("a".to_string()))
        );
    }

    // =========================================================================
    // FAILURES AND VALIDATOR UPDATES
    // =========================================================================

    #[test]
    fn test_failing_hook_stops_phase() {
        let log = CallLog::new();
        let mut builder = ModuleManagerBuilder::new();
        builder
            .register(
                RecordingModule::new("first", &[Phase::BeginBlock], &log)
                    .failing_on(Phase::BeginBlock)
                    .boxed(),
            )
            .unwrap()
            .register(RecordingModule::new("second", &[Phase::BeginBlock], &log).boxed())
            .unwrap()
            .set_order(Phase::BeginBlock, &["first", "second"])
            .unwrap();
        let manager = builder.build().unwrap();

        let mut store = MultiStore::new();
        let err = with_context(&mut store, 1, |ctx| {
            manager
                .begin_block(ctx, &RequestBeginBlock::default())
                .unwrap_err()
        });

        match err {
            PhaseError::HookFailed { phase, module, source } => {
                assert_eq!(phase, Phase::BeginBlock);
                assert_eq!(module, "first");
                assert_eq!(source.message, "boom");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(log.calls(Phase::BeginBlock), vec!["first"]);
    }

    #[test]
    fn test_single_validator_source_per_phase() {
        let log = CallLog::new();
        let mut builder = ModuleManagerBuilder::new();
        builder
            .register(
                RecordingModule::new("staking", &[Phase::EndBlock], &log)
                    .with_validator("aa", 10)
                    .boxed(),
            )
            .unwrap()
            .register(
                RecordingModule::new("poa", &[Phase::EndBlock], &log)
                    .with_validator("bb", 5)
                    .boxed(),
            )
            .unwrap()
            .set_order(Phase::EndBlock, &["staking", "poa"])
            .unwrap();
        let manager = builder.build().unwrap();

        let mut store = MultiStore::new();
        let result = with_context(&mut store, 1, |ctx| {
            manager.end_block(ctx, &RequestEndBlock { height: 1 })
        });
        assert_eq!(
            result.err(),
            Some(PhaseError::ConflictingValidatorUpdates {
                phase: Phase::EndBlock,
                first: "staking".to_string(),
                second: "poa".to_string(),
            })
        );
    }

    #[test]
    fn test_genesis_validators_come_from_single_module() {
        let log = CallLog::new();
        let mut builder = ModuleManagerBuilder::new();
        builder
            .register(RecordingModule::new("auth", &[Phase::InitGenesis], &log).boxed())
            .unwrap()
            .register(
                RecordingModule::new("staking", &[Phase::InitGenesis], &log)
                    .with_validator("aa", 10)
                    .boxed(),
            )
            .unwrap()
            .set_order(Phase::InitGenesis, &["auth", "staking"])
            .unwrap();
        let manager = builder.build().unwrap();

        let mut store = MultiStore::new();
        let response = with_context(&mut store, 0, |ctx| {
            manager.init_genesis(ctx, &manager.default_genesis().unwrap()).unwrap()
        });
        assert_eq!(response.validators.len(), 1);
        assert_eq!(response.validators[0].power, 10);
    }

    // =========================================================================
    // PROPERTY: ANY VALID PERMUTATION IS HONOURED
    // =========================================================================

    fn permutation(len: usize) -> impl Strategy<Value = Vec<usize>> {
        Just((0..len).collect::<Vec<_>>()).prop_shuffle()
    }

    proptest! {
        #[test]
        fn prop_begin_block_follows_any_permutation(
            count in 1usize..8,
            seed in permutation(8),
        ) {
            let log = CallLog::new();
            let names: Vec<String> = (0..count).map(|i| format!("m{i}")).collect();

            let mut builder = ModuleManagerBuilder::new();
            for name in &names {
                builder
                    .register(RecordingModule::new(name, &[Phase::BeginBlock], &log).boxed())
                    .unwrap();
            }
            let order: Vec<&str> = seed
                .iter()
                .filter(|&&i| i < count)
                .map(|&i| names[i].as_str())
                .collect();
            builder.set_order(Phase::BeginBlock, &order).unwrap();
            let manager = builder.build().unwrap();

            let mut store = MultiStore::new();
            with_context(&mut store, 1, |ctx| {
                manager.begin_block(ctx, &RequestBeginBlock::default()).unwrap();
            });

            prop_assert_eq!(log.calls(Phase::BeginBlock), order);
        }

        #[test]
        fn prop_order_missing_a_module_rejected(
            count in 2usize..8,
            dropped in 0usize..8,
        ) {
            let log = CallLog::new();
            let names: Vec<String> = (0..count).map(|i| format!("m{i}")).collect();
            let dropped = dropped % count;

            let mut builder = ModuleManagerBuilder::new();
            for name in &names {
                builder
                    .register(RecordingModule::new(name, &[Phase::EndBlock], &log).boxed())
                    .unwrap();
            }
            let order: Vec<&str> = names
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != dropped)
                .map(|(_, n)| n.as_str())
                .collect();

            prop_assert!(builder.set_order(Phase::EndBlock, &order).is_err());
        }
    }
}
