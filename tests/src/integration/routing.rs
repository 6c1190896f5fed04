//! # Routing and Capability Scenarios
//!
//! Handlers registered on the three routers, dispatch misses that must not
//! poison the router, and capability scopes closed by sealing.

#[cfg(test)]
mod tests {
    use cc_01_store::{Context, MultiStore, StoreKey, StoreKeyAllocator, StoreKind};
    use cc_03_capability::{Capability, CapabilityError, CapabilityKeeper, ScopedCapabilityKeeper};
    use cc_06_routing::{
        Acknowledgement, ChannelOrder, DispatchError, EvidenceRouter, GovRouter, Packet,
        PortCallbacks, PortRouter, ProposalContent, ProposalHandler, RouteDomain, RouteError,
    };
    use shared_types::ModuleError;

    use crate::integration::fixtures::with_context;

    /// Records the title of every executed proposal.
    struct TitleRecorder {
        key: StoreKey,
    }

    impl ProposalHandler for TitleRecorder {
        fn handle(
            &self,
            ctx: &mut Context<'_>,
            content: &ProposalContent,
        ) -> Result<(), ModuleError> {
            if content.kind != "Text" {
                return Err(ModuleError::new("gov", format!("unsupported kind {}", content.kind)));
            }
            ctx.kv_mut(&self.key)
                .map_err(|e| ModuleError::new("gov", e.to_string()))?
                .set(content.title.as_bytes().to_vec(), b"executed".to_vec());
            Ok(())
        }
    }

    fn reject_all(
        _ctx: &mut Context<'_>,
        _evidence: &cc_06_routing::Evidence,
    ) -> Result<(), ModuleError> {
        Err(ModuleError::new("slashing", "no such validator"))
    }

    struct EchoPort;

    impl PortCallbacks for EchoPort {
        fn on_chan_open_init(
            &self,
            _ctx: &mut Context<'_>,
            order: ChannelOrder,
            _port_id: &str,
            _channel_id: &str,
            _channel_cap: &Capability,
            _version: &str,
        ) -> Result<(), ModuleError> {
            match order {
                ChannelOrder::Unordered => Ok(()),
                ChannelOrder::Ordered => Err(ModuleError::new("echo", "ordered channels refused")),
            }
        }

        fn on_recv_packet(&self, _ctx: &mut Context<'_>, packet: &Packet) -> Acknowledgement {
            if packet.data.is_empty() {
                Acknowledgement::Error("empty packet".to_string())
            } else {
                Acknowledgement::Success(packet.data.clone())
            }
        }

        fn on_acknowledgement_packet(
            &self,
            _ctx: &mut Context<'_>,
            _packet: &Packet,
            _ack: &Acknowledgement,
        ) -> Result<(), ModuleError> {
            Ok(())
        }

        fn on_timeout_packet(
            &self,
            _ctx: &mut Context<'_>,
            _packet: &Packet,
        ) -> Result<(), ModuleError> {
            Ok(())
        }
    }

    fn packet(port: &str, data: &[u8]) -> Packet {
        Packet {
            sequence: 1,
            source_port: port.to_string(),
            source_channel: "channel-0".to_string(),
            destination_port: port.to_string(),
            destination_channel: "channel-0".to_string(),
            data: data.to_vec(),
            timeout_height: 0,
        }
    }

    fn gov_store() -> (MultiStore, StoreKey) {
        let mut allocator = StoreKeyAllocator::new();
        let key = allocator.new_store_key("gov", StoreKind::Persistent).unwrap();
        let mut store = MultiStore::new();
        store.mount(key.clone()).unwrap();
        (store, key)
    }

    // =========================================================================
    // ROUTERS
    // =========================================================================

    #[test]
    fn test_gov_dispatch_reaches_registered_handler() {
        let (mut store, key) = gov_store();
        let mut router = GovRouter::new(RouteDomain::Governance);
        router
            .add_route("gov", Box::new(TitleRecorder { key: key.clone() }))
            .unwrap();
        router.seal();

        with_context(&mut store, 3, |ctx| {
            router
                .dispatch(ctx, &ProposalContent::new("gov", "Text", "hello"))
                .unwrap();
            assert!(ctx.kv(&key).unwrap().has(b"hello"));
        });
    }

    #[test]
    fn test_unregistered_route_recoverable() {
        let (mut store, key) = gov_store();
        let mut router = GovRouter::new(RouteDomain::Governance);
        router
            .add_route("gov", Box::new(TitleRecorder { key: key.clone() }))
            .unwrap();

        with_context(&mut store, 3, |ctx| {
            assert_eq!(
                router.dispatch(ctx, &ProposalContent::new("upgrade", "Text", "x")),
                Err(DispatchError::Unrecognized {
                    domain: RouteDomain::Governance,
                    key: "upgrade".to_string(),
                })
            );
            assert!(matches!(
                router.dispatch(ctx, &ProposalContent::new("gov", "Spend", "y")),
                Err(DispatchError::Handler(_))
            ));
            assert!(router
                .dispatch(ctx, &ProposalContent::new("gov", "Text", "z"))
                .is_ok());
        });
    }

    #[test]
    fn test_duplicate_and_late_routes_rejected() {
        let mut router = EvidenceRouter::new(RouteDomain::Evidence);
        router.add_route("equivocation", Box::new(reject_all)).unwrap();

        assert_eq!(
            router.add_route("equivocation", Box::new(reject_all)).err(),
            Some(RouteError::DuplicateRoute {
                domain: RouteDomain::Evidence,
                key: "equivocation".to_string(),
            })
        );
        assert!(matches!(
            router.add_route("bad route", Box::new(reject_all)),
            Err(RouteError::InvalidKey { .. })
        ));

        router.seal();
        assert_eq!(
            router.add_route("light", Box::new(reject_all)).err(),
            Some(RouteError::Sealed(RouteDomain::Evidence))
        );
        assert_eq!(router.keys(), vec!["equivocation"]);
    }

    #[test]
    fn test_port_router_delivers_by_destination_port() {
        let mut store = MultiStore::new();
        let mut router = PortRouter::new(RouteDomain::Port);
        router.add_route("echo", Box::new(EchoPort)).unwrap();
        router.seal();

        with_context(&mut store, 1, |ctx| {
            assert_eq!(
                router.recv_packet(ctx, &packet("echo", b"ping")),
                Ok(Acknowledgement::Success(b"ping".to_vec()))
            );
            assert_eq!(
                router.recv_packet(ctx, &packet("echo", b"")),
                Ok(Acknowledgement::Error("empty packet".to_string()))
            );
            assert!(matches!(
                router.recv_packet(ctx, &packet("transfer", b"ping")),
                Err(DispatchError::Unrecognized { .. })
            ));
        });
    }

    // =========================================================================
    // CAPABILITY SCOPING
    // =========================================================================

    struct Capabilities {
        store: MultiStore,
        keeper: CapabilityKeeper,
        ibc: ScopedCapabilityKeeper,
        transfer: ScopedCapabilityKeeper,
    }

    fn capabilities() -> Capabilities {
        let mut allocator = StoreKeyAllocator::new();
        let store_key = allocator
            .new_store_key("capability", StoreKind::Persistent)
            .unwrap();
        let mem_key = allocator
            .new_store_key("memory:capability", StoreKind::InMemory)
            .unwrap();

        let mut store = MultiStore::new();
        store.mount(store_key.clone()).unwrap();
        store.mount(mem_key.clone()).unwrap();

        let keeper = CapabilityKeeper::new(store_key, mem_key);
        let ibc = keeper.scope_to_module("ibc").unwrap();
        let transfer = keeper.scope_to_module("transfer").unwrap();
        Capabilities {
            store,
            keeper,
            ibc,
            transfer,
        }
    }

    #[test]
    fn test_scoping_closed_after_seal() {
        let mut caps = capabilities();
        let keeper = caps.keeper.clone();

        with_context(&mut caps.store, 0, |ctx| {
            assert!(matches!(
                caps.transfer.new_capability(ctx, "ports/transfer"),
                Err(CapabilityError::NotInitialized)
            ));
            keeper.initialize_and_seal(ctx).unwrap();
            assert_eq!(
                keeper.initialize_and_seal(ctx),
                Err(CapabilityError::AlreadySealed)
            );
        });

        assert_eq!(
            keeper.scope_to_module("transfer2").err(),
            Some(CapabilityError::ScopeSealed("transfer2".to_string()))
        );
        assert_eq!(keeper.scoped_modules(), vec!["ibc", "transfer"]);
    }

    #[test]
    fn test_nested_scope_cannot_forge_parent_capability() {
        let mut caps = capabilities();
        let keeper = caps.keeper.clone();

        assert_eq!(
            keeper.scope_to_module("ibc/ports").err(),
            Some(CapabilityError::InvalidModuleName("ibc/ports".to_string()))
        );

        with_context(&mut caps.store, 0, |ctx| {
            keeper.initialize_and_seal(ctx).unwrap();
            let cap = caps.ibc.new_capability(ctx, "ports/transfer").unwrap();
            assert_eq!(caps.transfer.get_capability(ctx, "transfer").unwrap(), None);
            assert!(!caps.transfer.authenticate_capability(ctx, &cap, "ports/transfer").unwrap());
        });
        assert_eq!(keeper.scoped_modules(), vec!["ibc", "transfer"]);
    }

    #[test]
    fn test_port_capability_shared_between_scopes() {
        let mut caps = capabilities();
        let Capabilities {
            store,
            keeper,
            ibc,
            transfer,
        } = &mut caps;

        with_context(store, 0, |ctx| {
            keeper.initialize_and_seal(ctx).unwrap();

            let cap = transfer.new_capability(ctx, "ports/transfer").unwrap();
            assert!(transfer.authenticate_capability(ctx, &cap, "ports/transfer").unwrap());
            assert!(!ibc.authenticate_capability(ctx, &cap, "ports/transfer").unwrap());
            assert!(matches!(
                transfer.new_capability(ctx, "ports/transfer"),
                Err(CapabilityError::NameTaken { .. })
            ));

            let claimed = ibc.claim_capability(ctx, &cap, "ports/transfer").unwrap();
            assert_eq!(claimed.index(), cap.index());
            assert_eq!(claimed.scope(), "ibc");
            assert!(ibc.authenticate_capability(ctx, &claimed, "ports/transfer").unwrap());
            assert!(matches!(
                ibc.claim_capability(ctx, &cap, "ports/other"),
                Err(CapabilityError::AlreadyOwned { .. })
            ));
        });
    }
}
