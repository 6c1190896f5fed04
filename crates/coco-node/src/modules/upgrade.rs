//! # Upgrade
//!
//! Coordinated software upgrades. A plan scheduled through governance halts
//! the chain at its height unless the running binary has a handler for it
//! or the operator listed the height in `upgrade.skip_heights`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use cc_01_store::{Context, StoreKey};
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use cc_06_routing::ProposalHandler;
use serde::{Deserialize, Serialize};
use shared_types::{Event, ModuleError, Phase, RequestBeginBlock};
use tracing::{error, info, warn};

use super::{module_error, proposal_handler};

pub const MODULE_NAME: &str = "upgrade";
pub const STORE_KEY: &str = "upgrade";
/// Governance route for upgrade proposals.
pub const ROUTE: &str = "upgrade";
pub const SOFTWARE_UPGRADE: &str = "SoftwareUpgrade";
pub const CANCEL_SOFTWARE_UPGRADE: &str = "CancelSoftwareUpgrade";

const PLAN_KEY: &[u8] = b"plan";
const DONE_PREFIX: &str = "done/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub height: u64,
    #[serde(default)]
    pub info: String,
}

/// Migration run when a plan with the matching name comes due.
pub type UpgradeHandler = dyn Fn(&mut Context<'_>, &Plan) -> Result<(), ModuleError> + Send + Sync;

fn upgrade_error(err: impl fmt::Display) -> ModuleError {
    module_error(MODULE_NAME, err)
}

#[derive(Clone)]
pub struct UpgradeKeeper {
    store_key: StoreKey,
    skip_heights: Arc<BTreeSet<u64>>,
    handlers: Arc<BTreeMap<String, Arc<UpgradeHandler>>>,
}

impl fmt::Debug for UpgradeKeeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeKeeper")
            .field("store_key", &self.store_key)
            .field("skip_heights", &self.skip_heights)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl UpgradeKeeper {
    pub fn new(store_key: StoreKey, skip_heights: impl IntoIterator<Item = u64>) -> Self {
        Self {
            store_key,
            skip_heights: Arc::new(skip_heights.into_iter().collect()),
            handlers: Arc::new(BTreeMap::new()),
        }
    }

    /// Register the migration for the plan called `name`.
    pub fn with_handler<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, &Plan) -> Result<(), ModuleError> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.handlers).insert(name.to_string(), Arc::new(handler));
        self
    }

    /// Register several migrations at once, keyed by plan name.
    pub fn with_handlers<I>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = (String, Arc<UpgradeHandler>)>,
    {
        Arc::make_mut(&mut self.handlers).extend(handlers);
        self
    }

    pub fn skip_heights(&self) -> &BTreeSet<u64> {
        &self.skip_heights
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn get_plan(&self, ctx: &Context<'_>) -> Result<Option<Plan>, ModuleError> {
        ctx.kv(&self.store_key)
            .and_then(|s| s.get_json(PLAN_KEY))
            .map_err(upgrade_error)
    }

    /// Schedule `plan`, replacing any pending one.
    pub fn schedule_upgrade(&self, ctx: &mut Context<'_>, plan: &Plan) -> Result<(), ModuleError> {
        if plan.name.trim().is_empty() {
            return Err(upgrade_error("upgrade plan name must not be empty"));
        }
        if plan.height <= ctx.block_height() {
            return Err(upgrade_error(format!(
                "upgrade height {} is not after current height {}",
                plan.height,
                ctx.block_height()
            )));
        }
        if self.done_height(ctx, &plan.name)?.is_some() {
            return Err(upgrade_error(format!("upgrade {} already applied", plan.name)));
        }

        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(PLAN_KEY, plan))
            .map_err(upgrade_error)?;
        info!("[Upgrade] Scheduled {} at height {}", plan.name, plan.height);
        Ok(())
    }

    pub fn clear_plan(&self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        ctx.kv_mut(&self.store_key)
            .map_err(upgrade_error)?
            .delete(PLAN_KEY);
        Ok(())
    }

    /// Height at which the upgrade `name` was applied.
    pub fn done_height(&self, ctx: &Context<'_>, name: &str) -> Result<Option<u64>, ModuleError> {
        ctx.kv(&self.store_key)
            .and_then(|s| s.get_json(&done_key(name)))
            .map_err(upgrade_error)
    }

    /// Execute, skip or halt on the pending plan.
    pub fn check_plan(&self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        let Some(plan) = self.get_plan(ctx)? else {
            return Ok(());
        };
        let height = ctx.block_height();

        if plan.height > height {
            if self.has_handler(&plan.name) {
                error!("[Upgrade] Binary for {} started before height {}", plan.name, plan.height);
                return Err(upgrade_error(format!(
                    "BINARY UPDATED BEFORE TRIGGER! UPGRADE \"{}\" at height {}",
                    plan.name, plan.height
                )));
            }
            return Ok(());
        }

        if self.skip_heights.contains(&plan.height) {
            warn!("[Upgrade] Skipping upgrade {} at height {}", plan.name, plan.height);
            self.clear_plan(ctx)?;
            ctx.emit(Event::new("upgrade_skipped").attr("name", &plan.name));
            return Ok(());
        }

        match self.handlers.get(&plan.name) {
            Some(handler) => {
                handler(ctx, &plan)?;
                ctx.kv_mut(&self.store_key)
                    .and_then(|s| s.set_json(&done_key(&plan.name), &height))
                    .map_err(upgrade_error)?;
                self.clear_plan(ctx)?;
                info!("[Upgrade] Applied {} at height {}", plan.name, height);
                ctx.emit(Event::new("upgrade_applied").attr("name", &plan.name));
                Ok(())
            }
            None => {
                error!("[Upgrade] UPGRADE \"{}\" NEEDED at height {}", plan.name, height);
                Err(upgrade_error(format!(
                    "UPGRADE \"{}\" NEEDED at height {}: {}",
                    plan.name, height, plan.info
                )))
            }
        }
    }

    /// Handler for the `upgrade` governance route.
    pub fn proposal_handler(&self) -> Box<dyn ProposalHandler> {
        let keeper = self.clone();
        proposal_handler(move |ctx, content| match content.kind.as_str() {
            SOFTWARE_UPGRADE => {
                let plan: Plan =
                    serde_json::from_value(content.payload.clone()).map_err(upgrade_error)?;
                keeper.schedule_upgrade(ctx, &plan)
            }
            CANCEL_SOFTWARE_UPGRADE => keeper.clear_plan(ctx),
            other => Err(upgrade_error(format!("unrecognized upgrade proposal kind {other}"))),
        })
    }
}

fn done_key(name: &str) -> Vec<u8> {
    format!("{DONE_PREFIX}{name}").into_bytes()
}

pub struct UpgradeModule {
    keeper: UpgradeKeeper,
}

impl UpgradeModule {
    pub fn new(keeper: UpgradeKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for UpgradeModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(MODULE_NAME)
            .with_hooks(&[Phase::BeginBlock])
            .depends_on(crate::app::layout::dependencies_of(MODULE_NAME))
    }

    fn begin_block(&self, ctx: &mut Context<'_>, _req: &RequestBeginBlock) -> Result<(), ModuleError> {
        self.keeper.check_plan(ctx)
    }
}
