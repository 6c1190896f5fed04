//! # Test Fixtures
//!
//! Modules that only record which hooks ran, in which order.

use std::sync::Arc;

use cc_01_store::{Context, MultiStore};
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use parking_lot::Mutex;
use shared_types::{
    BlockHeader, ModuleError, Phase, RequestBeginBlock, RequestEndBlock, ValidatorUpdate,
};

/// Shared record of `"{phase}:{module}"` entries.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, phase: Phase, module: &str) {
        self.0.lock().push(format!("{phase}:{module}"));
    }

    /// Modules called for `phase`, in call order.
    pub fn calls(&self, phase: Phase) -> Vec<String> {
        let prefix = format!("{phase}:");
        self.0
            .lock()
            .iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

pub struct RecordingModule {
    descriptor: ModuleDescriptor,
    log: CallLog,
    validators: Vec<ValidatorUpdate>,
    fail_on: Option<Phase>,
}

impl RecordingModule {
    pub fn new(name: &str, hooks: &[Phase], log: &CallLog) -> Self {
        Self {
            descriptor: ModuleDescriptor::new(name).with_hooks(hooks),
            log: log.clone(),
            validators: Vec::new(),
            fail_on: None,
        }
    }

    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.descriptor = self.descriptor.depends_on(deps);
        self
    }

    /// Report `power` for `pub_key` from InitGenesis and EndBlock.
    pub fn with_validator(mut self, pub_key: &str, power: u64) -> Self {
        self.validators.push(ValidatorUpdate {
            pub_key: pub_key.to_string(),
            power,
        });
        self
    }

    pub fn failing_on(mut self, phase: Phase) -> Self {
        self.fail_on = Some(phase);
        self
    }

    pub fn boxed(self) -> Box<dyn AppModule> {
        Box::new(self)
    }

    fn record(&self, phase: Phase) -> Result<(), ModuleError> {
        self.log.push(phase, &self.descriptor.name);
        match self.fail_on {
            Some(p) if p == phase => Err(ModuleError::new(&self.descriptor.name, "boom")),
            _ => Ok(()),
        }
    }
}

impl AppModule for RecordingModule {
    fn descriptor(&self) -> ModuleDescriptor {
        self.descriptor.clone()
    }

    fn init_genesis(
        &self,
        _ctx: &mut Context<'_>,
        _genesis: &serde_json::Value,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        self.record(Phase::InitGenesis)?;
        Ok(self.validators.clone())
    }

    fn begin_block(
        &self,
        _ctx: &mut Context<'_>,
        _req: &RequestBeginBlock,
    ) -> Result<(), ModuleError> {
        self.record(Phase::BeginBlock)
    }

    fn end_block(
        &self,
        _ctx: &mut Context<'_>,
        _req: &RequestEndBlock,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        self.record(Phase::EndBlock)?;
        Ok(self.validators.clone())
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        Ok(self
            .descriptor
            .implements(Phase::InitGenesis)
            .then(|| serde_json::json!({})))
    }
}

pub fn header(height: u64) -> BlockHeader {
    BlockHeader {
        chain_id: "coco-scenario".to_string(),
        height,
        ..BlockHeader::default()
    }
}

/// Run `f` against a fresh context over `store`.
pub fn with_context<R>(
    store: &mut MultiStore,
    height: u64,
    f: impl FnOnce(&mut Context<'_>) -> R,
) -> R {
    let mut ctx = Context::new(store, header(height));
    f(&mut ctx)
}
