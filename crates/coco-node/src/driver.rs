//! # Dev Block Driver
//!
//! Stands in for a consensus engine during development: produces empty
//! blocks (BeginBlock, EndBlock, Commit) on a fixed interval.
//!
//! The loop stops when the shutdown future resolves, after `max_blocks`
//! blocks, at the configured halt height, or on the first phase error
//! (an upgrade halt surfaces this way).

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use shared_types::{BlockHeader, RequestBeginBlock, RequestEndBlock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::app::{AppError, CocoApp};
use crate::container::DriverConfig;

/// Why the driver returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    MaxBlocks,
    HaltHeight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSummary {
    pub reason: StopReason,
    pub blocks: u64,
    pub last_height: u64,
    pub last_app_hash: [u8; 32],
}

pub struct BlockDriver {
    app: CocoApp,
    config: DriverConfig,
    halt_height: u64,
    proposer: String,
}

impl BlockDriver {
    pub fn new(app: CocoApp, config: DriverConfig, halt_height: u64) -> Self {
        Self {
            app,
            config,
            halt_height,
            proposer: String::new(),
        }
    }

    /// Proposer recorded in produced headers.
    pub fn with_proposer(mut self, proposer: impl Into<String>) -> Self {
        self.proposer = proposer.into();
        self
    }

    pub fn app(&self) -> &CocoApp {
        &self.app
    }

    pub fn into_app(self) -> CocoApp {
        self.app
    }

    /// Run one block at the next height.
    pub fn produce_block(&mut self, time: u64) -> Result<u64, AppError> {
        let height = self.app.last_block_height() + 1;
        let header = BlockHeader {
            chain_id: self.app.chain_id().unwrap_or_default().to_string(),
            height,
            time,
            proposer: self.proposer.clone(),
        };

        let begin = self.app.begin_block(&RequestBeginBlock {
            header,
            ..RequestBeginBlock::default()
        })?;
        let end = self.app.end_block(&RequestEndBlock { height })?;
        let commit = self.app.commit()?;

        info!(
            "[Driver] Block {} committed: {} events, {} validator updates, app hash {}",
            commit.version,
            begin.events.len() + end.events.len(),
            end.validator_updates.len(),
            hex::encode(&commit.app_hash[..8])
        );
        Ok(commit.version)
    }

    fn halted(&self) -> bool {
        self.halt_height > 0 && self.app.last_block_height() >= self.halt_height
    }

    /// Produce blocks until a stop condition or `shutdown` resolves.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<DriverSummary, AppError>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(Duration::from_millis(self.config.block_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut blocks = 0;
        let reason = loop {
            if self.halted() {
                info!("[Driver] Reached halt height {}", self.halt_height);
                break StopReason::HaltHeight;
            }
            if self.config.max_blocks > 0 && blocks >= self.config.max_blocks {
                break StopReason::MaxBlocks;
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("[Driver] Shutdown signal received");
                    break StopReason::Interrupted;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.produce_block(unix_now()) {
                        error!("[Driver] Block {} failed: {}", self.app.last_block_height() + 1, e);
                        return Err(e);
                    }
                    blocks += 1;
                }
            }
        };

        Ok(DriverSummary {
            reason,
            blocks,
            last_height: self.app.last_block_height(),
            last_app_hash: self.app.last_app_hash(),
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
