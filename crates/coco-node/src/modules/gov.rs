//! # Gov
//!
//! On-chain proposals. A proposal names a route of the governance router;
//! submission is refused when no handler is registered for it. When the
//! voting period ends, a passing proposal is executed through its handler.
//! A failing handler marks the proposal failed; it never aborts the block.
//!
//! Voting is one vote per account.

use std::fmt;
use std::sync::Arc;

use cc_01_store::{Context, StoreKey};
use cc_02_params::domain::validate_positive_u64;
use cc_02_params::{KeyTable, ParamsError, Subspace};
use cc_04_module_manager::{AppModule, ModuleDescriptor};
use cc_06_routing::{GovRouter, ProposalContent, ProposalHandler};
use serde::{Deserialize, Serialize};
use shared_types::{AccAddress, Event, ModuleError, Phase, RequestEndBlock, ValidatorUpdate};
use tracing::{info, warn};

use super::bank::{BankKeeper, Coin};
use super::staking::StakingKeeper;
use super::{decode_genesis, encode_genesis, module_error, proposal_handler};

pub const MODULE_NAME: &str = "gov";
pub const STORE_KEY: &str = "gov";
/// Route of plain text proposals.
pub const ROUTE: &str = "gov";
pub const TEXT_PROPOSAL: &str = "Text";

const KEY_VOTING_PERIOD: &str = "VotingPeriod";
const KEY_MIN_DEPOSIT: &str = "MinDeposit";
const NEXT_PROPOSAL_ID: &[u8] = b"next_proposal_id";
const PROPOSALS_PREFIX: &str = "proposals/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovParams {
    /// Blocks.
    pub voting_period: u64,
    /// Bond-denom deposit required to submit.
    pub min_deposit: u64,
}

impl Default for GovParams {
    fn default() -> Self {
        Self {
            voting_period: 100,
            min_deposit: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    VotingPeriod,
    Passed,
    Rejected,
    /// Passed the vote but its handler returned an error.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOption {
    Yes,
    No,
    Abstain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub content: ProposalContent,
    pub status: ProposalStatus,
    pub proposer: String,
    pub deposit: u64,
    pub submit_height: u64,
    pub voting_end_height: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    pub yes: u64,
    pub no: u64,
    pub abstain: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovGenesis {
    pub params: GovParams,
    pub starting_proposal_id: u64,
}

impl Default for GovGenesis {
    fn default() -> Self {
        Self {
            params: GovParams::default(),
            starting_proposal_id: 1,
        }
    }
}

fn key_table() -> Result<KeyTable, ParamsError> {
    KeyTable::new()
        .register(KEY_VOTING_PERIOD, validate_positive_u64)?
        .register(KEY_MIN_DEPOSIT, cc_02_params::domain::validate_u64)
}

fn gov_error(err: impl fmt::Display) -> ModuleError {
    module_error(MODULE_NAME, err)
}

/// Handler for the `gov` route: text proposals carry no state change.
pub fn text_proposal_handler() -> Box<dyn ProposalHandler> {
    proposal_handler(|_, content| {
        if content.kind == TEXT_PROPOSAL {
            Ok(())
        } else {
            Err(gov_error(format!("unrecognized gov proposal kind {}", content.kind)))
        }
    })
}

#[derive(Debug, Clone)]
pub struct GovKeeper {
    store_key: StoreKey,
    subspace: Subspace,
    bank: BankKeeper,
    staking: StakingKeeper,
    router: Arc<GovRouter>,
}

impl GovKeeper {
    /// The router is sealed here; routes cannot be added afterwards.
    pub fn new(
        store_key: StoreKey,
        subspace: Subspace,
        bank: BankKeeper,
        staking: StakingKeeper,
        mut router: GovRouter,
    ) -> Result<Self, ParamsError> {
        let subspace = if subspace.has_key_table() {
            subspace
        } else {
            subspace.with_key_table(key_table()?)?
        };
        router.seal();
        Ok(Self {
            store_key,
            subspace,
            bank,
            staking,
            router: Arc::new(router),
        })
    }

    pub fn router(&self) -> &GovRouter {
        &self.router
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<GovParams, ModuleError> {
        let d = GovParams::default();
        Ok(GovParams {
            voting_period: self
                .subspace
                .get_or(ctx, KEY_VOTING_PERIOD, d.voting_period)
                .map_err(gov_error)?,
            min_deposit: self
                .subspace
                .get_or(ctx, KEY_MIN_DEPOSIT, d.min_deposit)
                .map_err(gov_error)?,
        })
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &GovParams) -> Result<(), ModuleError> {
        self.subspace
            .set(ctx, KEY_VOTING_PERIOD, &params.voting_period)
            .and_then(|_| self.subspace.set(ctx, KEY_MIN_DEPOSIT, &params.min_deposit))
            .map_err(gov_error)
    }

    pub fn proposal(&self, ctx: &Context<'_>, id: u64) -> Result<Option<Proposal>, ModuleError> {
        ctx.kv(&self.store_key)
            .and_then(|s| s.get_json(&proposal_key(id)))
            .map_err(gov_error)
    }

    /// Submit `content` with a bond-denom `deposit` escrowed in this module.
    pub fn submit_proposal(
        &self,
        ctx: &mut Context<'_>,
        proposer: &AccAddress,
        content: ProposalContent,
        deposit: u64,
    ) -> Result<u64, ModuleError> {
        if !self.router.has_route(&content.route) {
            return Err(gov_error(format!(
                "no handler exists for proposal route {}",
                content.route
            )));
        }
        if content.title.trim().is_empty() {
            return Err(gov_error("proposal title must not be empty"));
        }
        let params = self.params(ctx)?;
        if deposit < params.min_deposit {
            return Err(gov_error(format!(
                "deposit {deposit} below minimum {}",
                params.min_deposit
            )));
        }
        if deposit > 0 {
            let denom = self.staking.bond_denom(ctx)?;
            self.bank
                .send_from_account_to_module(ctx, proposer, MODULE_NAME, &Coin::new(denom, deposit))?;
        }

        let store = ctx.kv_mut(&self.store_key).map_err(gov_error)?;
        let id: u64 = store
            .get_json(NEXT_PROPOSAL_ID)
            .map_err(gov_error)?
            .unwrap_or(1);
        store
            .set_json(NEXT_PROPOSAL_ID, &(id + 1))
            .map_err(gov_error)?;

        let height = ctx.block_height();
        let proposal = Proposal {
            id,
            content,
            status: ProposalStatus::VotingPeriod,
            proposer: proposer.to_string(),
            deposit,
            submit_height: height,
            voting_end_height: height + params.voting_period,
        };
        self.set_proposal(ctx, &proposal)?;

        info!(
            "[Gov] Proposal {} submitted on route {}: {}",
            id, proposal.content.route, proposal.content.title
        );
        ctx.emit(
            Event::new("submit_proposal")
                .attr("proposal_id", id)
                .attr("route", &proposal.content.route),
        );
        Ok(id)
    }

    pub fn vote(
        &self,
        ctx: &mut Context<'_>,
        id: u64,
        voter: &AccAddress,
        option: VoteOption,
    ) -> Result<(), ModuleError> {
        let proposal = self
            .proposal(ctx, id)?
            .ok_or_else(|| gov_error(format!("unknown proposal {id}")))?;
        if proposal.status != ProposalStatus::VotingPeriod {
            return Err(gov_error(format!("proposal {id} is not in voting period")));
        }
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(&vote_key(id, voter), &option))
            .map_err(gov_error)
    }

    pub fn tally(&self, ctx: &Context<'_>, id: u64) -> Result<TallyResult, ModuleError> {
        let store = ctx.kv(&self.store_key).map_err(gov_error)?;
        let prefix = format!("votes/{id:020}/");
        let mut tally = TallyResult::default();
        for (_, raw) in store.iter_prefix(prefix.as_bytes()) {
            match serde_json::from_slice::<VoteOption>(raw).map_err(gov_error)? {
                VoteOption::Yes => tally.yes += 1,
                VoteOption::No => tally.no += 1,
                VoteOption::Abstain => tally.abstain += 1,
            }
        }
        Ok(tally)
    }

    /// Close every proposal whose voting period ended at this height.
    pub fn end_voting(&self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        let height = ctx.block_height();
        let due: Vec<Proposal> = {
            let store = ctx.kv(&self.store_key).map_err(gov_error)?;
            store
                .iter_prefix(PROPOSALS_PREFIX.as_bytes())
                .map(|(_, raw)| serde_json::from_slice::<Proposal>(raw).map_err(gov_error))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .filter(|p| p.status == ProposalStatus::VotingPeriod && p.voting_end_height <= height)
                .collect()
        };

        for mut proposal in due {
            let tally = self.tally(ctx, proposal.id)?;
            proposal.status = if tally.yes > tally.no {
                match self.router.dispatch(ctx, &proposal.content) {
                    Ok(()) => ProposalStatus::Passed,
                    Err(e) => {
                        warn!("[Gov] Proposal {} failed to execute: {}", proposal.id, e);
                        ProposalStatus::Failed
                    }
                }
            } else {
                ProposalStatus::Rejected
            };
            self.settle_deposit(ctx, &proposal)?;
            self.set_proposal(ctx, &proposal)?;

            info!(
                "[Gov] Proposal {} {:?} (yes {}, no {}, abstain {})",
                proposal.id, proposal.status, tally.yes, tally.no, tally.abstain
            );
            ctx.emit(
                Event::new("proposal_result")
                    .attr("proposal_id", proposal.id)
                    .attr("status", format!("{:?}", proposal.status)),
            );
        }
        Ok(())
    }

    /// Refund the deposit of voted-through proposals, burn it otherwise.
    fn settle_deposit(&self, ctx: &mut Context<'_>, proposal: &Proposal) -> Result<(), ModuleError> {
        if proposal.deposit == 0 {
            return Ok(());
        }
        let coin = Coin::new(self.staking.bond_denom(ctx)?, proposal.deposit);
        if proposal.status == ProposalStatus::Rejected {
            self.bank.burn_coins(ctx, MODULE_NAME, &coin)
        } else {
            let proposer = AccAddress::from_hex(&proposal.proposer).map_err(gov_error)?;
            self.bank
                .send_from_module_to_account(ctx, MODULE_NAME, &proposer, &coin)
        }
    }

    fn set_proposal(&self, ctx: &mut Context<'_>, proposal: &Proposal) -> Result<(), ModuleError> {
        ctx.kv_mut(&self.store_key)
            .and_then(|s| s.set_json(&proposal_key(proposal.id), proposal))
            .map_err(gov_error)
    }
}

fn proposal_key(id: u64) -> Vec<u8> {
    format!("{PROPOSALS_PREFIX}{id:020}").into_bytes()
}

fn vote_key(id: u64, voter: &AccAddress) -> Vec<u8> {
    format!("votes/{id:020}/{voter}").into_bytes()
}

pub struct GovModule {
    keeper: GovKeeper,
}

impl GovModule {
    pub fn new(keeper: GovKeeper) -> Self {
        Self { keeper }
    }
}

impl AppModule for GovModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(MODULE_NAME)
            .with_hooks(&[Phase::InitGenesis, Phase::EndBlock])
            .depends_on(crate::app::layout::dependencies_of(MODULE_NAME))
    }

    fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &serde_json::Value,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        let state: GovGenesis = decode_genesis(MODULE_NAME, genesis)?;
        self.keeper.set_params(ctx, &state.params)?;
        ctx.kv_mut(&self.keeper.store_key)
            .and_then(|s| s.set_json(NEXT_PROPOSAL_ID, &state.starting_proposal_id))
            .map_err(gov_error)?;
        Ok(Vec::new())
    }

    fn end_block(
        &self,
        ctx: &mut Context<'_>,
        _req: &RequestEndBlock,
    ) -> Result<Vec<ValidatorUpdate>, ModuleError> {
        self.keeper.end_voting(ctx)?;
        Ok(Vec::new())
    }

    fn default_genesis(&self) -> Result<Option<serde_json::Value>, ModuleError> {
        encode_genesis(MODULE_NAME, &GovGenesis::default()).map(Some)
    }

    fn validate_genesis(&self, genesis: &serde_json::Value) -> Result<(), ModuleError> {
        let state: GovGenesis = decode_genesis(MODULE_NAME, genesis)?;
        if state.params.voting_period == 0 {
            return Err(gov_error("voting period must be positive"));
        }
        if state.starting_proposal_id == 0 {
            return Err(gov_error("starting proposal id must be positive"));
        }
        Ok(())
    }
}
