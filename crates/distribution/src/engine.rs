//! Distribution engine
//!
//! Orchestrates a single payout:
//! pause check → idempotency → amount → recipient → eligibility →
//! quota reservation → token transfer → record + log.
//!
//! ## Key Invariants
//! - At most one record per (beneficiary, round)
//! - For a bounded region, `used <= cap` reflects successful payouts only
//! - No record or log entry is visible for a payout whose transfer failed
//!
//! The engine never holds its state lock while a collaborator runs. Before
//! the transfer is issued the key is marked in flight and the quota is
//! reserved, so a collaborator that re-enters the engine sees both.

use crate::caps::RegionalCap;
use crate::collaborators::{Collaborator, Collaborators};
use crate::config::{ConfigError, EngineParams, GenesisConfig};
use crate::constants::DEFAULT_TOKENS_PER_BENEFICIARY;
use crate::eligibility::EligibilityPipeline;
use crate::errors::{DistributionError, Result};
use crate::governance::Configuration;
use crate::log::DistributionLogEntry;
use crate::state::{DistributionRecord, LedgerState};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use stipend_types::{AccountId, Amount, LogId, RegionCode, Round, Timestamp};
use tracing::{debug, info, warn};

/// Summary counters for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatistics {
    pub current_round: Round,
    /// Earliest clock value at which the next round can start
    pub next_round_at: Timestamp,
    pub total_distributed: Amount,
    pub total_payouts: u64,
    pub allowed_regions: usize,
    pub capped_regions: usize,
    pub paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PauseGate {
    Enforce,
    CheckedByCaller,
}

/// A reservation taken before the transfer, undone if the transfer fails.
struct PendingPayout {
    beneficiary: AccountId,
    round: Round,
    region: RegionCode,
    amount: Amount,
    /// Generation of the cap entry charged, `None` for an untracked region
    charged: Option<u64>,
}

pub struct DistributionEngine {
    state: RwLock<LedgerState>,
    params: EngineParams,
    collaborators: Collaborators,
}

impl DistributionEngine {
    /// Create a ledger in round 1 administered by `admin`.
    pub fn new(admin: AccountId, params: EngineParams, collaborators: Collaborators) -> Self {
        let genesis_time = collaborators.clock.now();
        let config = Configuration::new(admin, DEFAULT_TOKENS_PER_BENEFICIARY);
        Self {
            state: RwLock::new(LedgerState::new(config, genesis_time)),
            params,
            collaborators,
        }
    }

    /// Create a ledger from a validated genesis configuration.
    pub fn from_genesis(
        genesis: &GenesisConfig,
        collaborators: Collaborators,
    ) -> std::result::Result<Self, ConfigError> {
        genesis.validate()?;

        let genesis_time = collaborators.clock.now();
        let mut config = Configuration::new(genesis.admin, genesis.tokens_per_beneficiary);
        config.allowed_regions = genesis.allowed_regions.iter().cloned().collect();

        let mut state = LedgerState::new(config, genesis_time);
        for (region, cap) in &genesis.regional_caps {
            state.caps.set_cap(region.clone(), *cap);
        }

        info!(
            target: "distribution",
            admin = %genesis.admin.short(),
            regions = genesis.allowed_regions.len(),
            caps = genesis.regional_caps.len(),
            "Ledger initialised at genesis"
        );

        Ok(Self {
            state: RwLock::new(state),
            params: genesis.params,
            collaborators,
        })
    }

    /// Resume from a previously taken snapshot.
    pub fn from_state(
        state: LedgerState,
        params: EngineParams,
        collaborators: Collaborators,
    ) -> std::result::Result<Self, ConfigError> {
        params.validate()?;
        state.validate().map_err(ConfigError::Invalid)?;
        Ok(Self {
            state: RwLock::new(state),
            params,
            collaborators,
        })
    }

    /// Copy of the full ledger state for persistence.
    pub fn snapshot(&self) -> LedgerState {
        self.state.read().clone()
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    // ========================================================================
    // DISTRIBUTION
    // ========================================================================

    /// Pay `amount` from `caller` to `beneficiary` for the current round.
    pub fn distribute(&self, caller: &AccountId, beneficiary: &AccountId, amount: Amount) -> Result<()> {
        self.execute(caller, beneficiary, amount, PauseGate::Enforce)
    }

    /// Batch path: the caller already checked the pause flag once.
    pub(crate) fn distribute_unpaused(
        &self,
        caller: &AccountId,
        beneficiary: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.execute(caller, beneficiary, amount, PauseGate::CheckedByCaller)
    }

    fn execute(
        &self,
        caller: &AccountId,
        beneficiary: &AccountId,
        amount: Amount,
        gate: PauseGate,
    ) -> Result<()> {
        self.precheck(caller, beneficiary, amount, gate)?;

        let region = {
            let pipeline = EligibilityPipeline::new(
                self.collaborators.verifier.as_ref(),
                self.collaborators.oracle.as_ref(),
            );
            pipeline.check(beneficiary, |region| {
                self.state.read().config.is_region_allowed(region)
            })?
        };

        let pending = self.reserve(beneficiary, region, amount, gate)?;

        let outcome = self
            .collaborators
            .ledger
            .transfer(amount, caller, beneficiary);

        match outcome {
            Ok(true) => {
                self.commit(pending);
                Ok(())
            }
            Ok(false) => {
                self.roll_back(pending);
                Err(DistributionError::CollaboratorFailure {
                    collaborator: Collaborator::TokenLedger,
                    code: None,
                })
            }
            Err(code) => {
                self.roll_back(pending);
                Err(DistributionError::CollaboratorFailure {
                    collaborator: Collaborator::TokenLedger,
                    code: Some(code),
                })
            }
        }
    }

    /// Checks that need no collaborator: pause, idempotency, amount, recipient.
    fn precheck(
        &self,
        caller: &AccountId,
        beneficiary: &AccountId,
        amount: Amount,
        gate: PauseGate,
    ) -> Result<()> {
        let state = self.state.read();

        if gate == PauseGate::Enforce && state.config.is_paused() {
            return Err(DistributionError::DistributionPaused);
        }

        let round = state.rounds.current();
        if state.is_claimed(beneficiary, round) {
            debug!(
                target: "distribution",
                beneficiary = %beneficiary.short(),
                round,
                "Duplicate distribution refused"
            );
            return Err(DistributionError::AlreadyDistributed {
                beneficiary: *beneficiary,
                round,
            });
        }

        if amount == 0 || amount > self.params.max_per_beneficiary {
            return Err(DistributionError::InvalidAmount { amount });
        }

        if beneficiary == caller {
            return Err(DistributionError::InvalidRecipient {
                recipient: *beneficiary,
            });
        }

        Ok(())
    }

    /// Claim the (beneficiary, round) key and the region quota atomically.
    ///
    /// Pause and idempotency are checked again because the eligibility
    /// collaborators may have re-entered the engine.
    fn reserve(
        &self,
        beneficiary: &AccountId,
        region: RegionCode,
        amount: Amount,
        gate: PauseGate,
    ) -> Result<PendingPayout> {
        let mut state = self.state.write();

        if gate == PauseGate::Enforce && state.config.is_paused() {
            return Err(DistributionError::DistributionPaused);
        }

        let round = state.rounds.current();
        if state.is_claimed(beneficiary, round) {
            return Err(DistributionError::AlreadyDistributed {
                beneficiary: *beneficiary,
                round,
            });
        }

        let charged = state.caps.reserve(&region, amount)?;
        state.mark_in_flight(*beneficiary, round);

        Ok(PendingPayout {
            beneficiary: *beneficiary,
            round,
            region,
            amount,
            charged,
        })
    }

    fn commit(&self, pending: PendingPayout) {
        let now = self.collaborators.clock.now();
        let mut state = self.state.write();
        state.clear_in_flight(&pending.beneficiary, pending.round);

        let inserted = state.insert_record(
            pending.beneficiary,
            pending.round,
            DistributionRecord {
                amount: pending.amount,
                timestamp: now,
                redeemed: false,
            },
        );
        // The in-flight marker guarantees the key was free
        debug_assert!(inserted, "in-flight key was taken before commit");

        let log_id = state
            .log
            .append(pending.beneficiary, pending.amount, pending.round, now);

        info!(
            target: "distribution",
            beneficiary = %pending.beneficiary.short(),
            region = %pending.region,
            round = pending.round,
            amount = pending.amount,
            log_id,
            "Distribution committed"
        );
    }

    fn roll_back(&self, pending: PendingPayout) {
        let mut state = self.state.write();
        state.clear_in_flight(&pending.beneficiary, pending.round);

        // A round advance or cap overwrite during the transfer bumps the
        // generation, and the reservation is no longer part of `used`
        if let Some(generation) = pending.charged {
            state.caps.release(&pending.region, pending.amount, generation);
        }

        warn!(
            target: "distribution",
            beneficiary = %pending.beneficiary.short(),
            region = %pending.region,
            round = pending.round,
            amount = pending.amount,
            "Transfer failed, quota reservation released"
        );
    }

    // ========================================================================
    // ROUNDS
    // ========================================================================

    /// Advance to the next round. Admin only; requires the minimum interval
    /// to have strictly elapsed. Clears every region's usage.
    pub fn start_new_round(&self, caller: &AccountId) -> Result<Round> {
        let now = self.collaborators.clock.now();
        let mut guard = self.state.write();
        let state = &mut *guard;
        let token = state.config.authorize(caller)?;
        state
            .rounds
            .advance(&token, now, self.params.min_round_interval, &mut state.caps)
    }

    // ========================================================================
    // GOVERNANCE
    // ========================================================================

    pub fn set_tokens_per_beneficiary(&self, caller: &AccountId, amount: Amount) -> Result<()> {
        if amount > self.params.max_per_beneficiary {
            self.state.read().config.authorize(caller)?;
            return Err(DistributionError::InvalidAmount { amount });
        }
        self.state.write().config.set_tokens_per_beneficiary(caller, amount)
    }

    pub fn add_allowed_region(&self, caller: &AccountId, region: RegionCode) -> Result<()> {
        self.state.write().config.add_allowed_region(caller, region)
    }

    pub fn remove_allowed_region(&self, caller: &AccountId, region: &RegionCode) -> Result<()> {
        self.state.write().config.remove_allowed_region(caller, region)
    }

    pub fn set_regional_cap(&self, caller: &AccountId, region: RegionCode, cap: Amount) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.config.set_regional_cap(caller, &mut state.caps, region, cap)
    }

    pub fn pause(&self, caller: &AccountId) -> Result<()> {
        self.state.write().config.pause(caller)
    }

    pub fn unpause(&self, caller: &AccountId) -> Result<()> {
        self.state.write().config.unpause(caller)
    }

    pub fn transfer_admin(&self, caller: &AccountId, new_admin: AccountId) -> Result<()> {
        self.state.write().config.transfer_admin(caller, new_admin)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn distribution(&self, beneficiary: &AccountId, round: Round) -> Option<DistributionRecord> {
        self.state.read().record(beneficiary, round).cloned()
    }

    /// Every record held by `beneficiary`, ordered by round.
    pub fn distributions_for(&self, beneficiary: &AccountId) -> Vec<(Round, DistributionRecord)> {
        self.state.read().records_for(beneficiary)
    }

    pub fn regional_cap(&self, region: &RegionCode) -> Option<RegionalCap> {
        self.state.read().caps.get(region)
    }

    pub fn is_region_allowed(&self, region: &RegionCode) -> bool {
        self.state.read().config.is_region_allowed(region)
    }

    pub fn current_round(&self) -> Round {
        self.state.read().rounds.current()
    }

    pub fn tokens_per_beneficiary(&self) -> Amount {
        self.state.read().config.tokens_per_beneficiary()
    }

    pub fn distribution_log(&self, id: LogId) -> Option<DistributionLogEntry> {
        self.state.read().log.get(id).cloned()
    }

    /// Log entries with ids in `from..=to`.
    pub fn distribution_log_range(&self, from: LogId, to: LogId) -> Vec<DistributionLogEntry> {
        self.state.read().log.range(from, to).to_vec()
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().config.is_paused()
    }

    pub fn admin(&self) -> AccountId {
        *self.state.read().config.admin()
    }

    /// Sum of payouts committed in `round`.
    pub fn round_total(&self, round: Round) -> Amount {
        self.state
            .read()
            .records_in_round(round)
            .fold(0, |acc: Amount, (_, r)| acc.saturating_add(r.amount))
    }

    pub fn statistics(&self) -> LedgerStatistics {
        let state = self.state.read();
        LedgerStatistics {
            current_round: state.rounds.current(),
            next_round_at: state.rounds.next_eligible_at(self.params.min_round_interval),
            total_distributed: state.log.total_amount(),
            total_payouts: state.log.last_id(),
            allowed_regions: state.config.allowed_regions().count(),
            capped_regions: state.caps.bounded_regions(),
            paused: state.config.is_paused(),
        }
    }
}

impl std::fmt::Debug for DistributionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributionEngine")
            .field("round", &self.current_round())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
