//! Scenario runner
//!
//! A scenario is a JSON document that seeds the in-memory collaborators and
//! lists the operations to replay against a fresh ledger:
//!
//! ```json
//! {
//!   "start_time": 1700000000,
//!   "balances": { "treasury": 1000000 },
//!   "identities": [{ "account": "alice", "region": "A" }],
//!   "oracle": { "A": true },
//!   "steps": [
//!     { "op": "distribute", "caller": "treasury", "beneficiary": "alice", "amount": 500 },
//!     { "op": "advance_time", "seconds": 2592001 },
//!     { "op": "start_new_round", "caller": "s1111…", "expect_error": 9 }
//!   ]
//! }
//! ```
//!
//! Accounts are written either as a full account id or as a label, which is
//! hashed into an id with [`AccountId::derive`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use stipend_distribution::memory::{InMemoryTokenLedger, ManualClock, StaticOracle, StaticVerifier};
use stipend_distribution::{
    AccountId, Amount, Collaborators, DistributionEngine, EnrollmentData, GenesisConfig,
    LedgerStatistics, RegionCode, Timestamp,
};
use tracing::{info, warn};

/// Resolve an account written in a scenario file.
pub fn resolve_account(value: &str) -> AccountId {
    value
        .parse::<AccountId>()
        .unwrap_or_else(|_| AccountId::derive(value))
}

fn default_true() -> bool {
    true
}

fn default_org() -> String {
    "scenario".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub account: String,
    pub region: RegionCode,
    #[serde(default)]
    pub enrollment_date: Timestamp,
    #[serde(default = "default_org")]
    pub org: String,
    #[serde(default = "default_true")]
    pub verified: bool,
}

/// Amounts inside steps are `u64`: internally tagged enums buffer their
/// fields, and the buffer has no 128-bit integers.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Distribute {
        caller: String,
        beneficiary: String,
        amount: u64,
    },
    AutoDistribute {
        caller: String,
        beneficiaries: Vec<String>,
    },
    StartNewRound {
        caller: String,
    },
    SetTokensPerBeneficiary {
        caller: String,
        amount: u64,
    },
    AddAllowedRegion {
        caller: String,
        region: RegionCode,
    },
    RemoveAllowedRegion {
        caller: String,
        region: RegionCode,
    },
    SetRegionalCap {
        caller: String,
        region: RegionCode,
        cap: u64,
    },
    Pause {
        caller: String,
    },
    Unpause {
        caller: String,
    },
    TransferAdmin {
        caller: String,
        new_admin: String,
    },
    /// Move the simulated clock forward
    AdvanceTime {
        seconds: Timestamp,
    },
    /// Change what the oracle reports for a region
    SetOracle {
        region: RegionCode,
        eligible: bool,
    },
    /// Withdraw a subject's verification
    Revoke {
        account: String,
    },
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Distribute { .. } => "distribute",
            Action::AutoDistribute { .. } => "auto_distribute",
            Action::StartNewRound { .. } => "start_new_round",
            Action::SetTokensPerBeneficiary { .. } => "set_tokens_per_beneficiary",
            Action::AddAllowedRegion { .. } => "add_allowed_region",
            Action::RemoveAllowedRegion { .. } => "remove_allowed_region",
            Action::SetRegionalCap { .. } => "set_regional_cap",
            Action::Pause { .. } => "pause",
            Action::Unpause { .. } => "unpause",
            Action::TransferAdmin { .. } => "transfer_admin",
            Action::AdvanceTime { .. } => "advance_time",
            Action::SetOracle { .. } => "set_oracle",
            Action::Revoke { .. } => "revoke",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    /// Error code the step must fail with; absent means it must succeed
    #[serde(default)]
    pub expect_error: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub start_time: Timestamp,
    #[serde(default)]
    pub balances: BTreeMap<String, Amount>,
    #[serde(default)]
    pub identities: Vec<Identity>,
    #[serde(default)]
    pub oracle: BTreeMap<RegionCode, bool>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse scenario")
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_json_str(&content)
    }
}

/// Result of one replayed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// False when the outcome differs from the step's expectation
    pub as_expected: bool,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub steps: Vec<StepOutcome>,
    pub statistics: LedgerStatistics,
    pub balances: BTreeMap<String, Amount>,
}

impl SimulationReport {
    pub fn mismatches(&self) -> usize {
        self.steps.iter().filter(|s| !s.as_expected).count()
    }
}

/// In-memory world a scenario runs in.
pub struct Simulation {
    pub engine: DistributionEngine,
    ledger: Arc<InMemoryTokenLedger>,
    verifier: Arc<StaticVerifier>,
    oracle: Arc<StaticOracle>,
    clock: Arc<ManualClock>,
    accounts: BTreeMap<String, AccountId>,
}

impl Simulation {
    pub fn new(genesis: &GenesisConfig, scenario: &Scenario) -> Result<Self> {
        let ledger = Arc::new(InMemoryTokenLedger::new());
        let verifier = Arc::new(StaticVerifier::new());
        let oracle = Arc::new(StaticOracle::new());
        let clock = Arc::new(ManualClock::new(scenario.start_time));
        let mut accounts = BTreeMap::new();

        for (label, amount) in &scenario.balances {
            let account = resolve_account(label);
            ledger.mint(&account, *amount);
            accounts.insert(label.clone(), account);
        }

        for identity in &scenario.identities {
            let account = resolve_account(&identity.account);
            let enrollment = EnrollmentData::new(
                identity.enrollment_date,
                identity.region.clone(),
                identity.org.clone(),
            );
            if identity.verified {
                verifier.enroll(account, enrollment);
            } else {
                verifier.enroll_unverified(account, enrollment);
            }
            accounts.insert(identity.account.clone(), account);
        }

        for (region, eligible) in &scenario.oracle {
            oracle.set_eligible(region.clone(), *eligible);
        }

        let engine = DistributionEngine::from_genesis(
            genesis,
            Collaborators::new(ledger.clone(), verifier.clone(), oracle.clone(), clock.clone()),
        )
        .context("Failed to initialise ledger from genesis")?;

        Ok(Self {
            engine,
            ledger,
            verifier,
            oracle,
            clock,
            accounts,
        })
    }

    /// Replay every step, recording outcomes. Failing steps do not stop the run.
    pub fn run(&mut self, steps: &[Step]) -> SimulationReport {
        let mut outcomes = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let result = self.apply(&step.action);
            let (ok, error_code, detail) = match result {
                Ok(detail) => (true, None, detail),
                Err(err) => (false, Some(err.code()), Some(err.to_string())),
            };
            let as_expected = error_code == step.expect_error;
            if !as_expected {
                warn!(
                    step = index,
                    op = step.action.name(),
                    expected = ?step.expect_error,
                    actual = ?error_code,
                    "Step outcome differs from expectation"
                );
            }
            outcomes.push(StepOutcome {
                index,
                op: step.action.name(),
                ok,
                error_code,
                detail,
                as_expected,
            });
        }

        let balances = self
            .accounts
            .iter()
            .map(|(label, account)| (label.clone(), self.ledger.balance_of(account)))
            .collect();

        let report = SimulationReport {
            steps: outcomes,
            statistics: self.engine.statistics(),
            balances,
        };
        info!(
            steps = report.steps.len(),
            mismatches = report.mismatches(),
            "Scenario finished"
        );
        report
    }

    fn account(&mut self, value: &str) -> AccountId {
        let account = resolve_account(value);
        self.accounts.entry(value.to_string()).or_insert(account);
        account
    }

    fn apply(&mut self, action: &Action) -> stipend_distribution::Result<Option<String>> {
        match action {
            Action::Distribute {
                caller,
                beneficiary,
                amount,
            } => {
                let caller = self.account(caller);
                let beneficiary = self.account(beneficiary);
                self.engine
                    .distribute(&caller, &beneficiary, Amount::from(*amount))?;
                Ok(None)
            }
            Action::AutoDistribute {
                caller,
                beneficiaries,
            } => {
                let caller = self.account(caller);
                let list: Vec<AccountId> = beneficiaries.iter().map(|b| self.account(b)).collect();
                let paid = self.engine.auto_distribute(&caller, &list)?;
                Ok(Some(format!("{paid} of {} paid", list.len())))
            }
            Action::StartNewRound { caller } => {
                let caller = self.account(caller);
                let round = self.engine.start_new_round(&caller)?;
                Ok(Some(format!("round {round}")))
            }
            Action::SetTokensPerBeneficiary { caller, amount } => {
                let caller = self.account(caller);
                self.engine
                    .set_tokens_per_beneficiary(&caller, Amount::from(*amount))?;
                Ok(None)
            }
            Action::AddAllowedRegion { caller, region } => {
                let caller = self.account(caller);
                self.engine.add_allowed_region(&caller, region.clone())?;
                Ok(None)
            }
            Action::RemoveAllowedRegion { caller, region } => {
                let caller = self.account(caller);
                self.engine.remove_allowed_region(&caller, region)?;
                Ok(None)
            }
            Action::SetRegionalCap {
                caller,
                region,
                cap,
            } => {
                let caller = self.account(caller);
                self.engine
                    .set_regional_cap(&caller, region.clone(), Amount::from(*cap))?;
                Ok(None)
            }
            Action::Pause { caller } => {
                let caller = self.account(caller);
                self.engine.pause(&caller)?;
                Ok(None)
            }
            Action::Unpause { caller } => {
                let caller = self.account(caller);
                self.engine.unpause(&caller)?;
                Ok(None)
            }
            Action::TransferAdmin { caller, new_admin } => {
                let caller = self.account(caller);
                let new_admin = self.account(new_admin);
                self.engine.transfer_admin(&caller, new_admin)?;
                Ok(None)
            }
            Action::AdvanceTime { seconds } => {
                let now = self.clock.advance(*seconds);
                Ok(Some(format!("now {now}")))
            }
            Action::SetOracle { region, eligible } => {
                self.oracle.set_eligible(region.clone(), *eligible);
                Ok(None)
            }
            Action::Revoke { account } => {
                let account = self.account(account);
                self.verifier.revoke(&account);
                Ok(None)
            }
        }
    }
}
