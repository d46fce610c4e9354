//! In-memory collaborators
//!
//! Deterministic implementations of the collaborator traits for local
//! simulation (the `stipend-cli` scenario runner) and for tests.

use crate::collaborators::{Clock, IdentityVerifier, RegionalOracle, TokenLedger};
use crate::constants::{LEDGER_INSUFFICIENT_BALANCE, VERIFIER_UNKNOWN_SUBJECT};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use stipend_types::{AccountId, Amount, EnrollmentData, ErrorCode, RegionCode, Timestamp};

// -----------------------------------------------------------------------------
// Token ledger
// -----------------------------------------------------------------------------

/// How the in-memory ledger answers the next transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferBehaviour {
    /// Move funds when the payer can cover them
    #[default]
    Settle,
    /// Return `Ok(false)` without moving anything
    Decline,
    /// Return the given error code without moving anything
    Fail(ErrorCode),
}

/// A transfer the ledger was asked to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCall {
    pub amount: Amount,
    pub from: AccountId,
    pub to: AccountId,
}

#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    balances: RwLock<HashMap<AccountId, Amount>>,
    calls: RwLock<Vec<TransferCall>>,
    behaviour: RwLock<TransferBehaviour>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account balance (builder style).
    pub fn with_balance(self, account: AccountId, amount: Amount) -> Self {
        self.mint(&account, amount);
        self
    }

    pub fn mint(&self, account: &AccountId, amount: Amount) {
        let mut balances = self.balances.write();
        let entry = balances.entry(*account).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.read().get(account).copied().unwrap_or(0)
    }

    pub fn set_behaviour(&self, behaviour: TransferBehaviour) {
        *self.behaviour.write() = behaviour;
    }

    /// Every transfer request received, including declined and failed ones.
    pub fn calls(&self) -> Vec<TransferCall> {
        self.calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn transfer(&self, amount: Amount, from: &AccountId, to: &AccountId) -> Result<bool, ErrorCode> {
        self.calls.write().push(TransferCall {
            amount,
            from: *from,
            to: *to,
        });

        match *self.behaviour.read() {
            TransferBehaviour::Settle => {}
            TransferBehaviour::Decline => return Ok(false),
            TransferBehaviour::Fail(code) => return Err(code),
        }

        let mut balances = self.balances.write();
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(ErrorCode(LEDGER_INSUFFICIENT_BALANCE));
        }
        balances.insert(*from, available - amount);
        let credited = balances.entry(*to).or_insert(0);
        *credited = credited.saturating_add(amount);
        Ok(true)
    }
}

// -----------------------------------------------------------------------------
// Identity verifier
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Subject {
    verified: bool,
    enrollment: Option<EnrollmentData>,
}

/// Verifier backed by a fixed table of subjects.
///
/// Unknown subjects produce `ErrorCode(VERIFIER_UNKNOWN_SUBJECT)` from both
/// calls, mirroring a verifier that has no record of them.
#[derive(Debug, Default)]
pub struct StaticVerifier {
    subjects: RwLock<HashMap<AccountId, Subject>>,
    outage: RwLock<Option<ErrorCode>>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a verified subject enrolled in `enrollment.region`.
    pub fn enroll(&self, subject: AccountId, enrollment: EnrollmentData) {
        self.subjects.write().insert(
            subject,
            Subject {
                verified: true,
                enrollment: Some(enrollment),
            },
        );
    }

    /// Register a subject the verifier knows but has not verified.
    pub fn enroll_unverified(&self, subject: AccountId, enrollment: EnrollmentData) {
        self.subjects.write().insert(
            subject,
            Subject {
                verified: false,
                enrollment: Some(enrollment),
            },
        );
    }

    /// Register a verified subject with no enrollment data on file.
    pub fn verify_without_enrollment(&self, subject: AccountId) {
        self.subjects.write().insert(
            subject,
            Subject {
                verified: true,
                enrollment: None,
            },
        );
    }

    pub fn revoke(&self, subject: &AccountId) {
        if let Some(entry) = self.subjects.write().get_mut(subject) {
            entry.verified = false;
        }
    }

    /// Make every call fail with `code` until cleared with `None`.
    pub fn set_outage(&self, code: Option<ErrorCode>) {
        *self.outage.write() = code;
    }
}

impl IdentityVerifier for StaticVerifier {
    fn is_verified(&self, subject: &AccountId) -> Result<bool, ErrorCode> {
        if let Some(code) = *self.outage.read() {
            return Err(code);
        }
        self.subjects
            .read()
            .get(subject)
            .map(|s| s.verified)
            .ok_or(ErrorCode(VERIFIER_UNKNOWN_SUBJECT))
    }

    fn enrollment_data(&self, subject: &AccountId) -> Result<EnrollmentData, ErrorCode> {
        if let Some(code) = *self.outage.read() {
            return Err(code);
        }
        self.subjects
            .read()
            .get(subject)
            .and_then(|s| s.enrollment.clone())
            .ok_or(ErrorCode(VERIFIER_UNKNOWN_SUBJECT))
    }
}

// -----------------------------------------------------------------------------
// Regional oracle
// -----------------------------------------------------------------------------

/// Oracle answering from a fixed table. Unknown regions are ineligible.
#[derive(Debug, Default)]
pub struct StaticOracle {
    answers: RwLock<HashMap<RegionCode, Result<bool, ErrorCode>>>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_eligible(&self, region: RegionCode, eligible: bool) {
        self.answers.write().insert(region, Ok(eligible));
    }

    pub fn set_failure(&self, region: RegionCode, code: ErrorCode) {
        self.answers.write().insert(region, Err(code));
    }
}

impl RegionalOracle for StaticOracle {
    fn regional_eligibility(&self, region: &RegionCode) -> Result<bool, ErrorCode> {
        self.answers.read().get(region).copied().unwrap_or(Ok(false))
    }
}

// -----------------------------------------------------------------------------
// Clocks
// -----------------------------------------------------------------------------

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Timestamp) -> Timestamp {
        self.now.fetch_add(by, Ordering::SeqCst).saturating_add(by)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Unix time in seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}
