//! External collaborator interfaces
//!
//! The engine never moves value or decides identity itself. It consumes
//! four capabilities supplied by the host:
//! - [`TokenLedger`] performs the actual value transfer
//! - [`IdentityVerifier`] answers "is this subject verified, and where is it enrolled"
//! - [`RegionalOracle`] answers "is this region currently eligible"
//! - [`Clock`] supplies the write-time marker stored on records and log entries
//!
//! Implementations take `&self` so they can be shared behind `Arc` and may
//! call back into the engine while a transfer is in progress.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use stipend_types::{AccountId, Amount, EnrollmentData, ErrorCode, RegionCode, Timestamp};

/// Token ledger that holds balances and performs transfers.
pub trait TokenLedger: Send + Sync {
    /// Move `amount` from `from` to `to`. `Ok(false)` means the ledger
    /// declined the transfer without raising an error.
    fn transfer(&self, amount: Amount, from: &AccountId, to: &AccountId) -> Result<bool, ErrorCode>;
}

/// Identity and enrollment verifier.
pub trait IdentityVerifier: Send + Sync {
    fn is_verified(&self, subject: &AccountId) -> Result<bool, ErrorCode>;

    fn enrollment_data(&self, subject: &AccountId) -> Result<EnrollmentData, ErrorCode>;
}

/// Regional eligibility oracle.
pub trait RegionalOracle: Send + Sync {
    fn regional_eligibility(&self, region: &RegionCode) -> Result<bool, ErrorCode>;
}

/// Source of write-time markers and round-advance timing.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Names a collaborator in error reports.
///
/// Only the token ledger appears here: verifier and oracle failures are
/// reported as `NotVerified` and `RegionIneligible`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    TokenLedger,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::TokenLedger => f.write_str("token ledger"),
        }
    }
}

/// The full set of capabilities injected into a `DistributionEngine`.
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn TokenLedger>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub oracle: Arc<dyn RegionalOracle>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    pub fn new(
        ledger: Arc<dyn TokenLedger>,
        verifier: Arc<dyn IdentityVerifier>,
        oracle: Arc<dyn RegionalOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            verifier,
            oracle,
            clock,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}
