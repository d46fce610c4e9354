//! Scalar units shared across the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token amount in the ledger's smallest unit.
pub type Amount = u128;

/// Distribution epoch. The first round is 1.
pub type Round = u64;

/// Identifier of a distribution log entry. The first entry is 1.
pub type LogId = u64;

/// Host-supplied write-time marker (ledger sequence or unix seconds).
pub type Timestamp = u64;

/// The round a freshly initialised ledger starts in.
pub const GENESIS_ROUND: Round = 1;

/// Opaque error code returned by an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u32);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
