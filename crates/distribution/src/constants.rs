use stipend_types::{Amount, Timestamp};

/// Ceiling on a single payout. Requests above it fail with `InvalidAmount`.
pub const MAX_PER_BENEFICIARY: Amount = 10_000;

/// Default amount paid to each beneficiary by batch distribution.
pub const DEFAULT_TOKENS_PER_BENEFICIARY: Amount = 100;

/// Minimum time between round advances (30 days, in seconds).
/// The elapsed time must be strictly greater than this value.
pub const MIN_ROUND_INTERVAL: Timestamp = 30 * 24 * 60 * 60;

/// Maximum number of beneficiaries accepted by one batch call.
pub const MAX_BATCH_SIZE: usize = 100;

/// Error code the in-memory token ledger returns for an underfunded payer.
pub const LEDGER_INSUFFICIENT_BALANCE: u32 = 1;

/// Error code the in-memory verifier returns for an unknown subject.
pub const VERIFIER_UNKNOWN_SUBJECT: u32 = 404;
