//! Stipend Distribution Engine
//!
//! Allocates a fixed per-beneficiary credit once per distribution round:
//! - ✅ Eligibility gated by identity verifier, regional oracle and allow-list
//! - 📊 Per-region quotas with round-boundary reset
//! - 🔁 Exactly-once payout per (beneficiary, round)
//! - 📜 Append-only distribution log
//! - 🛡️ Single-admin governance over pausing, quotas and sizing
//!
//! External collaborators (token ledger, verifier, oracle, clock) are
//! injected as trait objects; see [`collaborators`].

pub mod batch;
pub mod caps;
pub mod collaborators;
pub mod config;
pub mod constants;
pub mod eligibility;
pub mod engine;
pub mod errors;
pub mod governance;
pub mod log;
pub mod memory;
pub mod round;
pub mod state;

pub use caps::{CapLedger, RegionalCap};
pub use collaborators::{
    Clock, Collaborator, Collaborators, IdentityVerifier, RegionalOracle, TokenLedger,
};
pub use config::{ConfigError, EngineParams, GenesisConfig};
pub use constants::*;
pub use eligibility::EligibilityPipeline;
pub use engine::{DistributionEngine, LedgerStatistics};
pub use errors::{DistributionError, Result};
pub use governance::{AdminToken, Configuration};
pub use log::{DistributionLog, DistributionLogEntry};
pub use round::RoundController;
pub use state::{DistributionRecord, LedgerState};

pub use stipend_types::{
    AccountId, Amount, EnrollmentData, ErrorCode, LogId, RegionCode, Round, Timestamp,
};

/// Distribution module version (for API introspection)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
