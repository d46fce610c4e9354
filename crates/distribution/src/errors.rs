//! Error types for the distribution engine

use crate::collaborators::Collaborator;
use stipend_types::{AccountId, Amount, ErrorCode, RegionCode, Round};
use thiserror::Error;

/// Errors surfaced by distribution, round and governance operations.
///
/// Every variant maps to a stable numeric code via [`DistributionError::code`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    #[error("unauthorized: {caller} is not the admin")]
    Unauthorized { caller: AccountId },

    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: Amount },

    #[error("beneficiary {beneficiary} is not verified")]
    NotVerified { beneficiary: AccountId },

    #[error("region {region} is not eligible")]
    RegionIneligible { region: RegionCode },

    #[error("distribution is paused")]
    DistributionPaused,

    #[error("beneficiary {beneficiary} already received a distribution in round {round}")]
    AlreadyDistributed { beneficiary: AccountId, round: Round },

    #[error("invalid recipient: {recipient}")]
    InvalidRecipient { recipient: AccountId },

    #[error("cap exceeded in region {region}: used={used}, requested={requested}, cap={cap}")]
    CapExceeded {
        region: RegionCode,
        cap: Amount,
        used: Amount,
        requested: Amount,
    },

    #[error("invalid parameter {param}: {reason}")]
    InvalidParameter { param: String, reason: String },

    #[error("{collaborator} call failed{}", code_suffix(.code))]
    CollaboratorFailure {
        collaborator: Collaborator,
        code: Option<ErrorCode>,
    },
}

impl DistributionError {
    /// Stable numeric code for hosts that expose errors over an ABI.
    pub fn code(&self) -> u32 {
        match self {
            DistributionError::Unauthorized { .. } => 1,
            DistributionError::InvalidAmount { .. } => 2,
            DistributionError::NotVerified { .. } => 3,
            DistributionError::RegionIneligible { .. } => 4,
            DistributionError::DistributionPaused => 5,
            DistributionError::AlreadyDistributed { .. } => 6,
            DistributionError::InvalidRecipient { .. } => 7,
            DistributionError::CapExceeded { .. } => 8,
            DistributionError::InvalidParameter { .. } => 9,
            DistributionError::CollaboratorFailure { .. } => 10,
        }
    }

    pub(crate) fn invalid_parameter(param: &str, reason: impl Into<String>) -> Self {
        DistributionError::InvalidParameter {
            param: param.to_string(),
            reason: reason.into(),
        }
    }
}

fn code_suffix(code: &Option<ErrorCode>) -> String {
    code.map(|c| format!(" with code {c}")).unwrap_or_default()
}

/// Result type for distribution operations
pub type Result<T> = std::result::Result<T, DistributionError>;
