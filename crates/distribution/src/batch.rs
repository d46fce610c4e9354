//! Batch distribution
//!
//! Pays the configured per-beneficiary amount to a bounded list of
//! beneficiaries. Individual failures are skipped; only the number of
//! successful payouts is reported. Callers that need failure reasons call
//! [`DistributionEngine::distribute`] per beneficiary.
//!
//! The pause flag is read once, before the first item. A pause issued while
//! the batch runs (from a re-entrant collaborator) does not stop it.

use crate::engine::DistributionEngine;
use crate::errors::{DistributionError, Result};
use stipend_types::AccountId;
use tracing::{debug, info};

impl DistributionEngine {
    /// Distribute `tokens_per_beneficiary` to each listed beneficiary.
    ///
    /// Fails as a whole only when the list exceeds `max_batch_size` or
    /// distribution is paused.
    pub fn auto_distribute(&self, caller: &AccountId, beneficiaries: &[AccountId]) -> Result<usize> {
        let max = self.params().max_batch_size;
        if beneficiaries.len() > max {
            return Err(DistributionError::invalid_parameter(
                "beneficiaries",
                format!("{} exceeds batch limit {}", beneficiaries.len(), max),
            ));
        }

        if self.is_paused() {
            return Err(DistributionError::DistributionPaused);
        }

        let amount = self.tokens_per_beneficiary();
        let mut succeeded = 0usize;

        for beneficiary in beneficiaries {
            match self.distribute_unpaused(caller, beneficiary, amount) {
                Ok(()) => succeeded += 1,
                Err(err) => {
                    debug!(
                        target: "distribution",
                        beneficiary = %beneficiary.short(),
                        code = err.code(),
                        "Batch item skipped: {}",
                        err
                    );
                }
            }
        }

        info!(
            target: "distribution",
            requested = beneficiaries.len(),
            succeeded,
            amount,
            "Batch distribution finished"
        );

        Ok(succeeded)
    }
}
