//! Eligibility pipeline
//!
//! Combines the identity verifier, the regional oracle and the admin
//! allow-list into one verdict. Checks run in a fixed order and stop at the
//! first failure:
//!
//! 1. the verifier reports the subject as verified
//! 2. the verifier returns enrollment data (yielding the region)
//! 3. the oracle reports the region as eligible
//! 4. the region is on the allow-list
//!
//! A collaborator error counts as a negative answer. Failures of 1–2 map to
//! `NotVerified`, failures of 3–4 to `RegionIneligible`.

use crate::collaborators::{IdentityVerifier, RegionalOracle};
use crate::errors::{DistributionError, Result};
use stipend_types::{AccountId, RegionCode};
use tracing::debug;

pub struct EligibilityPipeline<'a> {
    verifier: &'a dyn IdentityVerifier,
    oracle: &'a dyn RegionalOracle,
}

impl<'a> EligibilityPipeline<'a> {
    pub fn new(verifier: &'a dyn IdentityVerifier, oracle: &'a dyn RegionalOracle) -> Self {
        Self { verifier, oracle }
    }

    /// Decide whether `beneficiary` may be paid, returning its region.
    ///
    /// `is_allowed` answers the allow-list question; it is consulted last.
    pub fn check<F>(&self, beneficiary: &AccountId, is_allowed: F) -> Result<RegionCode>
    where
        F: FnOnce(&RegionCode) -> bool,
    {
        let not_verified = || DistributionError::NotVerified {
            beneficiary: *beneficiary,
        };

        match self.verifier.is_verified(beneficiary) {
            Ok(true) => {}
            Ok(false) => {
                debug!(target: "distribution", beneficiary = %beneficiary.short(), "Subject not verified");
                return Err(not_verified());
            }
            Err(code) => {
                debug!(target: "distribution", beneficiary = %beneficiary.short(), %code, "Verifier error");
                return Err(not_verified());
            }
        }

        let region = match self.verifier.enrollment_data(beneficiary) {
            Ok(enrollment) => enrollment.region,
            Err(code) => {
                debug!(target: "distribution", beneficiary = %beneficiary.short(), %code, "No enrollment data");
                return Err(not_verified());
            }
        };

        let ineligible = |region: RegionCode| DistributionError::RegionIneligible { region };

        match self.oracle.regional_eligibility(&region) {
            Ok(true) => {}
            Ok(false) => {
                debug!(target: "distribution", region = %region, "Oracle reports region ineligible");
                return Err(ineligible(region));
            }
            Err(code) => {
                debug!(target: "distribution", region = %region, %code, "Oracle error");
                return Err(ineligible(region));
            }
        }

        if !is_allowed(&region) {
            debug!(target: "distribution", region = %region, "Region not on allow-list");
            return Err(ineligible(region));
        }

        Ok(region)
    }
}
