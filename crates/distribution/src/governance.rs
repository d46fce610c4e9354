//! Governance gate
//!
//! A single admin principal controls every mutating configuration
//! operation. Authorization is checked by [`Configuration::authorize`],
//! which hands back an [`AdminToken`]; operations that need an admin
//! (round advance, cap sizing) take the token instead of re-checking.

use crate::caps::CapLedger;
use crate::errors::{DistributionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use stipend_types::{AccountId, Amount, RegionCode};
use tracing::info;

/// Proof that the caller was the admin at the time of the check.
#[derive(Debug)]
pub struct AdminToken {
    _private: (),
}

/// Admin-controlled configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub(crate) admin: AccountId,
    pub(crate) paused: bool,
    pub(crate) tokens_per_beneficiary: Amount,
    pub(crate) allowed_regions: BTreeSet<RegionCode>,
}

impl Configuration {
    pub fn new(admin: AccountId, tokens_per_beneficiary: Amount) -> Self {
        Self {
            admin,
            paused: false,
            tokens_per_beneficiary,
            allowed_regions: BTreeSet::new(),
        }
    }

    pub fn admin(&self) -> &AccountId {
        &self.admin
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tokens_per_beneficiary(&self) -> Amount {
        self.tokens_per_beneficiary
    }

    pub fn is_region_allowed(&self, region: &RegionCode) -> bool {
        self.allowed_regions.contains(region)
    }

    pub fn allowed_regions(&self) -> impl Iterator<Item = &RegionCode> {
        self.allowed_regions.iter()
    }

    pub fn authorize(&self, caller: &AccountId) -> Result<AdminToken> {
        if caller != &self.admin {
            return Err(DistributionError::Unauthorized { caller: *caller });
        }
        Ok(AdminToken { _private: () })
    }

    pub fn set_tokens_per_beneficiary(&mut self, caller: &AccountId, amount: Amount) -> Result<()> {
        self.authorize(caller)?;
        if amount == 0 {
            return Err(DistributionError::InvalidAmount { amount });
        }
        self.tokens_per_beneficiary = amount;
        info!(target: "governance", amount, "Tokens per beneficiary updated");
        Ok(())
    }

    /// Allow-list a region. Adding a region twice is a no-op.
    pub fn add_allowed_region(&mut self, caller: &AccountId, region: RegionCode) -> Result<()> {
        self.authorize(caller)?;
        info!(target: "governance", region = %region, "Region allowed");
        self.allowed_regions.insert(region);
        Ok(())
    }

    /// Remove a region from the allow-list. Removing an unknown region is a no-op.
    pub fn remove_allowed_region(&mut self, caller: &AccountId, region: &RegionCode) -> Result<()> {
        self.authorize(caller)?;
        if self.allowed_regions.remove(region) {
            info!(target: "governance", region = %region, "Region removed from allow-list");
        }
        Ok(())
    }

    /// Overwrite a region's cap. The region's usage restarts at zero.
    pub fn set_regional_cap(
        &self,
        caller: &AccountId,
        caps: &mut CapLedger,
        region: RegionCode,
        cap: Amount,
    ) -> Result<()> {
        self.authorize(caller)?;
        info!(target: "governance", region = %region, cap, "Regional cap set");
        caps.set_cap(region, cap);
        Ok(())
    }

    pub fn pause(&mut self, caller: &AccountId) -> Result<()> {
        self.authorize(caller)?;
        self.paused = true;
        info!(target: "governance", "Distribution paused");
        Ok(())
    }

    pub fn unpause(&mut self, caller: &AccountId) -> Result<()> {
        self.authorize(caller)?;
        self.paused = false;
        info!(target: "governance", "Distribution unpaused");
        Ok(())
    }

    pub fn transfer_admin(&mut self, caller: &AccountId, new_admin: AccountId) -> Result<()> {
        self.authorize(caller)?;
        if new_admin.is_zero() {
            return Err(DistributionError::InvalidRecipient {
                recipient: new_admin,
            });
        }
        info!(
            target: "governance",
            from = %self.admin.short(),
            to = %new_admin.short(),
            "Admin transferred"
        );
        self.admin = new_admin;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AccountId {
        AccountId::derive("admin")
    }

    fn region(code: &str) -> RegionCode {
        RegionCode::new(code).unwrap()
    }

    #[test]
    fn every_operation_requires_admin() {
        let mut cfg = Configuration::new(admin(), 100);
        let mut caps = CapLedger::new();
        let mallory = AccountId::derive("mallory");
        let unauthorized = DistributionError::Unauthorized { caller: mallory };

        assert_eq!(cfg.set_tokens_per_beneficiary(&mallory, 5), Err(unauthorized.clone()));
        assert_eq!(cfg.add_allowed_region(&mallory, region("A")), Err(unauthorized.clone()));
        assert_eq!(cfg.remove_allowed_region(&mallory, &region("A")), Err(unauthorized.clone()));
        assert_eq!(
            cfg.set_regional_cap(&mallory, &mut caps, region("A"), 10),
            Err(unauthorized.clone())
        );
        assert_eq!(cfg.pause(&mallory), Err(unauthorized.clone()));
        assert_eq!(cfg.unpause(&mallory), Err(unauthorized.clone()));
        assert_eq!(cfg.transfer_admin(&mallory, mallory), Err(unauthorized));

        assert_eq!(cfg, Configuration::new(admin(), 100));
        assert!(caps.is_empty());
    }

    #[test]
    fn tokens_per_beneficiary_must_be_positive() {
        let mut cfg = Configuration::new(admin(), 100);
        assert_eq!(
            cfg.set_tokens_per_beneficiary(&admin(), 0),
            Err(DistributionError::InvalidAmount { amount: 0 })
        );
        cfg.set_tokens_per_beneficiary(&admin(), 250).unwrap();
        assert_eq!(cfg.tokens_per_beneficiary(), 250);
    }

    #[test]
    fn allow_list_add_remove() {
        let mut cfg = Configuration::new(admin(), 100);
        cfg.add_allowed_region(&admin(), region("A")).unwrap();
        cfg.add_allowed_region(&admin(), region("A")).unwrap();
        assert!(cfg.is_region_allowed(&region("A")));
        assert_eq!(cfg.allowed_regions().count(), 1);

        cfg.remove_allowed_region(&admin(), &region("A")).unwrap();
        cfg.remove_allowed_region(&admin(), &region("B")).unwrap();
        assert!(!cfg.is_region_allowed(&region("A")));
    }

    #[test]
    fn pause_toggles() {
        let mut cfg = Configuration::new(admin(), 100);
        cfg.pause(&admin()).unwrap();
        assert!(cfg.is_paused());
        cfg.unpause(&admin()).unwrap();
        assert!(!cfg.is_paused());
    }

    #[test]
    fn admin_transfer_hands_over_control() {
        let mut cfg = Configuration::new(admin(), 100);
        let next = AccountId::derive("next");

        assert_eq!(
            cfg.transfer_admin(&admin(), AccountId::ZERO),
            Err(DistributionError::InvalidRecipient {
                recipient: AccountId::ZERO
            })
        );

        cfg.transfer_admin(&admin(), next).unwrap();
        assert_eq!(cfg.admin(), &next);
        assert!(cfg.pause(&admin()).is_err());
        assert!(cfg.pause(&next).is_ok());
    }
}
