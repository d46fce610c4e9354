//! Per-region quota accounting
//!
//! A region with no entry, or with `cap == 0`, is unbounded. For a bounded
//! region `used <= cap` holds after every committed reservation; `used`
//! only grows within a round and returns to zero when the round advances.

use crate::errors::{DistributionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stipend_types::{Amount, RegionCode};
use tracing::debug;

/// Quota state for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegionalCap {
    /// Maximum amount distributable this round (0 = unbounded)
    pub cap: Amount,
    /// Amount distributed so far this round
    pub used: Amount,
    /// Bumped whenever `used` is reset, so a stale reservation is never released
    #[serde(default)]
    pub generation: u64,
}

impl RegionalCap {
    pub fn is_bounded(&self) -> bool {
        self.cap > 0
    }

    /// Headroom left this round, `None` when unbounded.
    pub fn remaining(&self) -> Option<Amount> {
        self.is_bounded().then(|| self.cap.saturating_sub(self.used))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapLedger {
    caps: BTreeMap<RegionCode, RegionalCap>,
}

impl CapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, region: &RegionCode) -> Option<RegionalCap> {
        self.caps.get(region).copied()
    }

    /// Overwrite a region's cap and clear its usage.
    pub fn set_cap(&mut self, region: RegionCode, cap: Amount) {
        let generation = self
            .caps
            .get(&region)
            .map_or(0, |old| old.generation.wrapping_add(1));
        self.caps.insert(
            region,
            RegionalCap {
                cap,
                used: 0,
                generation,
            },
        );
    }

    /// Reserve `amount` of quota in `region`.
    ///
    /// Regions without an entry are not tracked. Unbounded entries still
    /// accumulate `used` so operators can read the round's volume.
    ///
    /// Returns the generation of the charged entry, or `None` when nothing
    /// was charged.
    pub fn reserve(&mut self, region: &RegionCode, amount: Amount) -> Result<Option<u64>> {
        let Some(entry) = self.caps.get_mut(region) else {
            return Ok(None);
        };

        let next = entry.used.checked_add(amount).ok_or_else(|| {
            DistributionError::invalid_parameter("amount", "regional usage overflow")
        })?;

        if entry.is_bounded() && next > entry.cap {
            debug!(
                target: "distribution",
                region = %region,
                cap = entry.cap,
                used = entry.used,
                requested = amount,
                "Regional cap would be exceeded"
            );
            return Err(DistributionError::CapExceeded {
                region: region.clone(),
                cap: entry.cap,
                used: entry.used,
                requested: amount,
            });
        }

        entry.used = next;
        Ok(Some(entry.generation))
    }

    /// Undo a reservation whose payout did not happen.
    ///
    /// Ignored when the entry was reset or overwritten since the
    /// reservation was taken: its `used` no longer contains `amount`.
    pub fn release(&mut self, region: &RegionCode, amount: Amount, generation: u64) {
        match self.caps.get_mut(region) {
            Some(entry) if entry.generation == generation => {
                entry.used = entry.used.saturating_sub(amount);
            }
            _ => {
                debug!(
                    target: "distribution",
                    region = %region,
                    amount,
                    "Stale reservation not released"
                );
            }
        }
    }

    /// Clear usage in every region. Caps are kept.
    pub fn reset_all(&mut self) {
        for entry in self.caps.values_mut() {
            entry.used = 0;
            entry.generation = entry.generation.wrapping_add(1);
        }
    }

    pub fn len(&self) -> usize {
        self.caps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }

    pub fn bounded_regions(&self) -> usize {
        self.caps.values().filter(|c| c.is_bounded()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionCode, &RegionalCap)> {
        self.caps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(code: &str) -> RegionCode {
        RegionCode::new(code).unwrap()
    }

    #[test]
    fn untracked_region_is_unbounded() {
        let mut caps = CapLedger::new();
        assert_eq!(caps.reserve(&region("A"), 1_000_000), Ok(None));
        assert!(caps.get(&region("A")).is_none());
        assert!(caps.is_empty());
    }

    #[test]
    fn zero_cap_never_blocks() {
        let mut caps = CapLedger::new();
        caps.set_cap(region("A"), 0);
        caps.reserve(&region("A"), 500).unwrap();
        caps.reserve(&region("A"), 500).unwrap();
        let entry = caps.get(&region("A")).unwrap();
        assert_eq!(entry.used, 1_000);
        assert_eq!(entry.remaining(), None);
    }

    #[test]
    fn bounded_region_rejects_overflow_without_mutation() {
        let mut caps = CapLedger::new();
        caps.set_cap(region("A"), 600);
        caps.reserve(&region("A"), 500).unwrap();

        let err = caps.reserve(&region("A"), 200).unwrap_err();
        assert_eq!(
            err,
            DistributionError::CapExceeded {
                region: region("A"),
                cap: 600,
                used: 500,
                requested: 200,
            }
        );
        assert_eq!(caps.get(&region("A")).unwrap().used, 500);

        // Exactly reaching the cap is allowed
        caps.reserve(&region("A"), 100).unwrap();
        assert_eq!(caps.get(&region("A")).unwrap().remaining(), Some(0));
    }

    #[test]
    fn release_and_reset() {
        let mut caps = CapLedger::new();
        caps.set_cap(region("A"), 600);
        caps.set_cap(region("B"), 0);
        let gen_a = caps.reserve(&region("A"), 400).unwrap().unwrap();
        caps.reserve(&region("B"), 50).unwrap();

        caps.release(&region("A"), 100, gen_a);
        assert_eq!(caps.get(&region("A")).unwrap().used, 300);

        caps.release(&region("A"), 10_000, gen_a);
        assert_eq!(caps.get(&region("A")).unwrap().used, 0);

        caps.reserve(&region("A"), 250).unwrap();
        caps.reset_all();
        let a = caps.get(&region("A")).unwrap();
        assert_eq!((a.cap, a.used), (600, 0));
        let b = caps.get(&region("B")).unwrap();
        assert_eq!((b.cap, b.used), (0, 0));
        assert_eq!(caps.bounded_regions(), 1);
    }

    #[test]
    fn set_cap_overwrites_usage() {
        let mut caps = CapLedger::new();
        caps.set_cap(region("A"), 600);
        caps.reserve(&region("A"), 600).unwrap();
        caps.set_cap(region("A"), 300);
        let entry = caps.get(&region("A")).unwrap();
        assert_eq!((entry.cap, entry.used), (300, 0));
    }

    #[test]
    fn stale_reservation_is_not_released() {
        let mut caps = CapLedger::new();
        caps.set_cap(region("A"), 600);
        let stale = caps.reserve(&region("A"), 500).unwrap().unwrap();

        // Overwrite, then spend the fresh quota
        caps.set_cap(region("A"), 600);
        let fresh = caps.reserve(&region("A"), 600).unwrap().unwrap();
        assert_ne!(stale, fresh);

        caps.release(&region("A"), 500, stale);
        assert_eq!(caps.get(&region("A")).unwrap().used, 600);
        assert!(caps.reserve(&region("A"), 1).is_err());

        // Same after a round reset
        caps.reset_all();
        caps.reserve(&region("A"), 200).unwrap();
        caps.release(&region("A"), 600, fresh);
        assert_eq!(caps.get(&region("A")).unwrap().used, 200);
    }
}
