//! Round management
//!
//! Rounds start at 1 and move forward by exactly one per successful
//! advance. An advance requires an [`AdminToken`] and strictly more than
//! the minimum interval since the previous advance (or since genesis).

use crate::caps::CapLedger;
use crate::errors::{DistributionError, Result};
use crate::governance::AdminToken;
use serde::{Deserialize, Serialize};
use stipend_types::{Round, Timestamp, GENESIS_ROUND};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundController {
    current: Round,
    last_advance: Timestamp,
}

impl RoundController {
    /// Start at the genesis round with `now` as the last advance marker.
    pub fn new(now: Timestamp) -> Self {
        Self {
            current: GENESIS_ROUND,
            last_advance: now,
        }
    }

    pub fn current(&self) -> Round {
        self.current
    }

    pub fn last_advance(&self) -> Timestamp {
        self.last_advance
    }

    /// Earliest timestamp at which `advance` will succeed.
    pub fn next_eligible_at(&self, min_interval: Timestamp) -> Timestamp {
        self.last_advance
            .saturating_add(min_interval)
            .saturating_add(1)
    }

    /// Move to the next round and clear every region's usage.
    pub fn advance(
        &mut self,
        _admin: &AdminToken,
        now: Timestamp,
        min_interval: Timestamp,
        caps: &mut CapLedger,
    ) -> Result<Round> {
        let elapsed = now.checked_sub(self.last_advance).ok_or_else(|| {
            DistributionError::invalid_parameter(
                "now",
                format!("clock {} is behind last round advance {}", now, self.last_advance),
            )
        })?;

        if elapsed <= min_interval {
            return Err(DistributionError::invalid_parameter(
                "round_interval",
                format!("{} elapsed, more than {} required", elapsed, min_interval),
            ));
        }

        let next = self.current.checked_add(1).ok_or_else(|| {
            DistributionError::invalid_parameter("round", "round counter exhausted")
        })?;

        self.current = next;
        self.last_advance = now;
        caps.reset_all();

        info!(
            target: "round",
            round = next,
            at = now,
            "Round {} started",
            next
        );

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::Configuration;
    use stipend_types::{AccountId, RegionCode};

    const INTERVAL: Timestamp = 100;

    fn token() -> AdminToken {
        let admin = AccountId::derive("admin");
        Configuration::new(admin, 1).authorize(&admin).unwrap()
    }

    #[test]
    fn starts_at_genesis_round() {
        let rounds = RoundController::new(50);
        assert_eq!(rounds.current(), 1);
        assert_eq!(rounds.last_advance(), 50);
        assert_eq!(rounds.next_eligible_at(INTERVAL), 151);
    }

    #[test]
    fn interval_must_be_strictly_exceeded() {
        let mut rounds = RoundController::new(0);
        let mut caps = CapLedger::new();

        let err = rounds.advance(&token(), INTERVAL, INTERVAL, &mut caps).unwrap_err();
        assert!(matches!(err, DistributionError::InvalidParameter { .. }));
        assert_eq!(rounds.current(), 1);

        assert_eq!(rounds.advance(&token(), INTERVAL + 1, INTERVAL, &mut caps), Ok(2));
        assert_eq!(rounds.last_advance(), INTERVAL + 1);

        // The interval restarts from the last advance
        assert!(rounds.advance(&token(), 2 * INTERVAL, INTERVAL, &mut caps).is_err());
        assert_eq!(rounds.advance(&token(), 2 * INTERVAL + 2, INTERVAL, &mut caps), Ok(3));
    }

    #[test]
    fn clock_going_backwards_is_rejected() {
        let mut rounds = RoundController::new(1_000);
        let mut caps = CapLedger::new();
        let err = rounds.advance(&token(), 10, INTERVAL, &mut caps).unwrap_err();
        assert!(matches!(err, DistributionError::InvalidParameter { .. }));
    }

    #[test]
    fn advance_resets_usage() {
        let mut rounds = RoundController::new(0);
        let mut caps = CapLedger::new();
        let region = RegionCode::new("A").unwrap();
        caps.set_cap(region.clone(), 600);
        caps.reserve(&region, 599).unwrap();

        rounds.advance(&token(), INTERVAL + 1, INTERVAL, &mut caps).unwrap();
        assert_eq!(caps.get(&region).unwrap().used, 0);
        assert_eq!(caps.get(&region).unwrap().cap, 600);
    }
}
