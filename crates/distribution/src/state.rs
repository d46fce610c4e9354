//! Ledger state container
//!
//! Everything the engine mutates lives in one [`LedgerState`]: admin
//! configuration, the round controller, quotas, distribution records and
//! the log. It serializes as a single document so a host can persist it in
//! whatever key-value store backs it.

use crate::caps::CapLedger;
use crate::governance::Configuration;
use crate::log::DistributionLog;
use crate::round::RoundController;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use stipend_types::{AccountId, Amount, Round, Timestamp};

/// A payout made to one beneficiary in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    pub amount: Amount,
    pub timestamp: Timestamp,
    /// Set by the redemption subsystem, never by this engine
    pub redeemed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub config: Configuration,
    pub rounds: RoundController,
    pub caps: CapLedger,
    /// round → beneficiary → record
    records: BTreeMap<Round, BTreeMap<AccountId, DistributionRecord>>,
    pub log: DistributionLog,
    /// Keys whose payout passed every check and is waiting on the transfer
    #[serde(skip)]
    in_flight: HashSet<(AccountId, Round)>,
}

impl LedgerState {
    pub fn new(config: Configuration, genesis_time: Timestamp) -> Self {
        Self {
            config,
            rounds: RoundController::new(genesis_time),
            caps: CapLedger::new(),
            records: BTreeMap::new(),
            log: DistributionLog::new(),
            in_flight: HashSet::new(),
        }
    }

    pub fn record(&self, beneficiary: &AccountId, round: Round) -> Option<&DistributionRecord> {
        self.records.get(&round)?.get(beneficiary)
    }

    /// True when the key has a committed record or a payout in flight.
    pub fn is_claimed(&self, beneficiary: &AccountId, round: Round) -> bool {
        self.record(beneficiary, round).is_some() || self.in_flight.contains(&(*beneficiary, round))
    }

    pub(crate) fn mark_in_flight(&mut self, beneficiary: AccountId, round: Round) {
        self.in_flight.insert((beneficiary, round));
    }

    pub(crate) fn clear_in_flight(&mut self, beneficiary: &AccountId, round: Round) {
        self.in_flight.remove(&(*beneficiary, round));
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Store a record. Returns false, leaving the existing record untouched,
    /// when the key is already taken.
    pub(crate) fn insert_record(
        &mut self,
        beneficiary: AccountId,
        round: Round,
        record: DistributionRecord,
    ) -> bool {
        let by_beneficiary = self.records.entry(round).or_default();
        if by_beneficiary.contains_key(&beneficiary) {
            return false;
        }
        by_beneficiary.insert(beneficiary, record);
        true
    }

    pub fn records_in_round(&self, round: Round) -> impl Iterator<Item = (&AccountId, &DistributionRecord)> {
        self.records.get(&round).into_iter().flat_map(|m| m.iter())
    }

    /// All records for a beneficiary, ordered by round.
    pub fn records_for(&self, beneficiary: &AccountId) -> Vec<(Round, DistributionRecord)> {
        self.records
            .iter()
            .filter_map(|(round, m)| m.get(beneficiary).map(|r| (*round, r.clone())))
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.records.values().map(|m| m.len()).sum()
    }

    /// Structural checks a restored snapshot must pass.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.log.is_consistent() {
            return Err("distribution log ids are not contiguous from 1".to_string());
        }
        if self.record_count() != self.log.len() {
            return Err(format!(
                "{} records but {} log entries",
                self.record_count(),
                self.log.len()
            ));
        }
        if let Some(round) = self.records.keys().next_back() {
            if *round > self.rounds.current() {
                return Err(format!(
                    "record for round {} beyond current round {}",
                    round,
                    self.rounds.current()
                ));
            }
        }
        if self.config.tokens_per_beneficiary == 0 {
            return Err("tokens per beneficiary must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> LedgerState {
        LedgerState::new(Configuration::new(AccountId::derive("admin"), 100), 0)
    }

    fn record(amount: Amount) -> DistributionRecord {
        DistributionRecord {
            amount,
            timestamp: 1,
            redeemed: false,
        }
    }

    #[test]
    fn records_are_write_once() {
        let mut s = state();
        let alice = AccountId::derive("alice");
        assert!(s.insert_record(alice, 1, record(500)));
        assert!(!s.insert_record(alice, 1, record(900)));
        assert_eq!(s.record(&alice, 1).unwrap().amount, 500);
        assert!(s.insert_record(alice, 2, record(100)));
        assert_eq!(s.records_for(&alice).len(), 2);
    }

    #[test]
    fn in_flight_counts_as_claimed() {
        let mut s = state();
        let alice = AccountId::derive("alice");
        assert!(!s.is_claimed(&alice, 1));
        s.mark_in_flight(alice, 1);
        assert!(s.is_claimed(&alice, 1));
        assert!(s.record(&alice, 1).is_none());
        s.clear_in_flight(&alice, 1);
        assert!(!s.is_claimed(&alice, 1));
    }

    #[test]
    fn serialized_state_omits_in_flight_keys() {
        let mut s = state();
        let alice = AccountId::derive("alice");
        s.mark_in_flight(alice, 1);
        let json = serde_json::to_string(&s).unwrap();
        let restored: LedgerState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.in_flight_count(), 0);
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn validate_detects_record_log_mismatch() {
        let mut s = state();
        s.insert_record(AccountId::derive("alice"), 1, record(5));
        assert!(s.validate().is_err());
    }
}
