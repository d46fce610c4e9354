//! Append-only distribution log

use serde::{Deserialize, Serialize};
use stipend_types::{AccountId, Amount, LogId, Round, Timestamp};

/// One completed payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionLogEntry {
    pub id: LogId,
    pub beneficiary: AccountId,
    pub amount: Amount,
    pub round: Round,
    pub timestamp: Timestamp,
}

/// Strictly increasing, gap-free log of payouts. The first id is 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionLog {
    /// Last id handed out (0 when empty)
    counter: LogId,
    entries: Vec<DistributionLogEntry>,
}

impl DistributionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        beneficiary: AccountId,
        amount: Amount,
        round: Round,
        timestamp: Timestamp,
    ) -> LogId {
        self.counter += 1;
        let id = self.counter;
        self.entries.push(DistributionLogEntry {
            id,
            beneficiary,
            amount,
            round,
            timestamp,
        });
        id
    }

    pub fn get(&self, id: LogId) -> Option<&DistributionLogEntry> {
        let index = usize::try_from(id.checked_sub(1)?).ok()?;
        self.entries.get(index)
    }

    /// Id of the most recent entry, 0 when the log is empty.
    pub fn last_id(&self) -> LogId {
        self.counter
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DistributionLogEntry> {
        self.entries.iter()
    }

    pub fn total_amount(&self) -> Amount {
        self.entries
            .iter()
            .fold(0, |acc: Amount, e| acc.saturating_add(e.amount))
    }

    /// Entries whose ids are in `from..=to`, clamped to the log.
    pub fn range(&self, from: LogId, to: LogId) -> &[DistributionLogEntry] {
        let start = from.max(1).saturating_sub(1) as usize;
        let end = (to.min(self.counter)) as usize;
        if start >= end {
            return &[];
        }
        &self.entries[start..end]
    }

    /// Log state is valid when ids are exactly 1..=counter in order.
    pub(crate) fn is_consistent(&self) -> bool {
        self.entries.len() as LogId == self.counter
            && self
                .entries
                .iter()
                .enumerate()
                .all(|(i, e)| e.id == i as LogId + 1)
    }
}
