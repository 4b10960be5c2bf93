use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::player::Member;

/// One buzz-in during an armed window.
///
/// `elapsed` is measured from the moment the buzzer was armed. Two records
/// are equal when both the player id and the elapsed time match.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BuzzRecord {
    pub player: Arc<Member>,
    pub elapsed: Duration,
}

impl BuzzRecord {
    pub fn new(player: Arc<Member>, elapsed: Duration) -> Self {
        Self { player, elapsed }
    }

    /// Elapsed time as shown on a player's device, e.g. `1.2345s`.
    pub fn formatted_elapsed(&self) -> String {
        format!("{:.4}s", self.elapsed.as_secs_f64())
    }
}

impl PartialEq for BuzzRecord {
    fn eq(&self, other: &Self) -> bool {
        self.player.id == other.player.id && self.elapsed == other.elapsed
    }
}

impl Eq for BuzzRecord {}

/// Buzzes for the current armed window, in the order they were processed.
#[derive(Debug, Default)]
pub struct BuzzLedger {
    records: Vec<BuzzRecord>,
}

impl BuzzLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, player: Arc<Member>, elapsed: Duration) -> BuzzRecord {
        let record = BuzzRecord::new(player, elapsed);
        self.records.push(record.clone());
        record
    }

    /// Removes `record` if present. Returns whether anything was removed.
    pub fn clear(&mut self, record: &BuzzRecord) -> bool {
        match self.records.iter().position(|r| r == record) {
            Some(idx) => {
                self.records.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Empties the ledger, handing back the removed records in order.
    pub fn clear_all(&mut self) -> Vec<BuzzRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn first(&self) -> Option<&BuzzRecord> {
        self.records.first()
    }

    pub fn all(&self) -> Vec<BuzzRecord> {
        self.records.clone()
    }

    /// The record `member` made in this window. Matches the exact player
    /// instance, so a record left behind by a kicked or replaced player with
    /// the same id is never attributed to its successor.
    pub fn find_for(&self, member: &Arc<Member>) -> Option<&BuzzRecord> {
        self.records.iter().find(|r| Arc::ptr_eq(&r.player, member))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
