//! Points ledger: a single running balance.

use serde::{Deserialize, Serialize};

/// Points awarded per completion and taken back per undo.
pub const COMPLETION_REWARD: i64 = 10;

/// Balance a new principal starts with.
pub const SEED_POINTS: i64 = 155;

/// Milestones shown on the dashboard, ascending. The last one is the goal.
pub const MILESTONES: [i64; 3] = [50, 100, 500];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointsLedger {
    balance: i64,
}

impl PointsLedger {
    pub fn new(balance: i64) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn credit(&mut self, amount: i64) {
        self.balance += amount;
    }

    pub fn debit(&mut self, amount: i64) {
        self.balance -= amount;
    }

    pub fn milestones_reached(&self) -> Vec<i64> {
        MILESTONES
            .iter()
            .copied()
            .filter(|m| self.balance >= *m)
            .collect()
    }

    pub fn next_milestone(&self) -> Option<i64> {
        MILESTONES.iter().copied().find(|m| self.balance < *m)
    }

    /// Percent of the top milestone, 0..=100.
    pub fn progress_percent(&self) -> u8 {
        let goal = MILESTONES[MILESTONES.len() - 1];
        (self.balance.max(0) * 100 / goal).min(100) as u8
    }
}
