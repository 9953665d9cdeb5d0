//! Append-only record of closed legs for one asset.

use serde::{Deserialize, Serialize};

use swingindex_core::domain::{ClosedPosition, Side};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeLedger {
    entries: Vec<ClosedPosition>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, position: ClosedPosition) {
        self.entries.push(position);
    }

    pub fn entries(&self) -> &[ClosedPosition] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Legs that took a side. The flat opening leg is excluded.
    pub fn trades(&self) -> impl Iterator<Item = &ClosedPosition> {
        self.entries.iter().filter(|p| p.side != Side::Initial)
    }

    pub fn total_profit_loss(&self) -> f64 {
        self.trades().map(ClosedPosition::profit_loss).sum()
    }
}
