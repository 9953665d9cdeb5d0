//! Signal: what the position state machine asks the driver to do today.

use serde::{Deserialize, Serialize};

use super::side::Side;

/// Signal direction: -1 (sell / go short), 0 (hold), +1 (buy / go long).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Short,
    Neutral,
    Long,
}

impl Direction {
    pub fn value(self) -> i8 {
        match self {
            Direction::Short => -1,
            Direction::Neutral => 0,
            Direction::Long => 1,
        }
    }

    /// The side a position ends up on after acting on this direction.
    pub fn target_side(self) -> Option<Side> {
        match self {
            Direction::Short => Some(Side::Short),
            Direction::Neutral => None,
            Direction::Long => Some(Side::Long),
        }
    }

    /// Direction that moves a position off `side` (Long -> Short, Short -> Long).
    pub fn reversing(side: Side) -> Direction {
        match side {
            Side::Long => Direction::Short,
            Side::Short => Direction::Long,
            Side::Initial => Direction::Neutral,
        }
    }
}

/// Which rule produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalReason {
    None,
    EntryLong,
    EntryShort,
    /// ADXR sell gate opened: leave at the last close.
    ForcedExit,
    TrailingSar,
    Sar,
}

impl SignalReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalReason::None => "none",
            SignalReason::EntryLong => "entry_long",
            SignalReason::EntryShort => "entry_short",
            SignalReason::ForcedExit => "forced_exit",
            SignalReason::TrailingSar => "trailing_sar",
            SignalReason::Sar => "sar",
        }
    }
}

/// A directional signal with its trigger price.
///
/// `Signal::none()` is the `(0, 0)` no-op.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    pub trigger_price: f64,
    pub reason: SignalReason,
}

impl Signal {
    pub fn none() -> Self {
        Self {
            direction: Direction::Neutral,
            trigger_price: 0.0,
            reason: SignalReason::None,
        }
    }

    pub fn new(direction: Direction, trigger_price: f64, reason: SignalReason) -> Self {
        Self {
            direction,
            trigger_price,
            reason,
        }
    }

    pub fn is_none(&self) -> bool {
        self.direction == Direction::Neutral
    }

    /// `(direction, trigger_price)` in the -1/0/+1 convention.
    pub fn as_tuple(&self) -> (i8, f64) {
        (self.direction.value(), self.trigger_price)
    }

    /// True when acting on this signal would move a position off `side`.
    pub fn changes_side(&self, side: Side) -> bool {
        match self.direction.target_side() {
            Some(target) => target != side,
            None => false,
        }
    }
}
