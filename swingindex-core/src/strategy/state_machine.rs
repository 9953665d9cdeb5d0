//! Position state machine: one leg's state, and the rule set that decides
//! when that leg should give way to the next.
//!
//! A state machine is never mutated. When the driver acts on a side-changing
//! signal it asks [`PositionStateMachine::transition`] for the next leg and
//! drops the old one.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, Side, Signal, SignalReason};
use crate::engine::{EnrichedBar, StrategyConstants};
use crate::strategy::sar;

/// Tunables the state machine reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateMachineParams {
    /// ASI retracement from the trade's extreme swing point that arms the
    /// trailing stop.
    pub trailing_sar_threshold: f64,
}

impl Default for StateMachineParams {
    fn default() -> Self {
        Self {
            trailing_sar_threshold: 60.0,
        }
    }
}

impl From<&StrategyConstants> for StateMachineParams {
    fn from(c: &StrategyConstants) -> Self {
        Self {
            trailing_sar_threshold: c.trailing_sar_threshold,
        }
    }
}

/// Minimum bars from the entry index onward before any rule is evaluated.
const MIN_BARS_SINCE_ENTRY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionStateMachine {
    side: Side,
    entry_price: f64,
    entry_index: usize,
    params: StateMachineParams,
}

impl PositionStateMachine {
    /// The flat starting state.
    pub fn initial(params: StateMachineParams) -> Self {
        Self {
            side: Side::Initial,
            entry_price: 0.0,
            entry_index: 0,
            params,
        }
    }

    pub fn new(side: Side, entry_price: f64, entry_index: usize, params: StateMachineParams) -> Self {
        Self {
            side,
            entry_price,
            entry_index,
            params,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn entry_index(&self) -> usize {
        self.entry_index
    }

    pub fn params(&self) -> &StateMachineParams {
        &self.params
    }

    /// Evaluate today's signal. `window` is the enriched visible prefix; its
    /// last bar is today. Only today's high and low are read from it.
    pub fn signal(&self, window: &[EnrichedBar]) -> Signal {
        if window.len().saturating_sub(self.entry_index) < MIN_BARS_SINCE_ENTRY {
            return Signal::none();
        }
        let (today, closed) = match window.split_last() {
            Some(split) => split,
            None => return Signal::none(),
        };
        match self.side {
            Side::Initial => self.initial_signal(today, closed),
            Side::Long | Side::Short => self.holding_signal(today, closed),
        }
    }

    fn initial_signal(&self, today: &EnrichedBar, closed: &[EnrichedBar]) -> Signal {
        let long = sar::entry_long(closed, self.entry_index);
        let short = sar::entry_short(closed, self.entry_index);

        if let Some(trigger) = long {
            if today.bar.high >= trigger {
                return Signal::new(Direction::Long, trigger, SignalReason::EntryLong);
            }
        }
        if let Some(trigger) = short {
            if today.bar.low <= trigger {
                return Signal::new(Direction::Short, trigger, SignalReason::EntryShort);
            }
        }
        Signal::none()
    }

    fn holding_signal(&self, today: &EnrichedBar, closed: &[EnrichedBar]) -> Signal {
        let last = match closed.last() {
            Some(last) => last,
            None => return Signal::none(),
        };
        let reverse = Direction::reversing(self.side);

        if last.adxr_sell_gate {
            return Signal::new(reverse, last.bar.close, SignalReason::ForcedExit);
        }
        if !last.adxr_buy_gate {
            return Signal::none();
        }

        let threshold = self.params.trailing_sar_threshold;
        let (trailing, sar) = match self.side {
            Side::Long => (
                sar::trailing_sar_long(closed, self.entry_index, threshold),
                sar::sar_long(closed, self.entry_index),
            ),
            Side::Short => (
                sar::trailing_sar_short(closed, self.entry_index, threshold),
                sar::sar_short(closed, self.entry_index),
            ),
            Side::Initial => return Signal::none(),
        };
        let breached = |level: f64| match self.side {
            Side::Long => today.bar.low <= level,
            Side::Short => today.bar.high >= level,
            Side::Initial => false,
        };

        if let Some(t) = trailing {
            if breached(t) {
                return Signal::new(reverse, t, SignalReason::TrailingSar);
            }
        }
        if let Some(s) = sar {
            if breached(s) {
                return Signal::new(reverse, s, SignalReason::Sar);
            }
        }
        Signal::none()
    }

    /// The next leg's state, when `signal` moves the position off its side.
    pub fn transition(&self, signal: &Signal, index: usize) -> Option<PositionStateMachine> {
        if !signal.changes_side(self.side) {
            return None;
        }
        let side = signal.direction.target_side()?;
        Some(Self {
            side,
            entry_price: signal.trigger_price,
            entry_index: index,
            params: self.params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    fn flat(n: usize) -> Vec<EnrichedBar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        (0..n)
            .map(|i| EnrichedBar {
                bar: Bar::new(base + chrono::Duration::days(i as i64), 10.0, 11.0, 9.0, 10.0),
                asi: Some(0.0),
                hsp: Some(0.0),
                hip: Some(11.0),
                lsp: Some(0.0),
                lop: Some(9.0),
                adxr: Some(25.0),
                adxr_buy_gate: true,
                adxr_sell_gate: false,
            })
            .collect()
    }

    #[test]
    fn too_few_bars_since_entry() {
        let sm = PositionStateMachine::new(Side::Long, 10.0, 3, StateMachineParams::default());
        let mut window = flat(5);
        window[3].adxr_sell_gate = true;
        assert!(sm.signal(&window).is_none());
        assert!(sm.signal(&window[..2]).is_none());
    }

    #[test]
    fn forced_exit_overrides_everything() {
        let sm = PositionStateMachine::new(Side::Long, 10.0, 0, StateMachineParams::default());
        let mut window = flat(4);
        window[2].adxr_sell_gate = true;
        window[2].adxr_buy_gate = false;
        window[2].bar.close = 10.5;
        let s = sm.signal(&window);
        assert_eq!(s.as_tuple(), (-1, 10.5));
        assert_eq!(s.reason, SignalReason::ForcedExit);
    }

    #[test]
    fn forced_exit_from_short_reverses_long() {
        let sm = PositionStateMachine::new(Side::Short, 10.0, 0, StateMachineParams::default());
        let mut window = flat(4);
        window[2].adxr_sell_gate = true;
        assert_eq!(sm.signal(&window).as_tuple(), (1, 10.0));
    }

    #[test]
    fn closed_buy_gate_holds() {
        let sm = PositionStateMachine::new(Side::Long, 10.0, 0, StateMachineParams::default());
        let mut window = flat(4);
        window[2].adxr_buy_gate = false;
        window[3].bar.low = 1.0;
        assert!(sm.signal(&window).is_none());
    }

    #[test]
    fn long_sar_breach_reverses() {
        let sm = PositionStateMachine::new(Side::Long, 10.0, 0, StateMachineParams::default());
        let mut window = flat(4);
        // No swing updates: SAR is the latest price low (9.0)
        window[3].bar.low = 8.5;
        let s = sm.signal(&window);
        assert_eq!(s.as_tuple(), (-1, 9.0));
        assert_eq!(s.reason, SignalReason::Sar);
    }

    #[test]
    fn short_sar_breach_reverses() {
        let sm = PositionStateMachine::new(Side::Short, 10.0, 0, StateMachineParams::default());
        let mut window = flat(4);
        window[3].bar.high = 11.5;
        assert_eq!(sm.signal(&window).as_tuple(), (1, 11.0));
    }

    #[test]
    fn trailing_sar_takes_precedence_over_sar() {
        let sm = PositionStateMachine::new(Side::Long, 10.0, 0, StateMachineParams::default());
        let mut window = flat(5);
        for bar in &mut window {
            bar.hsp = Some(100.0);
            bar.asi = Some(50.0);
        }
        // 100 - 30 > 60 arms the trailing stop at bar 2's low
        window[2].asi = Some(30.0);
        window[2].bar.low = 9.5;
        window[4].bar.low = 8.0;
        let s = sm.signal(&window);
        assert_eq!(s.as_tuple(), (-1, 9.5));
        assert_eq!(s.reason, SignalReason::TrailingSar);
    }

    #[test]
    fn initial_holds_without_gate() {
        let sm = PositionStateMachine::initial(StateMachineParams::default());
        let mut window = flat(4);
        window[2].adxr_buy_gate = false;
        window[3].bar.high = 50.0;
        assert!(sm.signal(&window).is_none());
    }

    #[test]
    fn initial_long_precedes_short() {
        let sm = PositionStateMachine::initial(StateMachineParams::default());
        let mut window = flat(4);
        window[1].hsp = Some(2.0);
        window[1].hip = Some(10.8);
        window[1].lsp = Some(8.0);
        window[2].asi = Some(5.0);
        window[2].hsp = Some(2.0);
        window[2].lsp = Some(8.0);
        // ASI 5 is above the swing high 2 and below the latest swing low 8
        window[3].bar.high = 12.0;
        window[3].bar.low = 8.0;
        let s = sm.signal(&window);
        assert_eq!(s.as_tuple(), (1, 10.8));
        assert_eq!(s.reason, SignalReason::EntryLong);
    }

    #[test]
    fn transition_only_on_side_change() {
        let sm = PositionStateMachine::initial(StateMachineParams::default());
        assert_eq!(sm.transition(&Signal::none(), 5), None);

        let buy = Signal::new(Direction::Long, 12.0, SignalReason::EntryLong);
        let long = sm.transition(&buy, 5).unwrap();
        assert_eq!(long.side(), Side::Long);
        assert_eq!(long.entry_price(), 12.0);
        assert_eq!(long.entry_index(), 5);
        assert_eq!(long.transition(&buy, 6), None);

        let sell = Signal::new(Direction::Short, 11.0, SignalReason::Sar);
        let short = long.transition(&sell, 7).unwrap();
        assert_eq!(short.side(), Side::Short);
        assert_eq!(sm.side(), Side::Initial);
    }

    #[test]
    fn signal_is_idempotent() {
        let sm = PositionStateMachine::new(Side::Long, 10.0, 0, StateMachineParams::default());
        let mut window = flat(6);
        window[5].bar.low = 8.0;
        assert_eq!(sm.signal(&window), sm.signal(&window));
    }
}
