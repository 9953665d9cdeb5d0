//! Property tests for engine and state machine invariants.
//!
//! Uses proptest to verify:
//! 1. Swing points never revert to unset once confirmed
//! 2. ASI increments reproduce the swing index formula
//! 3. Closed legs never have negative holding periods
//! 4. Signals are idempotent for the same window and state
//! 5. Sides change only through side-changing signals

use chrono::NaiveDate;
use proptest::prelude::*;
use swingindex_core::domain::{Bar, OpenPosition, Side, SignalReason};
use swingindex_core::engine::{IndicatorEngine, StrategyConstants};
use swingindex_core::indicators::{swing_index, swing_points, Extremum, SwingIndexConstants};
use swingindex_core::strategy::{PositionStateMachine, StateMachineParams};

// ── Strategies (proptest) ────────────────────────────────────────────

/// (close-to-close return, intrabar range) pairs turned into sane bars.
fn arb_bars(max_len: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((-0.05..0.05_f64, 0.0..0.03_f64, -1.0..1.0_f64), 3..max_len).prop_map(
        |steps| {
            let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
            let mut close = 100.0;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (ret, range, body))| {
                    let open = close;
                    close = (open * (1.0 + ret)).max(1.0);
                    let top = open.max(close);
                    let bottom = open.min(close);
                    let high = top * (1.0 + range * (1.0 + body.abs()) / 2.0);
                    let low = bottom * (1.0 - range / 2.0);
                    Bar::new(base + chrono::Duration::days(i as i64), open, high, low, close)
                })
                .collect()
        },
    )
}

fn arb_series() -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(prop::option::weighted(0.9, -100.0..100.0_f64), 0..80)
}

fn engine(period: usize) -> IndicatorEngine {
    IndicatorEngine::new(StrategyConstants {
        adxr_period: period,
        ..Default::default()
    })
    .unwrap()
}

// ── 1. Swing point stickiness ────────────────────────────────────────

proptest! {
    #[test]
    fn swing_points_never_revert(series in arb_series()) {
        for extremum in [Extremum::Max, Extremum::Min] {
            let out = swing_points(&series, extremum);
            prop_assert_eq!(out.len(), series.len());
            let first = out.iter().position(Option::is_some);
            if let Some(first) = first {
                prop_assert!(out[first..].iter().all(Option::is_some));
            }
        }
    }

    #[test]
    fn swing_level_is_an_input_value(series in arb_series()) {
        let out = swing_points(&series, Extremum::Max);
        for (i, level) in out.iter().enumerate() {
            if let Some(level) = level {
                prop_assert!(series[..i].iter().any(|x| *x == Some(*level)));
            }
        }
    }
}

// ── 2. ASI increments ────────────────────────────────────────────────

proptest! {
    #[test]
    fn asi_steps_reproduce_swing_index(bars in arb_bars(60)) {
        let enriched = engine(3).compute(&bars).unwrap();
        let c = SwingIndexConstants::default();
        prop_assert_eq!(enriched[0].asi, None);
        let mut acc = 0.0;
        for i in 1..bars.len() {
            let si = swing_index(&bars[i - 1], &bars[i], &c).unwrap();
            acc += si;
            prop_assert_eq!(enriched[i].asi, Some(acc));
        }
    }

    #[test]
    fn enriched_bars_ready_only_after_warmup(bars in arb_bars(60)) {
        let enriched = engine(3).compute(&bars).unwrap();
        let warmup = 3 * 3 - 2;
        for e in enriched.iter().take(warmup) {
            prop_assert!(!e.is_ready());
            prop_assert!(!e.adxr_buy_gate && !e.adxr_sell_gate);
        }
    }
}

// ── 3. Holding period ────────────────────────────────────────────────

proptest! {
    #[test]
    fn time_held_never_negative(entry in 0usize..500, hold in 0usize..500, price in 1.0..500.0_f64) {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let open = OpenPosition::open("KO", Side::Long, price, entry, d, 1.0);
        let closed = open.close(price, entry + hold, d, SignalReason::Sar).unwrap();
        prop_assert_eq!(closed.time_held(), hold);
    }

    #[test]
    fn exit_before_entry_rejected(entry in 1usize..500, back in 1usize..500) {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let open = OpenPosition::open("KO", Side::Short, 10.0, entry, d, 1.0);
        prop_assert!(open.close(10.0, entry.saturating_sub(back), d, SignalReason::Sar).is_err());
    }
}

// ── 4-5. Signals ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn signal_is_idempotent(bars in arb_bars(80), side_pick in 0usize..3, entry in 0usize..20) {
        let enriched = engine(3).compute(&bars).unwrap();
        let side = [Side::Initial, Side::Long, Side::Short][side_pick];
        let sm = PositionStateMachine::new(side, 100.0, entry, StateMachineParams::default());
        for i in 0..enriched.len() {
            let window = &enriched[..=i];
            prop_assert_eq!(sm.signal(window), sm.signal(window));
        }
    }

    #[test]
    fn sides_change_only_on_differing_signals(bars in arb_bars(120)) {
        let enriched = engine(3).compute(&bars).unwrap();
        let mut sm = PositionStateMachine::initial(StateMachineParams::default());
        for i in 2..enriched.len() {
            let window = &enriched[..=i];
            if !window[i].is_ready() {
                continue;
            }
            let signal = sm.signal(window);
            match sm.transition(&signal, i) {
                Some(next) => {
                    prop_assert!(!signal.is_none());
                    prop_assert_ne!(next.side(), sm.side());
                    prop_assert_ne!(next.side(), Side::Initial);
                    prop_assert_eq!(next.entry_index(), i);
                    sm = next;
                }
                None => {
                    prop_assert!(signal.is_none() || signal.direction.target_side() == Some(sm.side()));
                }
            }
        }
    }
}
