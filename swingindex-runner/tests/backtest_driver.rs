//! Driver integration tests: ledger invariants, rejections, recompute modes.

use chrono::{Duration, NaiveDate};
use swingindex_core::data::{Granularity, SyntheticDataSource};
use swingindex_core::domain::{Bar, Side};
use swingindex_core::engine::{IndicatorError, RecomputeMode, StrategyConstants};
use swingindex_runner::{
    AssetRun, BacktestDriver, Broker, LimitFillBroker, MarginCapitalManager, StepError,
};

fn dated(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    ohlc.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Bar::new(start + Duration::days(i as i64), o, h, l, c))
        .collect()
}

/// Rising sine wave: repeated swing highs and lows on an uptrend.
fn wave_bars(n: usize) -> Vec<Bar> {
    let data: Vec<_> = (0..n)
        .map(|i| {
            let t = i as f64;
            let mid = 100.0 + 10.0 * (t / 5.0).sin() + 0.3 * t;
            (mid - 0.4, mid + 1.5, mid - 1.5, mid + 0.4)
        })
        .collect();
    dated(&data)
}

fn synthetic_bars(seed: u64, symbol: &str) -> Vec<Bar> {
    SyntheticDataSource::new(seed).with_volatility(0.04).generate(
        symbol,
        NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(),
        NaiveDate::from_ymd_opt(2022, 12, 30).unwrap(),
        Granularity::Daily,
    )
}

/// Gates that are always open once ADXR exists.
fn open_gates() -> StrategyConstants {
    StrategyConstants {
        adxr_buy_threshold: -1.0,
        adxr_sell_threshold: -1.0,
        ..Default::default()
    }
}

fn run(constants: StrategyConstants, mode: RecomputeMode, bars: &[Bar]) -> AssetRun {
    BacktestDriver::new(constants, &LimitFillBroker)
        .unwrap()
        .with_mode(mode)
        .run("TEST", bars)
        .unwrap()
}

fn check_ledger_invariants(run: &AssetRun, bars: &[Bar]) {
    let entries = run.ledger.entries();
    if entries.is_empty() {
        assert_eq!(run.open_position.side, Side::Initial);
        return;
    }
    assert_eq!(entries[0].side, Side::Initial);
    assert_eq!(entries[0].entry_index, 0);

    for leg in entries {
        assert!(leg.exit_index >= leg.entry_index);
        assert!(leg.exit_index >= 2 && leg.exit_index < bars.len());
        assert_eq!(leg.exit_date, bars[leg.exit_index].date);
    }
    for pair in entries.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert_ne!(next.side, Side::Initial);
        assert_ne!(next.side, prev.side);
        assert_eq!(next.entry_index, prev.exit_index);
        assert!(next.entry_price <= bars[next.entry_index].high);
        if prev.side != Side::Initial {
            assert_eq!(next.entry_price, prev.exit_price);
        }
    }

    let last = &entries[entries.len() - 1];
    assert_eq!(run.open_position.entry_index, last.exit_index);
    assert_ne!(run.open_position.side, last.side);
    assert_ne!(run.open_position.side, Side::Initial);
}

#[test]
fn wave_with_open_gates_trades() {
    let bars = wave_bars(150);
    let result = run(open_gates(), RecomputeMode::Full, &bars);
    assert!(!result.ledger.is_empty());
    assert_eq!(result.bar_count, 150);
    assert!(result.skips.warmup > 0);
    check_ledger_invariants(&result, &bars);
}

#[test]
fn synthetic_ledgers_satisfy_invariants() {
    for (seed, symbol) in [(1, "AAA"), (2, "BBB"), (3, "CCC")] {
        let bars = synthetic_bars(seed, symbol);
        let result = run(StrategyConstants::default(), RecomputeMode::Full, &bars);
        check_ledger_invariants(&result, &bars);
        let result = run(open_gates(), RecomputeMode::Full, &bars);
        check_ledger_invariants(&result, &bars);
    }
}

#[test]
fn ledger_identical_across_recompute_modes() {
    for (constants, bars) in [
        (open_gates(), wave_bars(150)),
        (StrategyConstants::default(), synthetic_bars(7, "KO")),
        (open_gates(), synthetic_bars(8, "PEP")),
    ] {
        let full = run(constants, RecomputeMode::Full, &bars);
        let incremental = run(constants, RecomputeMode::Incremental, &bars);
        assert_eq!(full, incremental);
    }
}

#[test]
fn flat_series_never_trades() {
    let bars = dated(&[(10.0, 10.0, 10.0, 10.0); 30]);
    let result = run(StrategyConstants::default(), RecomputeMode::Full, &bars);
    assert!(result.ledger.is_empty());
    assert_eq!(result.open_position.side, Side::Initial);
    assert_eq!(result.skips.warmup, 28);
}

#[test]
fn series_shorter_than_three_bars_only_opens_initial() {
    let bars = wave_bars(2);
    let result = run(StrategyConstants::default(), RecomputeMode::Full, &bars);
    assert!(result.ledger.is_empty());
    assert_eq!(result.open_position.side, Side::Initial);
    assert_eq!(result.open_position.entry_date, bars[0].date);
}

#[test]
fn empty_series_is_an_error() {
    let err = BacktestDriver::new(StrategyConstants::default(), &LimitFillBroker)
        .unwrap()
        .run("TEST", &[])
        .unwrap_err();
    assert_eq!(err, StepError::EmptySeries);
}

struct RejectAll;

impl Broker for RejectAll {
    fn submit_order(&self, _asset: &str, _trial_price: f64, _realized_bar: &Bar) -> bool {
        false
    }
}

#[test]
fn rejected_orders_leave_position_unchanged() {
    let bars = wave_bars(150);
    let result = BacktestDriver::new(open_gates(), &RejectAll)
        .unwrap()
        .run("TEST", &bars)
        .unwrap();
    assert!(result.ledger.is_empty());
    assert_eq!(result.open_position.side, Side::Initial);
    assert!(result.skips.order_rejected > 0);
}

#[test]
fn capital_rejection_leaves_position_unchanged() {
    let bars = wave_bars(150);
    let result = BacktestDriver::new(open_gates(), &LimitFillBroker)
        .unwrap()
        .with_capital(Box::new(MarginCapitalManager::new(1.0, 0.6, 0.15)))
        .run("TEST", &bars)
        .unwrap();
    assert!(result.ledger.is_empty());
    assert_eq!(result.open_position.side, Side::Initial);
    assert!(result.skips.capital_rejected > 0);
    assert_eq!(result.skips.order_rejected, 0);
}

#[test]
fn ample_capital_does_not_change_the_ledger() {
    let bars = wave_bars(150);
    let unconstrained = run(open_gates(), RecomputeMode::Full, &bars);
    let managed = BacktestDriver::new(open_gates(), &LimitFillBroker)
        .unwrap()
        .with_capital(Box::new(MarginCapitalManager::new(1.0e9, 0.6, 0.15)))
        .run("TEST", &bars)
        .unwrap();
    assert_eq!(unconstrained.ledger, managed.ledger);
    assert_eq!(managed.skips.capital_rejected, 0);
}

#[test]
fn shares_scale_profit_and_loss() {
    let bars = wave_bars(150);
    let one = run(open_gates(), RecomputeMode::Full, &bars);
    let ten = BacktestDriver::new(open_gates(), &LimitFillBroker)
        .unwrap()
        .with_shares(10.0)
        .run("TEST", &bars)
        .unwrap();
    assert_eq!(one.ledger.len(), ten.ledger.len());
    for (a, b) in one.ledger.entries().iter().zip(ten.ledger.entries()) {
        assert_eq!(a.exit_index, b.exit_index);
        assert!((a.profit_loss() * 10.0 - b.profit_loss()).abs() < 1e-9);
    }
}

/// A bar with open == close followed by a flat bar at another price has a
/// zero range denominator when c3 = 1.
fn with_degenerate_pair(at: usize, n: usize) -> Vec<Bar> {
    let mut bars = wave_bars(n);
    let date_a = bars[at - 1].date;
    let date_b = bars[at].date;
    bars[at - 1] = Bar::new(date_a, 100.0, 101.0, 99.0, 100.0);
    bars[at] = Bar::new(date_b, 102.0, 102.0, 102.0, 102.0);
    bars
}

#[test]
fn degenerate_bar_stops_trading_in_both_modes() {
    let constants = StrategyConstants {
        c3: 1.0,
        ..open_gates()
    };
    let at = 90;
    let bars = with_degenerate_pair(at, 150);

    let full = run(constants, RecomputeMode::Full, &bars);
    let incremental = run(constants, RecomputeMode::Incremental, &bars);
    assert_eq!(full, incremental);

    assert_eq!(full.degenerate_index, Some(at));
    assert_eq!(full.skips.degenerate, bars.len() - at);
    assert!(full.ledger.entries().iter().all(|p| p.exit_index < at));
    assert!(full.open_position.entry_index < at);

    let err = swingindex_core::engine::IndicatorEngine::new(constants)
        .unwrap()
        .compute(&bars)
        .unwrap_err();
    assert_eq!(err, IndicatorError::DegenerateRange { index: at });
}
