//! Indicator primitives used by the Swing Index engine.
//!
//! Numeric series indicators (ADX, ADXR) implement the [`Indicator`] trait
//! and use `f64::NAN` for warm-up values. The swing index and swing points
//! are `Option` series because an unset value has meaning downstream: a bar
//! whose ASI or swing level is unset is not tradable.

pub mod adx;
pub mod asi;
pub mod atr;
pub mod swing;

use thiserror::Error;

use crate::domain::Bar;

pub use adx::{Adx, Adxr};
pub use asi::{accumulative_swing_index, swing_index, SwingIndexConstants};
pub use atr::{true_range, wilder_smooth, WilderSmoother};
pub use swing::{swing_points, Extremum, SwingTracker};

/// Trait for numeric series indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g. "adxr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    /// The swing index denominator R is zero while K is not.
    #[error("degenerate price range at bar {index}: swing index denominator is zero")]
    DegenerateRange { index: usize },
}

/// Map a NaN-padded series onto `Option`s.
pub fn to_options(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|&v| if v.is_finite() { Some(v) } else { None })
        .collect()
}

/// Build bars from `(open, high, low, close)` tuples for testing.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
