//! Swing Index (SI) and Accumulative Swing Index (ASI), after Wilder.
//!
//! For bar i with previous bar p:
//!
//! ```text
//! l1 = |high - p.close|, l2 = |low - p.close|, l3 = |high - low|
//! R  = l1 - c3*l2 + c4*|p.close - p.open|   when l1 is the largest
//!      l2 - c3*l1 + c4*|p.close - p.open|   when l2 is the largest
//!      l3 + c5*|p.close - p.open|           otherwise
//! K  = max(l1, l2) / c6
//! SI = (c7 / R) * [(close - p.close) + c1*(close - open) + c2*(p.close - p.open)] * K
//! ```
//!
//! Ties pick l1 over l2 over l3. ASI is the running sum of SI with a zero
//! baseline; bar 0 has no previous bar and reports no ASI.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::IndicatorError;

/// The seven swing-index coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingIndexConstants {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub c4: f64,
    pub c5: f64,
    /// Limit move.
    pub c6: f64,
    /// Multiplier.
    pub c7: f64,
}

impl Default for SwingIndexConstants {
    fn default() -> Self {
        Self {
            c1: 0.5,
            c2: 0.25,
            c3: 0.5,
            c4: 0.25,
            c5: 0.25,
            c6: 3.0,
            c7: 50.0,
        }
    }
}

/// Which of the three ranges dominated the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBranch {
    HighToClose,
    LowToClose,
    HighToLow,
}

/// Select the dominant range, l1 before l2 before l3 on ties.
pub fn range_branch(l1: f64, l2: f64, l3: f64) -> RangeBranch {
    if l1 >= l2 && l1 >= l3 {
        RangeBranch::HighToClose
    } else if l2 >= l3 {
        RangeBranch::LowToClose
    } else {
        RangeBranch::HighToLow
    }
}

/// Swing index of `bar` given the previous bar.
///
/// Returns `None` when R is zero and K is not (the value would be infinite).
/// When K is zero the swing index is exactly zero.
pub fn swing_index(prev: &Bar, bar: &Bar, c: &SwingIndexConstants) -> Option<f64> {
    let l1 = (bar.high - prev.close).abs();
    let l2 = (bar.low - prev.close).abs();
    let l3 = (bar.high - bar.low).abs();
    let prev_body = (prev.close - prev.open).abs();

    let r = match range_branch(l1, l2, l3) {
        RangeBranch::HighToClose => l1 - c.c3 * l2 + c.c4 * prev_body,
        RangeBranch::LowToClose => l2 - c.c3 * l1 + c.c4 * prev_body,
        RangeBranch::HighToLow => l3 + c.c5 * prev_body,
    };
    let k = l1.max(l2) / c.c6;

    if k == 0.0 {
        return Some(0.0);
    }
    if r == 0.0 {
        return None;
    }
    let move_term = (bar.close - prev.close)
        + c.c1 * (bar.close - bar.open)
        + c.c2 * (prev.close - prev.open);
    Some((c.c7 / r) * move_term * k)
}

/// ASI for every bar. `result[0]` is `None`.
pub fn accumulative_swing_index(
    bars: &[Bar],
    c: &SwingIndexConstants,
) -> Result<Vec<Option<f64>>, IndicatorError> {
    let mut asi = Vec::with_capacity(bars.len());
    let mut acc = 0.0;
    for (index, bar) in bars.iter().enumerate() {
        if index == 0 {
            asi.push(None);
            continue;
        }
        let si = swing_index(&bars[index - 1], bar, c)
            .ok_or(IndicatorError::DegenerateRange { index })?;
        acc += si;
        asi.push(Some(acc));
    }
    Ok(asi)
}
