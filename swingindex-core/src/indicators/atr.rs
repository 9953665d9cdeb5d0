//! True range and Wilder smoothing.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! Wilder smoothing is an EMA with alpha = 1/period, seeded with the mean of
//! the first `period` consecutive valid values.

use crate::domain::Bar;

/// Compute the True Range series from bars.
///
/// TR[0] is NaN: the first bar has no previous close, so every smoothed
/// series built on TR seeds from index 1.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        tr[i] = true_range_step(&bars[i - 1], &bars[i]);
    }
    tr
}

/// True range of `bar` given the bar before it.
pub fn true_range_step(prev: &Bar, bar: &Bar) -> f64 {
    let (h, l, pc) = (bar.high, bar.low, prev.close);
    if h.is_nan() || l.is_nan() || pc.is_nan() {
        return f64::NAN;
    }
    (h - l).max((h - pc).abs()).max((l - pc).abs())
}

/// Apply Wilder smoothing to a series. Alpha = 1/period.
///
/// The seed is the mean of the first `period` consecutive non-NaN values and
/// lands on the last of them. A NaN after the seed invalidates the rest of
/// the series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let mut smoother = WilderSmoother::new(period);
    values.iter().map(|&v| smoother.push(v)).collect()
}

/// Streaming form of [`wilder_smooth`].
///
/// Pushing `values[0..=i]` one at a time returns exactly
/// `wilder_smooth(values, period)[i]` at each step.
#[derive(Debug, Clone)]
pub struct WilderSmoother {
    period: usize,
    seed_window: Vec<f64>,
    prev: Option<f64>,
    dead: bool,
}

impl WilderSmoother {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            seed_window: Vec::with_capacity(period),
            prev: None,
            dead: period == 0,
        }
    }

    pub fn push(&mut self, value: f64) -> f64 {
        if self.dead {
            return f64::NAN;
        }
        match self.prev {
            Some(prev) => {
                if value.is_nan() {
                    self.dead = true;
                    return f64::NAN;
                }
                let alpha = 1.0 / self.period as f64;
                let smoothed = alpha * value + (1.0 - alpha) * prev;
                self.prev = Some(smoothed);
                smoothed
            }
            None => {
                if value.is_nan() {
                    self.seed_window.clear();
                    return f64::NAN;
                }
                self.seed_window.push(value);
                if self.seed_window.len() < self.period {
                    return f64::NAN;
                }
                let seed = self.seed_window.iter().sum::<f64>() / self.period as f64;
                self.seed_window.clear();
                self.prev = Some(seed);
                seed
            }
        }
    }

    pub fn current(&self) -> Option<f64> {
        if self.dead {
            None
        } else {
            self.prev
        }
    }
}
