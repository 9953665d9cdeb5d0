//! ADX and ADXR (Wilder).
//!
//! Steps:
//! 1. +DM and -DM from consecutive bars
//! 2. Wilder-smooth +DM, -DM and TR (alpha = 1/period)
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), -DI likewise
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = Wilder-smoothed DX
//! 6. ADXR[t] = (ADX[t] + ADX[t - (period - 1)]) / 2
//!
//! Bar 0 has no directional movement, so all three smoothed inputs seed on
//! bars 1..=period. ADX lookback is 2*period - 1, ADXR lookback 3*period - 2.

use std::collections::VecDeque;

use crate::domain::Bar;
use crate::indicators::atr::{true_range, true_range_step, wilder_smooth, WilderSmoother};
use crate::indicators::Indicator;

/// +DM and -DM of `bar` relative to `prev`.
pub fn directional_movement(prev: &Bar, bar: &Bar) -> (f64, f64) {
    if bar.high.is_nan() || bar.low.is_nan() || prev.high.is_nan() || prev.low.is_nan() {
        return (f64::NAN, f64::NAN);
    }
    let high_diff = bar.high - prev.high;
    let low_diff = prev.low - bar.low;

    let plus = if high_diff > low_diff && high_diff > 0.0 {
        high_diff
    } else {
        0.0
    };
    let minus = if low_diff > high_diff && low_diff > 0.0 {
        low_diff
    } else {
        0.0
    };
    (plus, minus)
}

/// DX from the smoothed TR, +DM and -DM. NaN while any input is unset or
/// the smoothed range is zero.
pub fn directional_index(smooth_tr: f64, smooth_plus_dm: f64, smooth_minus_dm: f64) -> f64 {
    if smooth_tr.is_nan() || smooth_plus_dm.is_nan() || smooth_minus_dm.is_nan() || smooth_tr == 0.0
    {
        return f64::NAN;
    }
    let plus_di = 100.0 * smooth_plus_dm / smooth_tr;
    let minus_di = 100.0 * smooth_minus_dm / smooth_tr;
    let di_sum = plus_di + minus_di;
    if di_sum == 0.0 {
        0.0
    } else {
        100.0 * (plus_di - minus_di).abs() / di_sum
    }
}

/// ADXR from the current ADX and the ADX `period - 1` bars back.
pub fn rate_adx(adx_now: f64, adx_back: f64) -> f64 {
    if adx_now.is_nan() || adx_back.is_nan() {
        return f64::NAN;
    }
    (adx_now + adx_back) / 2.0
}

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        if n < 2 {
            return vec![f64::NAN; n];
        }

        let mut plus_dm = vec![f64::NAN; n];
        let mut minus_dm = vec![f64::NAN; n];
        for i in 1..n {
            let (plus, minus) = directional_movement(&bars[i - 1], &bars[i]);
            plus_dm[i] = plus;
            minus_dm[i] = minus;
        }

        let smooth_tr = wilder_smooth(&true_range(bars), self.period);
        let smooth_plus_dm = wilder_smooth(&plus_dm, self.period);
        let smooth_minus_dm = wilder_smooth(&minus_dm, self.period);

        let dx: Vec<f64> = (0..n)
            .map(|i| directional_index(smooth_tr[i], smooth_plus_dm[i], smooth_minus_dm[i]))
            .collect();

        wilder_smooth(&dx, self.period)
    }
}

/// Average Directional Movement Index Rating.
#[derive(Debug, Clone)]
pub struct Adxr {
    period: usize,
    adx: Adx,
    name: String,
}

impl Adxr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADXR period must be >= 1");
        Self {
            period,
            adx: Adx::new(period),
            name: format!("adxr_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Adxr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        3 * self.period - 2
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let adx = self.adx.compute(bars);
        let back = self.period - 1;
        (0..adx.len())
            .map(|i| {
                if i < back {
                    f64::NAN
                } else {
                    rate_adx(adx[i], adx[i - back])
                }
            })
            .collect()
    }
}

/// Streaming ADXR: one bar per `push`, bit-identical to [`Adxr::compute`]
/// on the prefix pushed so far.
#[derive(Debug, Clone)]
pub struct AdxrStream {
    period: usize,
    prev: Option<Bar>,
    tr: WilderSmoother,
    plus_dm: WilderSmoother,
    minus_dm: WilderSmoother,
    adx: WilderSmoother,
    adx_window: VecDeque<f64>,
}

impl AdxrStream {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADXR period must be >= 1");
        Self {
            period,
            prev: None,
            tr: WilderSmoother::new(period),
            plus_dm: WilderSmoother::new(period),
            minus_dm: WilderSmoother::new(period),
            adx: WilderSmoother::new(period),
            adx_window: VecDeque::with_capacity(period),
        }
    }

    pub fn push(&mut self, bar: &Bar) -> f64 {
        let (tr, plus, minus) = match &self.prev {
            Some(prev) => {
                let (plus, minus) = directional_movement(prev, bar);
                (true_range_step(prev, bar), plus, minus)
            }
            None => (f64::NAN, f64::NAN, f64::NAN),
        };
        self.prev = Some(bar.clone());

        let dx = directional_index(
            self.tr.push(tr),
            self.plus_dm.push(plus),
            self.minus_dm.push(minus),
        );
        let adx = self.adx.push(dx);

        if self.adx_window.len() == self.period {
            self.adx_window.pop_front();
        }
        self.adx_window.push_back(adx);

        if self.adx_window.len() < self.period {
            return f64::NAN;
        }
        match self.adx_window.front() {
            Some(&back) => rate_adx(adx, back),
            None => f64::NAN,
        }
    }
}
