//! Indicator engine: OHLC series in, enriched series out.
//!
//! [`IndicatorEngine::compute`] is a pure function of its input. The
//! [`IncrementalEngine`] runs the same recurrence one bar at a time and
//! yields identical bars.

pub mod constants;
pub mod enriched;
pub mod stream;

pub use crate::indicators::IndicatorError;
pub use constants::{ConstantsError, StrategyConstants};
pub use enriched::{adxr_gates, EnrichedBar};
pub use stream::IncrementalEngine;

use crate::domain::Bar;
use crate::indicators::{
    accumulative_swing_index, swing_points, to_options, Adxr, Extremum, Indicator,
};

/// How the driver refreshes indicators as the visible window grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecomputeMode {
    /// Recompute the whole visible prefix every day.
    #[default]
    Full,
    /// Push one bar per day into an [`IncrementalEngine`].
    Incremental,
}

#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    constants: StrategyConstants,
    adxr: Adxr,
}

impl IndicatorEngine {
    pub fn new(constants: StrategyConstants) -> Result<Self, ConstantsError> {
        constants.validate()?;
        Ok(Self {
            adxr: Adxr::new(constants.adxr_period),
            constants,
        })
    }

    pub fn constants(&self) -> &StrategyConstants {
        &self.constants
    }

    /// Enrich every bar. Output is index-aligned with `bars`.
    pub fn compute(&self, bars: &[Bar]) -> Result<Vec<EnrichedBar>, IndicatorError> {
        let asi = accumulative_swing_index(bars, &self.constants.swing_index())?;
        let hsp = swing_points(&asi, Extremum::Max);
        let lsp = swing_points(&asi, Extremum::Min);

        let highs: Vec<Option<f64>> = bars.iter().map(|b| Some(b.high)).collect();
        let lows: Vec<Option<f64>> = bars.iter().map(|b| Some(b.low)).collect();
        let hip = swing_points(&highs, Extremum::Max);
        let lop = swing_points(&lows, Extremum::Min);

        let adxr = to_options(&self.adxr.compute(bars));
        debug_assert_eq!(adxr.len(), bars.len());

        Ok(bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let (adxr_buy_gate, adxr_sell_gate) = adxr_gates(
                    adxr[i],
                    self.constants.adxr_buy_threshold,
                    self.constants.adxr_sell_threshold,
                );
                EnrichedBar {
                    bar: bar.clone(),
                    asi: asi[i],
                    hsp: hsp[i],
                    hip: hip[i],
                    lsp: lsp[i],
                    lop: lop[i],
                    adxr: adxr[i],
                    adxr_buy_gate,
                    adxr_sell_gate,
                }
            })
            .collect())
    }

    /// A fresh streaming engine with the same constants.
    pub fn incremental(&self) -> IncrementalEngine {
        IncrementalEngine::new(self.constants)
    }
}
