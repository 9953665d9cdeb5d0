//! Incremental indicator engine.
//!
//! Holds the running state of every recurrence (ASI sum, swing trackers,
//! Wilder smoothers, the ADX ring) so each new bar costs O(1). After pushing
//! bars `0..=i` the latest bar equals `IndicatorEngine::compute(&bars[..=i])[i]`
//! exactly, including floating point bits.

use tracing::debug;

use crate::domain::Bar;
use crate::engine::constants::StrategyConstants;
use crate::engine::enriched::{adxr_gates, EnrichedBar};
use crate::indicators::adx::AdxrStream;
use crate::indicators::{swing_index, Extremum, IndicatorError, SwingIndexConstants, SwingTracker};

#[derive(Debug, Clone)]
pub struct IncrementalEngine {
    constants: StrategyConstants,
    swing_constants: SwingIndexConstants,
    prev: Option<Bar>,
    asi_sum: f64,
    hsp: SwingTracker,
    lsp: SwingTracker,
    hip: SwingTracker,
    lop: SwingTracker,
    adxr: AdxrStream,
    history: Vec<EnrichedBar>,
    poisoned: Option<IndicatorError>,
}

impl IncrementalEngine {
    /// `constants` are assumed valid; build through `IndicatorEngine::incremental`
    /// to get that guarantee.
    pub fn new(constants: StrategyConstants) -> Self {
        Self {
            swing_constants: constants.swing_index(),
            constants,
            prev: None,
            asi_sum: 0.0,
            hsp: SwingTracker::new(Extremum::Max),
            lsp: SwingTracker::new(Extremum::Min),
            hip: SwingTracker::new(Extremum::Max),
            lop: SwingTracker::new(Extremum::Min),
            adxr: AdxrStream::new(constants.adxr_period.max(1)),
            history: Vec::new(),
            poisoned: None,
        }
    }

    /// Append one bar and return its enriched form.
    ///
    /// Once a degenerate bar has been pushed every later call returns the
    /// same error, mirroring a full recompute over any prefix containing it.
    pub fn push(&mut self, bar: Bar) -> Result<&EnrichedBar, IndicatorError> {
        if let Some(err) = &self.poisoned {
            return Err(err.clone());
        }
        let index = self.history.len();

        let asi = match &self.prev {
            None => None,
            Some(prev) => match swing_index(prev, &bar, &self.swing_constants) {
                Some(si) => {
                    self.asi_sum += si;
                    Some(self.asi_sum)
                }
                None => {
                    let err = IndicatorError::DegenerateRange { index };
                    debug!(index, "incremental engine poisoned by degenerate bar");
                    self.poisoned = Some(err.clone());
                    return Err(err);
                }
            },
        };

        let hsp = self.hsp.push(asi);
        let lsp = self.lsp.push(asi);
        let hip = self.hip.push(Some(bar.high));
        let lop = self.lop.push(Some(bar.low));
        let adxr = {
            let v = self.adxr.push(&bar);
            if v.is_finite() {
                Some(v)
            } else {
                None
            }
        };
        let (adxr_buy_gate, adxr_sell_gate) = adxr_gates(
            adxr,
            self.constants.adxr_buy_threshold,
            self.constants.adxr_sell_threshold,
        );

        self.prev = Some(bar.clone());
        self.history.push(EnrichedBar {
            bar,
            asi,
            hsp,
            hip,
            lsp,
            lop,
            adxr,
            adxr_buy_gate,
            adxr_sell_gate,
        });
        Ok(&self.history[index])
    }

    /// Every bar enriched so far.
    pub fn history(&self) -> &[EnrichedBar] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }
}
