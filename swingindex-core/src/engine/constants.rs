//! Strategy constants: swing index coefficients, ADXR period and gate thresholds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indicators::SwingIndexConstants;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstantsError {
    #[error("constant {name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("limit move c6 must be positive, got {0}")]
    NonPositiveLimit(f64),

    #[error("adxr_period must be at least 1")]
    ZeroPeriod,
}

/// Inputs to the indicator engine and state machine. Validated once by
/// [`StrategyConstants::validate`] and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConstants {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub c4: f64,
    pub c5: f64,
    pub c6: f64,
    pub c7: f64,
    pub adxr_period: usize,
    pub adxr_buy_threshold: f64,
    pub adxr_sell_threshold: f64,
    pub trailing_sar_threshold: f64,
}

impl Default for StrategyConstants {
    fn default() -> Self {
        let si = SwingIndexConstants::default();
        Self {
            c1: si.c1,
            c2: si.c2,
            c3: si.c3,
            c4: si.c4,
            c5: si.c5,
            c6: si.c6,
            c7: si.c7,
            adxr_period: 14,
            adxr_buy_threshold: 20.0,
            adxr_sell_threshold: 20.0,
            trailing_sar_threshold: 60.0,
        }
    }
}

impl StrategyConstants {
    pub fn validate(&self) -> Result<(), ConstantsError> {
        let named = [
            ("c1", self.c1),
            ("c2", self.c2),
            ("c3", self.c3),
            ("c4", self.c4),
            ("c5", self.c5),
            ("c6", self.c6),
            ("c7", self.c7),
            ("adxr_buy_threshold", self.adxr_buy_threshold),
            ("adxr_sell_threshold", self.adxr_sell_threshold),
            ("trailing_sar_threshold", self.trailing_sar_threshold),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(ConstantsError::NotFinite { name, value });
            }
        }
        if self.c6 <= 0.0 {
            return Err(ConstantsError::NonPositiveLimit(self.c6));
        }
        if self.adxr_period == 0 {
            return Err(ConstantsError::ZeroPeriod);
        }
        Ok(())
    }

    pub fn swing_index(&self) -> SwingIndexConstants {
        SwingIndexConstants {
            c1: self.c1,
            c2: self.c2,
            c3: self.c3,
            c4: self.c4,
            c5: self.c5,
            c6: self.c6,
            c7: self.c7,
        }
    }

    /// Bars needed before ADXR, and therefore a ready bar, can exist.
    pub fn warmup(&self) -> usize {
        3 * self.adxr_period - 2
    }
}
