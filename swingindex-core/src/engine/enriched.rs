//! EnrichedBar: a bar plus everything the state machine reads from it.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBar {
    #[serde(flatten)]
    pub bar: Bar,
    /// Accumulative swing index. Unset on the first bar.
    pub asi: Option<f64>,
    /// Latest confirmed ASI high.
    pub hsp: Option<f64>,
    /// Latest confirmed price high.
    pub hip: Option<f64>,
    /// Latest confirmed ASI low.
    pub lsp: Option<f64>,
    /// Latest confirmed price low.
    pub lop: Option<f64>,
    pub adxr: Option<f64>,
    pub adxr_buy_gate: bool,
    pub adxr_sell_gate: bool,
}

impl EnrichedBar {
    /// True when every field the state machine depends on is set.
    pub fn is_ready(&self) -> bool {
        self.asi.is_some()
            && self.hsp.is_some()
            && self.hip.is_some()
            && self.lsp.is_some()
            && self.lop.is_some()
            && self.adxr.is_some()
    }

    /// Name of the first unset required field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("asi", self.asi),
            ("hsp", self.hsp),
            ("hip", self.hip),
            ("lsp", self.lsp),
            ("lop", self.lop),
            ("adxr", self.adxr),
        ]
        .into_iter()
        .find(|(_, v)| v.is_none())
        .map(|(name, _)| name)
    }
}

/// Gate evaluation. Both gates are closed while ADXR is unset.
pub fn adxr_gates(adxr: Option<f64>, buy_threshold: f64, sell_threshold: f64) -> (bool, bool) {
    match adxr {
        Some(v) => (v > buy_threshold, v < sell_threshold),
        None => (false, false),
    }
}
