//! Order fills against the realized bar.

use swingindex_core::domain::Bar;

/// Simulated brokerage. Shared read-only across batch workers.
pub trait Broker: Send + Sync {
    /// Whether an order at `trial_price` fills on `realized_bar`.
    fn submit_order(&self, asset: &str, trial_price: f64, realized_bar: &Bar) -> bool;
}

/// Limit order that fills when the bar trades at or above the trial price.
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitFillBroker;

impl Broker for LimitFillBroker {
    fn submit_order(&self, _asset: &str, trial_price: f64, realized_bar: &Bar) -> bool {
        realized_bar.high >= trial_price
    }
}
