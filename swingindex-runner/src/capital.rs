//! Capital management: buying power and margin caps per asset run.

use crate::config::CapitalSection;

/// Gatekeeper consulted before every order. One instance per asset run.
pub trait CapitalManager: Send {
    /// Whether `shares` at `price` may be committed.
    fn check(&self, shares: f64, price: f64) -> bool;

    /// Record an accepted order and the realized P&L of the leg it closed.
    fn apply(&mut self, shares: f64, price: f64, realized_pl: f64);
}

/// Caps each order at a fraction of capital, overall and per asset.
///
/// Every accepted order replaces the asset's open leg, so `check` sizes the
/// new commitment against capital with the current leg released.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginCapitalManager {
    total_capital: f64,
    margin: f64,
    margin_per_asset: f64,
    committed: f64,
}

impl MarginCapitalManager {
    pub fn new(total_capital: f64, margin: f64, margin_per_asset: f64) -> Self {
        Self {
            total_capital,
            margin,
            margin_per_asset,
            committed: 0.0,
        }
    }

    pub fn from_config(section: &CapitalSection) -> Self {
        Self::new(
            section.total_capital,
            section.margin,
            section.margin_per_asset,
        )
    }

    /// Capital including realized P&L.
    pub fn total_capital(&self) -> f64 {
        self.total_capital
    }

    /// Cost of the currently open leg.
    pub fn committed(&self) -> f64 {
        self.committed
    }

    pub fn buying_power(&self) -> f64 {
        self.total_capital - self.committed
    }

    fn limit(&self) -> f64 {
        let cap = self.margin.min(self.margin_per_asset);
        (self.total_capital * cap).min(self.total_capital)
    }
}

impl CapitalManager for MarginCapitalManager {
    fn check(&self, shares: f64, price: f64) -> bool {
        let cost = shares * price;
        cost.is_finite() && cost <= self.limit()
    }

    fn apply(&mut self, shares: f64, price: f64, realized_pl: f64) {
        self.total_capital += realized_pl;
        self.committed = shares * price;
    }
}
