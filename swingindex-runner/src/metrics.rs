//! Trade statistics over one or many ledgers.
//!
//! Profit/loss and holding period, each summarized per side and overall.
//! The flat opening leg of every asset run is excluded.

use serde::{Deserialize, Serialize};

use swingindex_core::domain::{ClosedPosition, Side};

use crate::ledger::TradeLedger;

/// Count, mean, sample standard deviation and range of a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl SummaryStats {
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            count: values.len(),
            mean: mean_f64(values),
            std_dev: std_dev(values),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
        }
    }
}

/// One metric broken down by side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideBreakdown {
    pub long: SummaryStats,
    pub short: SummaryStats,
    pub overall: SummaryStats,
}

impl SideBreakdown {
    fn from_trades<F>(trades: &[&ClosedPosition], metric: F) -> Self
    where
        F: Fn(&ClosedPosition) -> f64,
    {
        let values_for = |side: Option<Side>| -> Vec<f64> {
            trades
                .iter()
                .filter(|t| side.map_or(true, |s| t.side == s))
                .map(|t| metric(t))
                .collect()
        };
        Self {
            long: SummaryStats::from_values(&values_for(Some(Side::Long))),
            short: SummaryStats::from_values(&values_for(Some(Side::Short))),
            overall: SummaryStats::from_values(&values_for(None)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStatistics {
    pub profit_loss: SideBreakdown,
    /// Holding period in bars.
    pub holding_period: SideBreakdown,
    pub total_profit_loss: f64,
    /// Fraction of trades with positive P&L (0 with no trades).
    pub win_rate: f64,
}

impl TradeStatistics {
    pub fn from_ledger(ledger: &TradeLedger) -> Self {
        Self::from_ledgers(std::iter::once(ledger))
    }

    /// Pooled statistics over several assets' ledgers.
    pub fn from_ledgers<'a, I>(ledgers: I) -> Self
    where
        I: IntoIterator<Item = &'a TradeLedger>,
    {
        let trades: Vec<&ClosedPosition> = ledgers
            .into_iter()
            .flat_map(|ledger| ledger.trades())
            .collect();

        let winners = trades.iter().filter(|t| t.is_winner()).count();
        let win_rate = if trades.is_empty() {
            0.0
        } else {
            winners as f64 / trades.len() as f64
        };

        Self {
            profit_loss: SideBreakdown::from_trades(&trades, ClosedPosition::profit_loss),
            holding_period: SideBreakdown::from_trades(&trades, |t| t.time_held() as f64),
            total_profit_loss: trades.iter().map(|t| t.profit_loss()).sum(),
            win_rate,
        }
    }

    pub fn trade_count(&self) -> usize {
        self.profit_loss.overall.count
    }
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). Zero below two values.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use swingindex_core::domain::{OpenPosition, SignalReason};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn leg(side: Side, entry: f64, exit: f64, entry_index: usize, exit_index: usize) -> ClosedPosition {
        OpenPosition::open("XYZ", side, entry, entry_index, d(1), 1.0)
            .close(exit, exit_index, d(2), SignalReason::Sar)
            .unwrap()
    }

    fn sample_ledger() -> TradeLedger {
        let mut ledger = TradeLedger::new();
        ledger.append(
            OpenPosition::initial("XYZ", d(1))
                .close(50.0, 4, d(4), SignalReason::EntryLong)
                .unwrap(),
        );
        ledger.append(leg(Side::Long, 50.0, 55.0, 4, 10));
        ledger.append(leg(Side::Short, 55.0, 57.0, 10, 12));
        ledger.append(leg(Side::Long, 57.0, 60.0, 12, 20));
        ledger
    }

    #[test]
    fn summary_of_empty_sample() {
        let s = SummaryStats::from_values(&[]);
        assert_eq!(s.count, 0);
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.min, None);
        assert_eq!(s.max, None);
    }

    #[test]
    fn summary_uses_sample_std_dev() {
        let s = SummaryStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.count, 8);
        assert!((s.mean - 5.0).abs() < 1e-12);
        assert!((s.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(s.min, Some(2.0));
        assert_eq!(s.max, Some(9.0));
    }

    #[test]
    fn initial_leg_excluded() {
        let stats = TradeStatistics::from_ledger(&sample_ledger());
        assert_eq!(stats.trade_count(), 3);
        assert_eq!(stats.holding_period.overall.min, Some(2.0));
    }

    #[test]
    fn per_side_breakdown() {
        let stats = TradeStatistics::from_ledger(&sample_ledger());
        assert_eq!(stats.profit_loss.long.count, 2);
        assert!((stats.profit_loss.long.mean - 4.0).abs() < 1e-12);
        assert_eq!(stats.profit_loss.short.count, 1);
        assert_eq!(stats.profit_loss.short.mean, -2.0);
        assert_eq!(stats.profit_loss.overall.max, Some(5.0));
        assert_eq!(stats.holding_period.long.max, Some(8.0));
        assert!((stats.total_profit_loss - 6.0).abs() < 1e-12);
        assert!((stats.win_rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn pooled_over_ledgers() {
        let a = sample_ledger();
        let b = sample_ledger();
        let stats = TradeStatistics::from_ledgers([&a, &b]);
        assert_eq!(stats.trade_count(), 6);
        assert!((stats.total_profit_loss - 12.0).abs() < 1e-12);
    }

    #[test]
    fn empty_ledger() {
        let stats = TradeStatistics::from_ledger(&TradeLedger::new());
        assert_eq!(stats.trade_count(), 0);
        assert_eq!(stats.win_rate, 0.0);
    }
}
