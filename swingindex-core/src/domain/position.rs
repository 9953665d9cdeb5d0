//! Position legs: an open leg and the immutable record it turns into.
//!
//! A leg is closed by consuming the `OpenPosition`, so it can be closed
//! exactly once and the resulting `ClosedPosition` is never mutated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::side::Side;
use super::signal::SignalReason;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("exit index {exit_index} precedes entry index {entry_index}")]
    ExitBeforeEntry {
        entry_index: usize,
        exit_index: usize,
    },
}

/// The single open leg for an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub shares: f64,
}

impl OpenPosition {
    /// The flat leg every asset run starts with.
    pub fn initial(symbol: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            side: Side::Initial,
            entry_price: 0.0,
            entry_index: 0,
            entry_date: date,
            shares: 0.0,
        }
    }

    pub fn open(
        symbol: impl Into<String>,
        side: Side,
        entry_price: f64,
        entry_index: usize,
        entry_date: NaiveDate,
        shares: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            entry_price,
            entry_index,
            entry_date,
            shares,
        }
    }

    /// Profit/loss if this leg were closed at `price`.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        pnl(self.side, self.shares, self.entry_price, price)
    }

    /// Close the leg. A flat leg exits at its own entry price.
    pub fn close(
        self,
        exit_price: f64,
        exit_index: usize,
        exit_date: NaiveDate,
        exit_reason: SignalReason,
    ) -> Result<ClosedPosition, PositionError> {
        if exit_index < self.entry_index {
            return Err(PositionError::ExitBeforeEntry {
                entry_index: self.entry_index,
                exit_index,
            });
        }
        let exit_price = match self.side {
            Side::Initial => self.entry_price,
            Side::Long | Side::Short => exit_price,
        };
        Ok(ClosedPosition {
            symbol: self.symbol,
            side: self.side,
            entry_price: self.entry_price,
            entry_index: self.entry_index,
            entry_date: self.entry_date,
            shares: self.shares,
            exit_price,
            exit_index,
            exit_date,
            exit_reason,
        })
    }
}

/// A completed leg, retained in the append-only trade ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub shares: f64,
    pub exit_price: f64,
    pub exit_index: usize,
    pub exit_date: NaiveDate,
    pub exit_reason: SignalReason,
}

impl ClosedPosition {
    /// Realized profit/loss; the sign convention is fixed by the side.
    pub fn profit_loss(&self) -> f64 {
        pnl(self.side, self.shares, self.entry_price, self.exit_price)
    }

    /// Bars between entry and exit.
    pub fn time_held(&self) -> usize {
        self.exit_index - self.entry_index
    }

    pub fn is_winner(&self) -> bool {
        self.profit_loss() > 0.0
    }
}

fn pnl(side: Side, shares: f64, entry_price: f64, exit_price: f64) -> f64 {
    match side {
        Side::Initial => 0.0,
        Side::Long => shares * (exit_price - entry_price),
        Side::Short => shares * (entry_price - exit_price),
    }
}
