//! Data source trait and structured error types.
//!
//! `MarketDataSource` abstracts over where bars come from (CSV directory,
//! Yahoo Finance, a seeded generator) so the batch runner can swap
//! implementations and tests can run offline.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{validate_series, Bar, BarError};

#[derive(Debug, Error)]
pub enum DataError {
    /// The source has no bars for the symbol in the requested range.
    #[error("no bars for symbol '{symbol}' in the requested range")]
    NoBars { symbol: String },

    #[error("network unreachable: {0}")]
    Network(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid bars for '{symbol}': {source}")]
    InvalidBars {
        symbol: String,
        #[source]
        source: BarError,
    },
}

impl DataError {
    /// Data gaps drop the symbol; everything else is an upstream failure.
    pub fn is_data_gap(&self) -> bool {
        matches!(self, DataError::NoBars { .. })
    }
}

/// Bar interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
}

/// Result of fetching a symbol universe.
#[derive(Debug, Default)]
pub struct FetchBatch {
    pub bars: BTreeMap<String, Vec<Bar>>,
    /// Symbols with no data in range.
    pub gaps: Vec<String>,
    /// Symbols whose fetch failed upstream.
    pub failures: Vec<(String, DataError)>,
}

impl FetchBatch {
    pub fn total(&self) -> usize {
        self.bars.len() + self.gaps.len() + self.failures.len()
    }
}

pub trait MarketDataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch bars for one symbol, ascending by date, validated.
    fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> Result<Vec<Bar>, DataError>;

    /// Fetch a universe, sorting every symbol into bars, gaps or failures.
    fn fetch(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> FetchBatch {
        let mut batch = FetchBatch::default();
        for symbol in symbols {
            match self.fetch_symbol(symbol, start, end, granularity) {
                Ok(bars) => {
                    batch.bars.insert(symbol.clone(), bars);
                }
                Err(e) if e.is_data_gap() => {
                    info!(symbol = %symbol, source = self.name(), "no bars in range, dropping symbol");
                    batch.gaps.push(symbol.clone());
                }
                Err(e) => {
                    warn!(symbol = %symbol, source = self.name(), error = %e, "fetch failed");
                    batch.failures.push((symbol.clone(), e));
                }
            }
        }
        batch
    }
}

/// Check a fetched series, mapping an empty series to a data gap.
pub fn finish_series(symbol: &str, bars: Vec<Bar>) -> Result<Vec<Bar>, DataError> {
    if bars.is_empty() {
        return Err(DataError::NoBars {
            symbol: symbol.to_string(),
        });
    }
    validate_series(&bars).map_err(|source| DataError::InvalidBars {
        symbol: symbol.to_string(),
        source,
    })?;
    Ok(bars)
}

/// Aggregate daily bars into ISO weeks. Each weekly bar is dated on the
/// first trading day of its week.
pub fn resample_weekly(bars: &[Bar]) -> Vec<Bar> {
    let mut out: Vec<Bar> = Vec::new();
    let mut current_week = None;
    for bar in bars {
        let week = bar.date.iso_week();
        let key = (week.year(), week.week());
        match out.last_mut() {
            Some(last) if current_week == Some(key) => {
                last.high = last.high.max(bar.high);
                last.low = last.low.min(bar.low);
                last.close = bar.close;
                last.volume += bar.volume;
            }
            _ => {
                out.push(bar.clone());
                current_week = Some(key);
            }
        }
    }
    out
}
