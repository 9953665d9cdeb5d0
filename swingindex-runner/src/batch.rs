//! Multi-asset batch runs.
//!
//! The universe is fetched once, symbols without data are dropped, and each
//! remaining asset runs on a rayon worker with its own driver and capital
//! manager. Nothing mutable is shared between workers.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use swingindex_core::data::{
    CsvDataSource, DataError, MarketDataSource, SyntheticDataSource, YahooDataSource,
};
use swingindex_core::domain::Bar;
use swingindex_core::engine::ConstantsError;

use crate::broker::{Broker, LimitFillBroker};
use crate::capital::MarginCapitalManager;
use crate::config::{BacktestConfig, ConfigError, DataSourceKind, RunId};
use crate::driver::{AssetRun, BacktestDriver, StepError};
use crate::metrics::TradeStatistics;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("strategy constants: {0}")]
    Constants(#[from] ConstantsError),
    #[error("driver error: {0}")]
    Step(#[from] StepError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("symbol universe is empty")]
    EmptyUniverse,
}

/// An asset whose fetch or run failed. Other assets are unaffected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub run_id: RunId,
    /// Completed runs, ordered by symbol.
    pub runs: Vec<AssetRun>,
    /// Symbols with no bars in range.
    pub gaps: Vec<String>,
    pub failures: Vec<AssetFailure>,
}

impl BatchResult {
    /// Statistics pooled over every asset.
    pub fn statistics(&self) -> TradeStatistics {
        TradeStatistics::from_ledgers(self.runs.iter().map(|r| &r.ledger))
    }

    pub fn per_asset_statistics(&self) -> BTreeMap<String, TradeStatistics> {
        self.runs
            .iter()
            .map(|r| (r.symbol.clone(), TradeStatistics::from_ledger(&r.ledger)))
            .collect()
    }

    pub fn trade_count(&self) -> usize {
        self.runs.iter().map(|r| r.ledger.trades().count()).sum()
    }
}

/// The data source named by `[data]`.
pub fn build_source(config: &BacktestConfig) -> Result<Box<dyn MarketDataSource>, RunError> {
    let source: Box<dyn MarketDataSource> = match config.data.source {
        DataSourceKind::Csv => Box::new(CsvDataSource::new(config.data.csv_dir.clone())),
        DataSourceKind::Yahoo => Box::new(YahooDataSource::new()?),
        DataSourceKind::Synthetic => Box::new(SyntheticDataSource::new(config.data.synthetic_seed)),
    };
    Ok(source)
}

/// Configured symbols, or every CSV in the data directory when none are
/// listed, then sampled down to `sample_size`.
pub fn resolve_universe(config: &BacktestConfig) -> Result<Vec<String>, RunError> {
    let symbols = if config.backtest.symbols.is_empty() {
        CsvDataSource::new(config.data.csv_dir.clone()).list_symbols()?
    } else {
        config.backtest.symbols.clone()
    };
    if symbols.is_empty() {
        return Err(RunError::EmptyUniverse);
    }
    Ok(match config.backtest.sample_size {
        Some(n) => sample_symbols(&symbols, n, config.backtest.seed),
        None => symbols,
    })
}

/// Seeded random subset of `symbols`, returned sorted. The full list when
/// `n` covers it.
pub fn sample_symbols(symbols: &[String], n: usize, seed: u64) -> Vec<String> {
    if n >= symbols.len() {
        return symbols.to_vec();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sample: Vec<String> = symbols.choose_multiple(&mut rng, n).cloned().collect();
    sample.sort();
    sample
}

/// Fetch the universe and run every asset with data.
pub fn run_batch(
    config: &BacktestConfig,
    source: &dyn MarketDataSource,
) -> Result<BatchResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let universe = resolve_universe(config)?;
    info!(
        run_id = %run_id,
        source = source.name(),
        symbols = universe.len(),
        "starting batch"
    );

    let bt = &config.backtest;
    let fetched = source.fetch(&universe, bt.start_date, bt.end_date, bt.granularity);

    let mut failures: Vec<AssetFailure> = fetched
        .failures
        .iter()
        .map(|(symbol, e)| AssetFailure {
            symbol: symbol.clone(),
            error: e.to_string(),
        })
        .collect();

    let broker = LimitFillBroker;
    let assets: Vec<(&String, &Vec<Bar>)> = fetched.bars.iter().collect();
    let outcomes: Vec<(String, Result<AssetRun, RunError>)> = assets
        .par_iter()
        .map(|(symbol, bars)| {
            let outcome = run_asset(config, &broker, symbol, bars);
            ((*symbol).clone(), outcome)
        })
        .collect();

    let mut runs = Vec::with_capacity(outcomes.len());
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(run) => runs.push(run),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "asset run failed");
                failures.push(AssetFailure {
                    symbol,
                    error: e.to_string(),
                });
            }
        }
    }
    failures.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let result = BatchResult {
        run_id,
        runs,
        gaps: fetched.gaps,
        failures,
    };
    info!(
        assets = result.runs.len(),
        gaps = result.gaps.len(),
        failures = result.failures.len(),
        trades = result.trade_count(),
        "batch complete"
    );
    Ok(result)
}

/// One asset on one worker: a fresh driver and capital manager.
pub fn run_asset(
    config: &BacktestConfig,
    broker: &dyn Broker,
    symbol: &str,
    bars: &[Bar],
) -> Result<AssetRun, RunError> {
    let mut driver = BacktestDriver::new(config.strategy, broker)?
        .with_shares(config.backtest.shares_per_trade)
        .with_mode(config.backtest.recompute);
    if let Some(section) = &config.capital {
        driver = driver.with_capital(Box::new(MarginCapitalManager::from_config(section)));
    }
    Ok(driver.run(symbol, bars)?)
}
