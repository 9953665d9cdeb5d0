//! Swing Index runner: backtest orchestration on top of `swingindex-core`.
//!
//! This crate provides:
//! - The per-asset backtest driver and its append-only trade ledger
//! - Limit-fill broker and margin capital manager
//! - Trade statistics, CSV/JSON report export
//! - TOML configuration and the parallel multi-asset batch runner

pub mod batch;
pub mod broker;
pub mod capital;
pub mod config;
pub mod driver;
pub mod ledger;
pub mod metrics;
pub mod report;

pub use batch::{
    build_source, resolve_universe, run_asset, run_batch, sample_symbols, AssetFailure,
    BatchResult, RunError,
};
pub use broker::{Broker, LimitFillBroker};
pub use capital::{CapitalManager, MarginCapitalManager};
pub use config::{BacktestConfig, ConfigError, RunId};
pub use driver::{AssetRun, BacktestDriver, SkipCounts, StepError};
pub use ledger::TradeLedger;
pub use metrics::{SideBreakdown, SummaryStats, TradeStatistics};
pub use report::{
    export_statistics_json, export_summary_json, export_trades_csv, save_reports, summary_table,
};
