//! Report export: trade tape CSV, statistics and summary JSON, console table.
//!
//! A run's artifacts land in `{output_dir}/{run_id prefix}/`:
//! - `trades.csv`: every closed leg that took a side
//! - `statistics.json`: pooled and per-asset `TradeStatistics`
//! - `summary.json`: run id, config, open positions, gaps and failures

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use swingindex_core::domain::OpenPosition;

use crate::batch::{AssetFailure, BatchResult};
use crate::config::BacktestConfig;
use crate::driver::{AssetRun, SkipCounts};
use crate::metrics::TradeStatistics;

/// Current schema version for persisted JSON artifacts.
pub const SCHEMA_VERSION: u32 = 1;

const RUN_DIR_PREFIX_LEN: usize = 12;

pub const TRADE_COLUMNS: [&str; 11] = [
    "asset",
    "side",
    "entry_index",
    "entry_date",
    "entry_price",
    "exit_index",
    "exit_date",
    "exit_price",
    "holding_period",
    "profit_loss",
    "exit_reason",
];

/// Trade tape for every asset, in run order.
pub fn export_trades_csv(runs: &[AssetRun]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(TRADE_COLUMNS)?;

    for t in runs.iter().flat_map(|r| r.ledger.trades()) {
        wtr.write_record([
            t.symbol.as_str(),
            t.side.as_str(),
            t.entry_index.to_string().as_str(),
            t.entry_date.to_string().as_str(),
            format!("{:.6}", t.entry_price).as_str(),
            t.exit_index.to_string().as_str(),
            t.exit_date.to_string().as_str(),
            format!("{:.6}", t.exit_price).as_str(),
            t.time_held().to_string().as_str(),
            format!("{:.6}", t.profit_loss()).as_str(),
            t.exit_reason.as_str(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

#[derive(Debug, Serialize)]
struct StatisticsReport<'a> {
    schema_version: u32,
    run_id: &'a str,
    batch: TradeStatistics,
    per_asset: BTreeMap<String, TradeStatistics>,
}

pub fn export_statistics_json(result: &BatchResult) -> Result<String> {
    let report = StatisticsReport {
        schema_version: SCHEMA_VERSION,
        run_id: &result.run_id,
        batch: result.statistics(),
        per_asset: result.per_asset_statistics(),
    };
    serde_json::to_string_pretty(&report).context("failed to serialize statistics to JSON")
}

#[derive(Debug, Serialize)]
struct AssetSummary<'a> {
    symbol: &'a str,
    bar_count: usize,
    trades: usize,
    open_position: &'a OpenPosition,
    skips: SkipCounts,
    degenerate_index: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SummaryReport<'a> {
    schema_version: u32,
    run_id: &'a str,
    config: &'a BacktestConfig,
    assets: Vec<AssetSummary<'a>>,
    gaps: &'a [String],
    failures: &'a [AssetFailure],
}

pub fn export_summary_json(result: &BatchResult, config: &BacktestConfig) -> Result<String> {
    let assets = result
        .runs
        .iter()
        .map(|r| AssetSummary {
            symbol: &r.symbol,
            bar_count: r.bar_count,
            trades: r.ledger.trades().count(),
            open_position: &r.open_position,
            skips: r.skips,
            degenerate_index: r.degenerate_index,
        })
        .collect();
    let report = SummaryReport {
        schema_version: SCHEMA_VERSION,
        run_id: &result.run_id,
        config,
        assets,
        gaps: &result.gaps,
        failures: &result.failures,
    };
    serde_json::to_string_pretty(&report).context("failed to serialize summary to JSON")
}

/// Write the artifact set and return the run directory.
pub fn save_reports(
    result: &BatchResult,
    config: &BacktestConfig,
    output_dir: &Path,
) -> Result<PathBuf> {
    let prefix = result
        .run_id
        .get(..RUN_DIR_PREFIX_LEN)
        .unwrap_or(&result.run_id);
    let run_dir = output_dir.join(prefix);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create report dir: {}", run_dir.display()))?;

    let trades = export_trades_csv(&result.runs)?;
    write_file(&run_dir.join("trades.csv"), &trades)?;
    write_file(&run_dir.join("statistics.json"), &export_statistics_json(result)?)?;
    write_file(
        &run_dir.join("summary.json"),
        &export_summary_json(result, config)?,
    )?;
    Ok(run_dir)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Fixed-width per-asset table with a pooled total row.
pub fn summary_table(result: &BatchResult) -> String {
    let mut out = String::with_capacity(256 + 96 * result.runs.len());
    let _ = writeln!(
        out,
        "{:<10} {:>6} {:>7} {:>12} {:>8} {:>9} {:>8}",
        "asset", "bars", "trades", "total_pl", "win%", "avg_hold", "holding"
    );
    for run in &result.runs {
        let stats = TradeStatistics::from_ledger(&run.ledger);
        let _ = writeln!(
            out,
            "{:<10} {:>6} {:>7} {:>12.2} {:>7.1}% {:>9.1} {:>8}",
            run.symbol,
            run.bar_count,
            stats.trade_count(),
            stats.total_profit_loss,
            stats.win_rate * 100.0,
            stats.holding_period.overall.mean,
            run.open_position.side.as_str(),
        );
    }
    let total = result.statistics();
    let _ = writeln!(
        out,
        "{:<10} {:>6} {:>7} {:>12.2} {:>7.1}% {:>9.1} {:>8}",
        "TOTAL",
        result.runs.iter().map(|r| r.bar_count).sum::<usize>(),
        total.trade_count(),
        total.total_profit_loss,
        total.win_rate * 100.0,
        total.holding_period.overall.mean,
        "",
    );
    if !result.gaps.is_empty() {
        let _ = writeln!(out, "no data: {}", result.gaps.join(", "));
    }
    for failure in &result.failures {
        let _ = writeln!(out, "failed: {} ({})", failure.symbol, failure.error);
    }
    out
}
