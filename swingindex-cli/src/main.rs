//! Swing Index CLI: run, download and inspect commands.
//!
//! Commands:
//! - `run`: execute a batch backtest from a TOML config file
//! - `download`: fetch daily bars from Yahoo Finance into a CSV directory
//! - `inspect`: print the enriched indicator series for one CSV file

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use swingindex_core::data::{read_csv, write_csv, Granularity, MarketDataSource, YahooDataSource};
use swingindex_core::domain::validate_series;
use swingindex_core::engine::{EnrichedBar, IndicatorEngine, StrategyConstants};
use swingindex_runner::{build_source, run_batch, save_reports, summary_table, BacktestConfig};

#[derive(Parser)]
#[command(
    name = "swingindex",
    about = "Swing Index System backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for reports. Overrides `[output] dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Download daily bars from Yahoo Finance into `<SYMBOL>.csv` files.
    Download {
        /// Symbols to download (e.g., SPY QQQ AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 10 years ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Destination directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,
    },
    /// Print the enriched series (ASI, swing points, ADXR gates) for a CSV file.
    Inspect {
        /// Bar CSV with columns date,open,high,low,close,volume.
        #[arg(long)]
        csv: PathBuf,

        /// Take strategy constants from this config's `[strategy]` section.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Only print the last N bars.
        #[arg(long)]
        tail: Option<usize>,

        /// Emit one JSON object per bar instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output_dir } => run_backtest_cmd(config, output_dir),
        Commands::Download {
            symbols,
            start,
            end,
            out_dir,
        } => run_download(symbols, start, end, out_dir),
        Commands::Inspect {
            csv,
            config,
            tail,
            json,
        } => run_inspect(csv, config, tail, json),
    }
}

fn run_backtest_cmd(config_path: PathBuf, output_dir: Option<PathBuf>) -> Result<()> {
    let config = BacktestConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let source = build_source(&config)?;
    let result = run_batch(&config, source.as_ref())?;

    print!("{}", summary_table(&result));

    let output_dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
    let run_dir = save_reports(&result, &config, &output_dir)?;
    println!("Reports saved to: {}", run_dir.display());
    Ok(())
}

fn parse_date(value: Option<&str>, default: NaiveDate) -> Result<NaiveDate> {
    match value {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD")),
        None => Ok(default),
    }
}

fn run_download(
    symbols: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    out_dir: PathBuf,
) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let start_date = parse_date(start.as_deref(), today - chrono::Duration::days(365 * 10))?;
    let end_date = parse_date(end.as_deref(), today)?;
    if start_date > end_date {
        bail!("--start {start_date} is after --end {end_date}");
    }

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let source = YahooDataSource::new()?;
    let batch = source.fetch(&symbols, start_date, end_date, Granularity::Daily);

    for (symbol, bars) in &batch.bars {
        let path = write_csv(&out_dir, symbol, bars)?;
        info!(symbol = %symbol, bars = bars.len(), path = %path.display(), "saved");
    }
    for symbol in &batch.gaps {
        eprintln!("No data for {symbol} in {start_date}..{end_date}");
    }
    for (symbol, err) in &batch.failures {
        eprintln!("Error for {symbol}: {err}");
    }
    println!(
        "Downloaded {}/{} symbols to {}",
        batch.bars.len(),
        batch.total(),
        out_dir.display()
    );

    if !batch.failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_inspect(
    csv_path: PathBuf,
    config_path: Option<PathBuf>,
    tail: Option<usize>,
    json: bool,
) -> Result<()> {
    let constants = match config_path {
        Some(path) => BacktestConfig::from_file(&path)?.strategy,
        None => StrategyConstants::default(),
    };
    let bars = read_csv(&csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;
    validate_series(&bars).with_context(|| format!("invalid bars in {}", csv_path.display()))?;

    let engine = IndicatorEngine::new(constants)?;
    let enriched = engine.compute(&bars)?;
    let skip = tail.map_or(0, |n| enriched.len().saturating_sub(n));

    if json {
        for bar in &enriched[skip..] {
            println!("{}", serde_json::to_string(bar)?);
        }
        return Ok(());
    }

    println!(
        "{:>5} {:<10} {:>10} {:>11} {:>11} {:>10} {:>11} {:>10} {:>7} {:>4} {:>4}",
        "idx", "date", "close", "asi", "hsp", "hip", "lsp", "lop", "adxr", "buy", "sell"
    );
    for (i, bar) in enriched.iter().enumerate().skip(skip) {
        println!("{}", format_row(i, bar));
    }
    Ok(())
}

fn format_row(index: usize, e: &EnrichedBar) -> String {
    let cell = |v: Option<f64>, width: usize, prec: usize| match v {
        Some(v) => format!("{v:>width$.prec$}"),
        None => format!("{:>width$}", "-"),
    };
    let flag = |b: bool| if b { "y" } else { "." };
    format!(
        "{:>5} {:<10} {:>10.2} {} {} {} {} {} {} {:>4} {:>4}",
        index,
        e.bar.date.to_string(),
        e.bar.close,
        cell(e.asi, 11, 2),
        cell(e.hsp, 11, 2),
        cell(e.hip, 10, 2),
        cell(e.lsp, 11, 2),
        cell(e.lop, 10, 2),
        cell(e.adxr, 7, 2),
        flag(e.adxr_buy_gate),
        flag(e.adxr_sell_gate),
    )
}
