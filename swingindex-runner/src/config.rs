//! TOML backtest configuration.
//!
//! ```toml
//! [backtest]
//! symbols = ["SPY", "QQQ"]
//! start_date = "2015-01-02"
//! end_date = "2024-12-31"
//!
//! [strategy]
//! adxr_period = 14
//!
//! [data]
//! source = "csv"
//! csv_dir = "data"
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use swingindex_core::data::Granularity;
use swingindex_core::engine::{ConstantsError, RecomputeMode, StrategyConstants};

/// Unique identifier for a run (content-addressable hash of the config).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid strategy constants: {0}")]
    Constants(#[from] ConstantsError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategyConstants,
    #[serde(default)]
    pub capital: Option<CapitalSection>,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    /// Symbol universe. Empty means "every symbol the source lists".
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Run on a random subset of this many symbols.
    #[serde(default)]
    pub sample_size: Option<usize>,
    /// Seed for symbol sampling.
    #[serde(default)]
    pub seed: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default = "default_shares")]
    pub shares_per_trade: f64,
    #[serde(default)]
    pub recompute: RecomputeMode,
}

fn default_shares() -> f64 {
    1.0
}

/// Margin limits for [`crate::capital::MarginCapitalManager`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalSection {
    pub total_capital: f64,
    /// Fraction of total capital that may be committed across all trades.
    #[serde(default = "default_margin")]
    pub margin: f64,
    /// Fraction of total capital a single trade may commit.
    #[serde(default = "default_margin_per_asset")]
    pub margin_per_asset: f64,
}

fn default_margin() -> f64 {
    0.6
}

fn default_margin_per_asset() -> f64 {
    0.15
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    #[default]
    Csv,
    Yahoo,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub source: DataSourceKind,
    pub csv_dir: PathBuf,
    pub synthetic_seed: u64,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            source: DataSourceKind::Csv,
            csv_dir: PathBuf::from("data"),
            synthetic_seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
        }
    }
}

impl BacktestConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;

        let bt = &self.backtest;
        if bt.start_date > bt.end_date {
            return Err(ConfigError::Invalid(format!(
                "start_date {} is after end_date {}",
                bt.start_date, bt.end_date
            )));
        }
        if !(bt.shares_per_trade.is_finite() && bt.shares_per_trade > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "shares_per_trade must be positive, got {}",
                bt.shares_per_trade
            )));
        }
        if bt.sample_size == Some(0) {
            return Err(ConfigError::Invalid("sample_size must be at least 1".into()));
        }
        if bt.symbols.is_empty() && self.data.source != DataSourceKind::Csv {
            return Err(ConfigError::Invalid(
                "symbols may only be omitted for the csv source".into(),
            ));
        }

        if let Some(capital) = &self.capital {
            if !(capital.total_capital.is_finite() && capital.total_capital > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "total_capital must be positive, got {}",
                    capital.total_capital
                )));
            }
            for (name, value) in [
                ("margin", capital.margin),
                ("margin_per_asset", capital.margin_per_asset),
            ] {
                if !(value > 0.0 && value <= 1.0) {
                    return Err(ConfigError::Invalid(format!(
                        "{name} must be in (0, 1], got {value}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the config's JSON form.
    ///
    /// Two runs with identical configs share a run id.
    pub fn run_id(&self) -> Result<RunId, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        let hash = blake3::hash(json.as_bytes());
        Ok(hash.to_hex().to_string())
    }
}
