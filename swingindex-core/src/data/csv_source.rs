//! CSV directory source: one `<SYMBOL>.csv` per symbol with columns
//! `date,open,high,low,close,volume`.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{finish_series, resample_weekly, DataError, Granularity, MarketDataSource};
use crate::domain::Bar;

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: u64,
}

impl From<CsvRow> for Bar {
    fn from(r: CsvRow) -> Self {
        Bar {
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvDataSource {
    dir: PathBuf,
}

impl CsvDataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Every symbol with a CSV file in the directory, sorted.
    pub fn list_symbols(&self) -> Result<Vec<String>, DataError> {
        let mut symbols = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    symbols.push(stem.to_string());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}

/// Read every row of a bar CSV file.
pub fn read_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        bars.push(row?.into());
    }
    Ok(bars)
}

/// Write bars as `<dir>/<symbol>.csv`, returning the file path.
pub fn write_csv(dir: &Path, symbol: &str, bars: &[Bar]) -> Result<PathBuf, DataError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{symbol}.csv"));
    let mut writer = csv::Writer::from_writer(File::create(&path)?);
    for bar in bars {
        writer.serialize(CsvRow {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })?;
    }
    writer.flush()?;
    Ok(path)
}

impl MarketDataSource for CsvDataSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            debug!(symbol, path = %path.display(), "no CSV file");
            return Err(DataError::NoBars {
                symbol: symbol.to_string(),
            });
        }
        let mut bars: Vec<Bar> = read_csv(&path)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        if granularity == Granularity::Weekly {
            bars = resample_weekly(&bars);
        }
        finish_series(symbol, bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn write_fixture(dir: &Path) {
        std::fs::write(
            dir.join("KO.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-02,60.0,61.0,59.5,60.5,1000\n\
             2024-01-03,60.5,62.0,60.0,61.5,1200\n\
             2024-01-04,61.5,61.8,60.2,60.4,900\n",
        )
        .unwrap();
    }

    #[test]
    fn reads_and_filters_range() {
        let tmp = tempfile::tempdir().unwrap();
        write_fixture(tmp.path());
        let source = CsvDataSource::new(tmp.path());
        let bars = source
            .fetch_symbol("KO", d(1, 3), d(1, 31), Granularity::Daily)
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, d(1, 3));
        assert_eq!(bars[0].volume, 1200);
    }

    #[test]
    fn missing_file_is_data_gap() {
        let tmp = tempfile::tempdir().unwrap();
        let source = CsvDataSource::new(tmp.path());
        let err = source
            .fetch_symbol("NOPE", d(1, 1), d(1, 31), Granularity::Daily)
            .unwrap_err();
        assert!(err.is_data_gap());
    }

    #[test]
    fn empty_range_is_data_gap() {
        let tmp = tempfile::tempdir().unwrap();
        write_fixture(tmp.path());
        let source = CsvDataSource::new(tmp.path());
        let err = source
            .fetch_symbol("KO", d(3, 1), d(3, 31), Granularity::Daily)
            .unwrap_err();
        assert!(err.is_data_gap());
    }

    #[test]
    fn malformed_row_is_csv_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("BAD.csv"),
            "date,open,high,low,close,volume\n2024-01-02,abc,1,1,1,1\n",
        )
        .unwrap();
        let source = CsvDataSource::new(tmp.path());
        let err = source
            .fetch_symbol("BAD", d(1, 1), d(1, 31), Granularity::Daily)
            .unwrap_err();
        assert!(matches!(err, DataError::Csv(_)));
    }

    #[test]
    fn write_then_list() {
        let tmp = tempfile::tempdir().unwrap();
        let bars = vec![Bar::new(d(1, 2), 10.0, 11.0, 9.0, 10.5)];
        write_csv(tmp.path(), "PEP", &bars).unwrap();
        write_fixture(tmp.path());
        let source = CsvDataSource::new(tmp.path());
        assert_eq!(source.list_symbols().unwrap(), vec!["KO", "PEP"]);
        let back = read_csv(&source.path_for("PEP")).unwrap();
        assert_eq!(back, bars);
    }
}
