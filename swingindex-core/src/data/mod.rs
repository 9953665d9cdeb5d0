//! Market data: the `MarketDataSource` trait and its implementations.

pub mod csv_source;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use csv_source::{read_csv, write_csv, CsvDataSource};
pub use provider::{resample_weekly, DataError, FetchBatch, Granularity, MarketDataSource};
pub use synthetic::SyntheticDataSource;
pub use yahoo::YahooDataSource;
