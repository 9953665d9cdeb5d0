//! Seeded random-walk data source for offline runs and tests.
//!
//! Each symbol gets its own `StdRng`, seeded with a BLAKE3 hash of the master
//! seed and the symbol, so a symbol's series does not depend on which other
//! symbols are requested or in what order.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{finish_series, DataError, Granularity, MarketDataSource};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct SyntheticDataSource {
    seed: u64,
    start_price: f64,
    /// Maximum absolute close-to-close return per bar.
    volatility: f64,
}

impl SyntheticDataSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start_price: 100.0,
            volatility: 0.03,
        }
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Generate the series without range validation.
    pub fn generate(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> Vec<Bar> {
        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));
        let step = match granularity {
            Granularity::Daily => Duration::days(1),
            Granularity::Weekly => Duration::days(7),
        };
        let vol = self.volatility;
        let mut bars = Vec::new();
        let mut close = self.start_price;
        let mut date = start;

        while date <= end {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                let open = close * (1.0 + rng.gen_range(-vol / 4.0..=vol / 4.0));
                close = (open * (1.0 + rng.gen_range(-vol..=vol))).max(0.01);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..=vol / 2.0));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..=vol / 2.0));
                bars.push(Bar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume: rng.gen_range(10_000..1_000_000),
                });
            }
            date += step;
        }
        bars
    }
}

impl MarketDataSource for SyntheticDataSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> Result<Vec<Bar>, DataError> {
        finish_series(symbol, self.generate(symbol, start, end, granularity))
    }
}
