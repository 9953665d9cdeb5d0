//! Yahoo Finance data source.
//!
//! Fetches OHLCV bars from Yahoo's v8 chart API with a blocking client,
//! retrying transient failures with exponential backoff.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. The CSV directory source is the fallback when it is unavailable.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use super::provider::{finish_series, DataError, Granularity, MarketDataSource};
use crate::domain::Bar;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

pub struct YahooDataSource {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooDataSource {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate, granularity: Granularity) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        let interval = match granularity {
            Granularity::Daily => "1d",
            Granularity::Weekly => "1wk",
        };
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval={interval}"
        )
    }

    /// Parse a chart API response body into bars.
    ///
    /// Rows with any missing OHLC field (holidays, halted sessions) are skipped.
    pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<Bar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
            DataError::ResponseFormat(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let result = match (resp.chart.result, resp.chart.error) {
            (Some(result), _) => result,
            (None, Some(err)) if err.code == "Not Found" => {
                return Err(DataError::NoBars {
                    symbol: symbol.to_string(),
                })
            }
            (None, Some(err)) => {
                return Err(DataError::ResponseFormat(format!(
                    "{}: {}",
                    err.code, err.description
                )))
            }
            (None, None) => {
                return Err(DataError::ResponseFormat("empty result with no error".into()))
            }
        };

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormat("result array is empty".into()))?;

        // A symbol with no sessions in range comes back without timestamps.
        let timestamps = match data.timestamp {
            Some(ts) => ts,
            None => {
                return Err(DataError::NoBars {
                    symbol: symbol.to_string(),
                })
            }
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormat("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| DataError::ResponseFormat(format!("invalid timestamp: {ts}")))?;

            let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
            match (
                field(&quote.open),
                field(&quote.high),
                field(&quote.low),
                field(&quote.close),
            ) {
                (Some(open), Some(high), Some(low), Some(close)) => bars.push(Bar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
                }),
                _ => debug!(symbol, %date, "skipping incomplete row"),
            }
        }
        Ok(bars)
    }

    fn fetch_with_retry(&self, symbol: &str, url: &str) -> Result<String, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                std::thread::sleep(delay);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        warn!(symbol, retry_after, "rate limited");
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    // Yahoo answers unknown symbols with 404 and a JSON error body.
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::NoBars {
                            symbol: symbol.to_string(),
                        });
                    }

                    if !status.is_success() {
                        last_error = Some(DataError::Network(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    return resp
                        .text()
                        .map_err(|e| DataError::Network(format!("failed to read body: {e}")));
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::Network(e.to_string()));
                        continue;
                    }
                    return Err(DataError::Network(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Network("max retries exceeded".into())))
    }
}

impl MarketDataSource for YahooDataSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> Result<Vec<Bar>, DataError> {
        let url = Self::chart_url(symbol, start, end, granularity);
        let body = self.fetch_with_retry(symbol, &url)?;
        let bars = Self::parse_chart(symbol, &body)?;
        finish_series(symbol, bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open":   [60.0, null, 61.5],
                        "high":   [61.0, 62.0, 61.8],
                        "low":    [59.5, 60.0, 60.2],
                        "close":  [60.5, 61.5, 60.4],
                        "volume": [1000, 1200, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_chart_and_skips_incomplete_rows() {
        let bars = YahooDataSource::parse_chart("KO", FIXTURE).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].close, 60.5);
        assert_eq!(bars[1].volume, 0);
    }

    #[test]
    fn not_found_is_data_gap() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = YahooDataSource::parse_chart("ZZZZ", body).unwrap_err();
        assert!(err.is_data_gap());
    }

    #[test]
    fn other_error_is_format_change() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        let err = YahooDataSource::parse_chart("KO", body).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormat(_)));
    }

    #[test]
    fn garbage_body_is_format_change() {
        let err = YahooDataSource::parse_chart("KO", "<html>").unwrap_err();
        assert!(matches!(err, DataError::ResponseFormat(_)));
    }

    #[test]
    fn chart_url_interval() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(YahooDataSource::chart_url("KO", d, d, Granularity::Daily).contains("interval=1d"));
        assert!(YahooDataSource::chart_url("KO", d, d, Granularity::Weekly).contains("interval=1wk"));
    }
}
