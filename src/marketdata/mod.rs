//! Market-data collaborator
//!
//! The engine talks to a `QuoteSource` behind a trait so the quote feed can
//! be swapped (or stubbed in tests). Fetches fail soft: after the bounded
//! retries of the supplied `RetryPolicy` the caller receives an empty
//! series and skips the instrument for the cycle.

mod retry;
mod yahoo;

pub use retry::RetryPolicy;
pub use yahoo::YahooChartSource;

use async_trait::async_trait;
use thiserror::Error;

use crate::candles::{CandleSeries, Interval};
use crate::logger::{self, LogTag};

/// Error types for market-data operations
#[derive(Debug, Error)]
pub enum DataError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP {status} from {endpoint}")]
    HttpStatus { endpoint: String, status: u16 },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no data returned for {0}")]
    Empty(String),
}

pub type DataResult<T> = Result<T, DataError>;

/// External quote/candle provider
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch one series; a single attempt, no retries
    async fn fetch(&self, symbol: &str, interval: Interval, range: &str)
        -> DataResult<CandleSeries>;
}

/// Fetch a series with bounded retries, failing soft to an empty series.
///
/// 4H requests are fetched at 1H and resampled. An empty result means
/// "insufficient data, skip this instrument for the cycle".
pub async fn fetch_series(
    source: &dyn QuoteSource,
    symbol: &str,
    interval: Interval,
    policy: &RetryPolicy,
) -> CandleSeries {
    let fetch_interval = interval.fetch_interval();
    let range = interval.fetch_range();

    for attempt in 1..=policy.attempts {
        match source.fetch(symbol, fetch_interval, range).await {
            Ok(series) if !series.is_empty() => {
                let series = if fetch_interval != interval {
                    series.resample(interval)
                } else {
                    series
                };
                logger::debug(
                    LogTag::Data,
                    &format!(
                        "Fetched {} bars for {} ({})",
                        series.len(),
                        symbol,
                        interval
                    ),
                );
                return series;
            }
            Ok(_) => {
                logger::warning(
                    LogTag::Data,
                    &format!(
                        "Empty data for {} ({}) on attempt {}/{}",
                        symbol, interval, attempt, policy.attempts
                    ),
                );
            }
            Err(e) => {
                logger::warning(
                    LogTag::Data,
                    &format!(
                        "Error fetching {} ({}) on attempt {}/{}: {}",
                        symbol, interval, attempt, policy.attempts, e
                    ),
                );
            }
        }

        if attempt < policy.attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    CandleSeries::empty(interval)
}
