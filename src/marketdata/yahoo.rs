//! Yahoo Finance v8 chart API client
//!
//! Typed response structs mirror only the fields the engine reads; quote
//! arrays carry nulls for halted bars, which are skipped on conversion.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{DataError, DataResult, QuoteSource};
use crate::candles::{Candle, CandleSeries, Interval};

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
// Browser UA keeps the public chart endpoint from rate-limiting the client
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Deserialize, Debug)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Deserialize, Debug)]
struct ChartQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

pub struct YahooChartSource {
    client: Client,
}

impl YahooChartSource {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn convert(result: ChartResult, interval: Interval, symbol: &str) -> DataResult<CandleSeries> {
        let timestamps = result
            .timestamp
            .ok_or_else(|| DataError::Empty(symbol.to_string()))?;
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::Malformed("missing quote block".to_string()))?;

        let mut candles = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.iter().enumerate() {
            let bar = (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
            );
            if let (Some(open), Some(high), Some(low), Some(close)) = bar {
                let time = Utc
                    .timestamp_opt(*ts, 0)
                    .single()
                    .ok_or_else(|| DataError::Malformed(format!("bad timestamp {}", ts)))?;
                let candle = Candle {
                    time,
                    open,
                    high,
                    low,
                    close,
                    volume: quote.volume.get(i).copied().flatten().unwrap_or(0.0),
                };
                if candle.is_valid() {
                    candles.push(candle);
                }
            }
        }

        if candles.is_empty() {
            return Err(DataError::Empty(symbol.to_string()));
        }
        Ok(CandleSeries::new(interval, candles))
    }
}

impl Default for YahooChartSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for YahooChartSource {
    async fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        range: &str,
    ) -> DataResult<CandleSeries> {
        let url = format!(
            "{}/{}?interval={}&range={}",
            CHART_BASE_URL,
            symbol,
            interval.as_str(),
            range
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| DataError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                endpoint: url,
                status: status.as_u16(),
            });
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| DataError::Malformed(e.to_string()))?;

        if let Some(error) = body.chart.error {
            if !error.is_null() {
                return Err(DataError::Request(error.to_string()));
            }
        }

        let result = body
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| DataError::Empty(symbol.to_string()))?;

        Self::convert(result, interval, symbol)
    }
}
