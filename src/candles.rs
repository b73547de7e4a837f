//! Candle series primitives
//!
//! The engine only ever reads the last two *closed* bars of a series (the
//! still-forming bar is never acted on) plus the very latest bar for live
//! price.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Supported chart intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
}

impl Interval {
    /// Duration of one bar in seconds
    pub fn to_seconds(&self) -> i64 {
        match self {
            Interval::Minute15 => 900,
            Interval::Hour1 => 3600,
            Interval::Hour4 => 14400,
            Interval::Day1 => 86400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute15 => "15m",
            Interval::Hour1 => "1h",
            Interval::Hour4 => "4h",
            Interval::Day1 => "1d",
        }
    }

    /// Interval actually requested from the data collaborator.
    ///
    /// 4H charts are not served natively; they are resampled from 1H.
    pub fn fetch_interval(&self) -> Interval {
        match self {
            Interval::Hour4 => Interval::Hour1,
            other => *other,
        }
    }

    /// Lookback range requested alongside this interval
    pub fn fetch_range(&self) -> &'static str {
        match self {
            Interval::Minute15 => "30d",
            Interval::Hour1 => "1y",
            Interval::Hour4 => "1y",
            Interval::Day1 => "2y",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Validates that the bar geometry is consistent
    pub fn is_valid(&self) -> bool {
        self.high >= self.low
            && self.open >= self.low
            && self.open <= self.high
            && self.close >= self.low
            && self.close <= self.high
            && self.volume >= 0.0
    }

    /// Absolute body size
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Wick above the body
    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Wick below the body
    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }
}

/// Ordered sequence of bars for one timeframe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleSeries {
    pub interval: Interval,
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(interval: Interval, candles: Vec<Candle>) -> Self {
        Self { interval, candles }
    }

    pub fn empty(interval: Interval) -> Self {
        Self {
            interval,
            candles: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// The last closed bar (index -2); the final bar is still forming
    pub fn last_closed(&self) -> Option<&Candle> {
        self.nth_from_end(1)
    }

    /// The bar before the last closed one (index -3)
    pub fn prev_closed(&self) -> Option<&Candle> {
        self.nth_from_end(2)
    }

    /// The very latest bar, including the still-forming one
    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// n bars back from the end (0 = latest)
    pub fn nth_from_end(&self, n: usize) -> Option<&Candle> {
        if self.candles.len() > n {
            self.candles.get(self.candles.len() - 1 - n)
        } else {
            None
        }
    }

    /// Closing prices in order, for the indicator math
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Resample into a coarser interval (open=first, high=max, low=min,
    /// close=last, volume=sum). Buckets align to the epoch, mirroring the
    /// source feed's 4H alignment. Partial trailing buckets are kept: the
    /// final bucket is the still-forming bar.
    pub fn resample(&self, target: Interval) -> CandleSeries {
        let bucket_secs = target.to_seconds();
        let mut out: Vec<Candle> = Vec::new();

        for candle in &self.candles {
            let bucket_start = (candle.time.timestamp() / bucket_secs) * bucket_secs;
            let bucket_time = Utc
                .timestamp_opt(bucket_start, 0)
                .single()
                .unwrap_or(candle.time);

            match out.last_mut() {
                Some(last) if last.time == bucket_time => {
                    last.high = last.high.max(candle.high);
                    last.low = last.low.min(candle.low);
                    last.close = candle.close;
                    last.volume += candle.volume;
                }
                _ => out.push(Candle {
                    time: bucket_time,
                    open: candle.open,
                    high: candle.high,
                    low: candle.low,
                    close: candle.close,
                    volume: candle.volume,
                }),
            }
        }

        CandleSeries::new(target, out)
    }
}

#[cfg(test)]
pub(crate) fn test_candle(ts: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
    Candle {
        time: Utc.timestamp_opt(ts, 0).single().unwrap(),
        open,
        high,
        low,
        close,
        volume,
    }
}
