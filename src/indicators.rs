//! Indicator arithmetic over a price series
//!
//! MACD (12/26/9), EMA-200, RSI-14 and ATR-14, plus the per-timeframe
//! snapshot taken at the last two closed bars. Warmup positions yield `None`
//! so downstream rules can treat an indicator as absent rather than reading
//! a half-formed value.

use serde::{Deserialize, Serialize};

use crate::candles::CandleSeries;

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const EMA_TREND_PERIOD: usize = 200;
pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;

/// Exponentially weighted moving average with alpha = 2 / (span + 1),
/// seeded on the first value.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut current = values[0];
    out.push(current);
    for &value in &values[1..] {
        current = alpha * value + (1.0 - alpha) * current;
        out.push(current);
    }
    out
}

/// MACD line, signal line and histogram for a close series
pub fn macd(closes: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast = ema(closes, MACD_FAST);
    let slow = ema(closes, MACD_SLOW);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema(&line, MACD_SIGNAL);
    let histogram: Vec<f64> = line.iter().zip(&signal).map(|(l, s)| l - s).collect();
    (line, signal, histogram)
}

/// RSI over simple rolling-mean gains/losses; `None` during warmup
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut out = vec![None; n];
    if n == 0 || period == 0 {
        return out;
    }

    // Deltas are aligned so deltas[i] = closes[i] - closes[i-1]
    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            gains[i] = delta;
        } else {
            losses[i] = -delta;
        }
    }

    for i in period..n {
        let window = (i - period + 1)..=i;
        let avg_gain: f64 = window.clone().map(|j| gains[j]).sum::<f64>() / period as f64;
        let avg_loss: f64 = window.map(|j| losses[j]).sum::<f64>() / period as f64;
        let value = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };
        out[i] = Some(value);
    }
    out
}

/// ATR over a rolling mean of the true range; `None` during warmup
pub fn atr(series: &CandleSeries, period: usize) -> Vec<Option<f64>> {
    let n = series.len();
    let mut out = vec![None; n];
    if n == 0 || period == 0 {
        return out;
    }

    let mut true_ranges = Vec::with_capacity(n);
    for (i, candle) in series.candles.iter().enumerate() {
        let high_low = candle.high - candle.low;
        let tr = if i == 0 {
            high_low
        } else {
            let prev_close = series.candles[i - 1].close;
            high_low
                .max((candle.high - prev_close).abs())
                .max((candle.low - prev_close).abs())
        };
        true_ranges.push(tr);
    }

    for i in (period - 1)..n {
        let sum: f64 = true_ranges[(i + 1 - period)..=i].iter().sum();
        out[i] = Some(sum / period as f64);
    }
    out
}

/// Indicator values for one timeframe, taken at a specific closed bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeSnapshot {
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
    /// Histogram of the bar before the snapshot bar
    pub prev_histogram: f64,
    pub close: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_200: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atr: Option<f64>,
    /// Timestamp of the snapshot (closed) bar
    pub bar_time: chrono::DateTime<chrono::Utc>,
}

/// Compute the snapshot at the last closed bar of a series.
///
/// Returns `None` when the series is too short to hold two closed bars plus
/// the still-forming one.
pub fn compute_snapshot(series: &CandleSeries) -> Option<TimeframeSnapshot> {
    let n = series.len();
    if n < 3 {
        return None;
    }
    let closed = n - 2;
    let prev = n - 3;

    let closes = series.closes();
    let (line, signal, histogram) = macd(&closes);
    let rsi_values = rsi(&closes, RSI_PERIOD);
    let atr_values = atr(series, ATR_PERIOD);

    // A 200-period EMA over fewer bars than its span reads as trend noise;
    // treat it as absent rather than half-formed.
    let ema_200 = if n >= EMA_TREND_PERIOD {
        ema(&closes, EMA_TREND_PERIOD).get(closed).copied()
    } else {
        None
    };

    Some(TimeframeSnapshot {
        macd_line: line[closed],
        signal_line: signal[closed],
        histogram: histogram[closed],
        prev_histogram: histogram[prev],
        close: closes[closed],
        ema_200,
        rsi: rsi_values[closed],
        atr: atr_values[closed],
        bar_time: series.candles[closed].time,
    })
}
