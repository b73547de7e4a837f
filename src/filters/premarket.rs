//! Pre-market global cues
//!
//! Before the Indian session opens, overnight moves in global markets color
//! the first trades of the day. The reading aggregates US and Asian index
//! closes, an index-future proxy, crude oil and the dollar index into one
//! weighted score; the engine only consumes the overall sentiment.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::candles::Interval;
use crate::logger::{self, LogTag};
use crate::marketdata::{QuoteSource, RetryPolicy};
use crate::strategy::Bias;
use crate::utils::{atomic_write_json, load_json_or_none};

const US_MARKETS: [(&str, &str); 3] = [
    ("^GSPC", "S&P 500"),
    ("^IXIC", "Nasdaq"),
    ("^DJI", "Dow Jones"),
];
const ASIAN_MARKETS: [(&str, &str); 2] = [("^N225", "Nikkei 225"), ("^HSI", "Hang Seng")];
const INDEX_PROXY: (&str, &str) = ("^NSEI", "Nifty 50");
const CRUDE_OIL: (&str, &str) = ("CL=F", "Crude Oil");
const DOLLAR_INDEX: (&str, &str) = ("DX-Y.NYB", "Dollar Index");

const WEIGHT_US: f64 = 0.35;
const WEIGHT_ASIA: f64 = 0.25;
const WEIGHT_PROXY: f64 = 0.25;
const WEIGHT_CRUDE: f64 = 0.10;
const WEIGHT_DOLLAR: f64 = 0.05;

/// Overall score beyond this magnitude resolves to a directional sentiment
const SENTIMENT_THRESHOLD: f64 = 0.15;

/// One market's overnight reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueReading {
    pub name: String,
    pub last: f64,
    pub change_pct: f64,
    pub sentiment: Bias,
}

/// The aggregated pre-market report, cached to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremarketReport {
    pub timestamp: DateTime<Utc>,
    pub us_markets: Vec<CueReading>,
    pub asian_markets: Vec<CueReading>,
    pub index_proxy: Option<CueReading>,
    pub crude_oil: Option<CueReading>,
    pub dollar_index: Option<CueReading>,
    pub overall_sentiment: Bias,
    pub sentiment_score: f64,
}

fn classify(change_pct: f64, threshold: f64, inverted: bool) -> Bias {
    let effective = if inverted { -change_pct } else { change_pct };
    if effective > threshold {
        Bias::Bullish
    } else if effective < -threshold {
        Bias::Bearish
    } else {
        Bias::Neutral
    }
}

fn score_contribution(readings: &[CueReading], weight: f64) -> f64 {
    if readings.is_empty() {
        return 0.0;
    }
    let per_market = weight / readings.len() as f64;
    readings
        .iter()
        .map(|r| match r.sentiment {
            Bias::Bullish => per_market,
            Bias::Bearish => -per_market,
            Bias::Neutral => 0.0,
        })
        .sum()
}

/// Compute the weighted overall sentiment from the individual readings
pub fn aggregate_sentiment(report: &PremarketReport) -> (Bias, f64) {
    let mut score = 0.0;
    score += score_contribution(&report.us_markets, WEIGHT_US);
    score += score_contribution(&report.asian_markets, WEIGHT_ASIA);
    score += score_contribution(report.index_proxy.as_slice(), WEIGHT_PROXY);
    score += score_contribution(report.crude_oil.as_slice(), WEIGHT_CRUDE);
    score += score_contribution(report.dollar_index.as_slice(), WEIGHT_DOLLAR);

    let sentiment = if score > SENTIMENT_THRESHOLD {
        Bias::Bullish
    } else if score < -SENTIMENT_THRESHOLD {
        Bias::Bearish
    } else {
        Bias::Neutral
    };
    (sentiment, score)
}

/// Cached provider; refetches when the stored report goes stale
pub struct PremarketProvider {
    path: PathBuf,
    max_age: Duration,
}

impl PremarketProvider {
    pub fn new(path: PathBuf, max_age_hours: i64) -> Self {
        Self {
            path,
            max_age: Duration::hours(max_age_hours.max(1)),
        }
    }

    /// Current overall sentiment, refreshing the cache when needed.
    /// Soft-fails to `None` so a cue outage never blocks the engine.
    pub async fn sentiment(
        &self,
        source: &dyn QuoteSource,
        policy: &RetryPolicy,
    ) -> Option<Bias> {
        if let Some(report) = self.load_fresh() {
            return Some(report.overall_sentiment);
        }

        logger::info(LogTag::Premarket, "Refreshing pre-market global cues...");
        let report = self.fetch(source, policy).await?;
        logger::info(
            LogTag::Premarket,
            &format!(
                "Pre-market sentiment: {} (score {:+.3})",
                report.overall_sentiment, report.sentiment_score
            ),
        );
        if let Err(e) = atomic_write_json(&self.path, &report) {
            logger::warning(
                LogTag::Premarket,
                &format!("Failed to cache pre-market cues: {}", e),
            );
        }
        Some(report.overall_sentiment)
    }

    fn load_fresh(&self) -> Option<PremarketReport> {
        let report: PremarketReport = load_json_or_none(&self.path)?;
        if Utc::now().signed_duration_since(report.timestamp) < self.max_age {
            Some(report)
        } else {
            None
        }
    }

    async fn fetch(&self, source: &dyn QuoteSource, policy: &RetryPolicy) -> Option<PremarketReport> {
        let mut us_markets = Vec::new();
        for (symbol, name) in US_MARKETS {
            if let Some(reading) = fetch_cue(source, policy, symbol, name, 0.5, false).await {
                us_markets.push(reading);
            }
        }

        let mut asian_markets = Vec::new();
        for (symbol, name) in ASIAN_MARKETS {
            if let Some(reading) = fetch_cue(source, policy, symbol, name, 0.5, false).await {
                asian_markets.push(reading);
            }
        }

        let index_proxy =
            fetch_cue(source, policy, INDEX_PROXY.0, INDEX_PROXY.1, 0.5, false).await;
        let crude_oil = fetch_cue(source, policy, CRUDE_OIL.0, CRUDE_OIL.1, 2.0, false).await;
        // A strengthening dollar reads bearish for the Indian session
        let dollar_index =
            fetch_cue(source, policy, DOLLAR_INDEX.0, DOLLAR_INDEX.1, 0.5, true).await;

        if us_markets.is_empty() && asian_markets.is_empty() && index_proxy.is_none() {
            logger::warning(LogTag::Premarket, "No pre-market cues available");
            return None;
        }

        let mut report = PremarketReport {
            timestamp: Utc::now(),
            us_markets,
            asian_markets,
            index_proxy,
            crude_oil,
            dollar_index,
            overall_sentiment: Bias::Neutral,
            sentiment_score: 0.0,
        };
        let (sentiment, score) = aggregate_sentiment(&report);
        report.overall_sentiment = sentiment;
        report.sentiment_score = (score * 1000.0).round() / 1000.0;
        Some(report)
    }

    /// The cached report regardless of freshness (dashboard display)
    pub fn cached_report(&self) -> Option<PremarketReport> {
        load_json_or_none(&self.path)
    }
}

async fn fetch_cue(
    source: &dyn QuoteSource,
    policy: &RetryPolicy,
    symbol: &str,
    name: &str,
    threshold: f64,
    inverted: bool,
) -> Option<CueReading> {
    let series = crate::marketdata::fetch_series(source, symbol, Interval::Day1, policy).await;
    let last = series.latest()?.close;
    let prev = series.nth_from_end(1)?.close;
    if prev <= 0.0 {
        return None;
    }
    let change_pct = (last - prev) / prev * 100.0;
    Some(CueReading {
        name: name.to_string(),
        last,
        change_pct,
        sentiment: classify(change_pct, threshold, inverted),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(name: &str, change_pct: f64, sentiment: Bias) -> CueReading {
        CueReading {
            name: name.to_string(),
            last: 100.0,
            change_pct,
            sentiment,
        }
    }

    fn empty_report() -> PremarketReport {
        PremarketReport {
            timestamp: Utc::now(),
            us_markets: vec![],
            asian_markets: vec![],
            index_proxy: None,
            crude_oil: None,
            dollar_index: None,
            overall_sentiment: Bias::Neutral,
            sentiment_score: 0.0,
        }
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(0.8, 0.5, false), Bias::Bullish);
        assert_eq!(classify(-0.8, 0.5, false), Bias::Bearish);
        assert_eq!(classify(0.3, 0.5, false), Bias::Neutral);
        // Inverted: a rising dollar is bearish
        assert_eq!(classify(0.8, 0.5, true), Bias::Bearish);
    }

    #[test]
    fn test_all_bullish_aggregates_bullish() {
        let mut report = empty_report();
        report.us_markets = vec![
            reading("S&P 500", 1.0, Bias::Bullish),
            reading("Nasdaq", 1.2, Bias::Bullish),
        ];
        report.asian_markets = vec![reading("Nikkei 225", 0.9, Bias::Bullish)];
        report.index_proxy = Some(reading("Nifty 50", 0.7, Bias::Bullish));

        let (sentiment, score) = aggregate_sentiment(&report);
        assert_eq!(sentiment, Bias::Bullish);
        assert!((score - (0.35 + 0.25 + 0.25)).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_cues_stay_neutral() {
        let mut report = empty_report();
        report.us_markets = vec![reading("S&P 500", 1.0, Bias::Bullish)];
        report.asian_markets = vec![reading("Hang Seng", -1.0, Bias::Bearish)];
        report.index_proxy = Some(reading("Nifty 50", 0.1, Bias::Neutral));

        let (sentiment, score) = aggregate_sentiment(&report);
        assert_eq!(sentiment, Bias::Neutral);
        assert!((score - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_proxy_alone_can_tip_sentiment() {
        let mut report = empty_report();
        report.index_proxy = Some(reading("Nifty 50", -1.4, Bias::Bearish));
        let (sentiment, score) = aggregate_sentiment(&report);
        assert_eq!(sentiment, Bias::Bearish);
        assert!((score + 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_report_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("premarket.json");
        let mut report = empty_report();
        report.us_markets = vec![reading("S&P 500", 1.0, Bias::Bullish)];
        atomic_write_json(&path, &report).unwrap();

        let provider = PremarketProvider::new(path, 24);
        let cached = provider.cached_report().unwrap();
        assert_eq!(cached.us_markets.len(), 1);
        assert_eq!(cached.us_markets[0].sentiment, Bias::Bullish);
    }
}
