//! Instrument specifications and per-category evaluation policy
//!
//! An `InstrumentSpec` is static configuration resolved once at config load;
//! the engine never string-matches instrument names at evaluation time.

use chrono::{DateTime, FixedOffset, Timelike, Utc, Weekday};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::candles::Interval;

/// Instrument category; drives timeframe choice, risk sizing, re-entry
/// eligibility and market-hours gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Forex")]
    Forex,
    #[serde(rename = "Metals/Energy")]
    MetalsEnergy,
    #[serde(rename = "Crypto Scalping")]
    CryptoScalping,
    #[serde(rename = "Intraday IndianMarket")]
    IndianIntraday,
    #[serde(rename = "NSE Live")]
    IndianFutures,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Forex => "Forex",
            Category::MetalsEnergy => "Metals/Energy",
            Category::CryptoScalping => "Crypto Scalping",
            Category::IndianIntraday => "Intraday IndianMarket",
            Category::IndianFutures => "NSE Live",
        }
    }

    /// Timeframe plan for this category
    pub fn timeframe_plan(&self) -> TimeframePlan {
        match self {
            // Standard swing plan: Daily trend, 4H momentum, 1H entry
            Category::Forex | Category::MetalsEnergy => TimeframePlan {
                trend: Interval::Day1,
                momentum: Interval::Hour4,
                entry: Interval::Hour1,
                trend_label: "Daily",
                momentum_label: "4H MOM",
                entry_label: "1H Entry",
            },
            // Intraday plan: 4H trend, 1H momentum, 15m entry
            Category::CryptoScalping | Category::IndianIntraday | Category::IndianFutures => {
                TimeframePlan {
                    trend: Interval::Hour4,
                    momentum: Interval::Hour1,
                    entry: Interval::Minute15,
                    trend_label: "4H Trend",
                    momentum_label: "1H MOM",
                    entry_label: "15m Entry",
                }
            }
        }
    }

    /// Stop distance multiplier applied to ATR-14
    pub fn sl_atr_multiplier(&self) -> f64 {
        match self {
            // Highly volatile category gets a wider stop
            Category::CryptoScalping => 2.0,
            _ => 1.5,
        }
    }

    /// Take-profit ratios applied to the stop distance
    pub fn tp_ratios(&self) -> [f64; 3] {
        match self {
            // Scalping takes profit earlier
            Category::CryptoScalping => [1.0, 2.0, 3.0],
            _ => [1.5, 3.0, 5.0],
        }
    }

    /// Whether the Fibonacci re-entry scorer runs for open positions
    pub fn reentry_enabled(&self) -> bool {
        matches!(self, Category::IndianFutures)
    }

    /// Whether entries are restricted to the Indian cash session
    pub fn market_hours_gated(&self) -> bool {
        matches!(self, Category::IndianIntraday | Category::IndianFutures)
    }

    /// Whether the volume / opening-range / pre-market entry filters apply
    pub fn session_filters_enabled(&self) -> bool {
        matches!(self, Category::IndianFutures)
    }

    /// Whether the single-bar price spike check is skipped
    pub fn spike_check_exempt(&self) -> bool {
        matches!(self, Category::CryptoScalping)
    }
}

/// Rule profile resolved at configuration load
///
/// `Relaxed` loosens the trend/momentum/RSI/MACD rules for instruments whose
/// 200-period EMA behavior is unreliable (majors like BTC and ETH).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleProfile {
    #[default]
    Standard,
    Relaxed,
}

/// Trend/momentum/entry intervals plus display labels for one category
#[derive(Debug, Clone, Copy)]
pub struct TimeframePlan {
    pub trend: Interval,
    pub momentum: Interval,
    pub entry: Interval,
    pub trend_label: &'static str,
    pub momentum_label: &'static str,
    pub entry_label: &'static str,
}

/// Static per-instrument configuration, immutable for the process lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSpec {
    /// Display name; also the position-store key
    pub name: String,
    /// Quote symbol used against the data collaborator
    pub symbol: String,
    /// Minimum price increment (pip/tick)
    pub tick_size: f64,
    pub category: Category,
    #[serde(default)]
    pub rule_profile: RuleProfile,
    /// Futures base symbol for instruments whose tradable contract rolls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub futures_base: Option<String>,
}

impl InstrumentSpec {
    pub fn new(name: &str, symbol: &str, tick_size: f64, category: Category) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            tick_size,
            category,
            rule_profile: RuleProfile::Standard,
            futures_base: None,
        }
    }

    pub fn relaxed(mut self) -> Self {
        self.rule_profile = RuleProfile::Relaxed;
        self
    }

    pub fn with_futures_base(mut self, base: &str) -> Self {
        self.futures_base = Some(base.to_string());
        self
    }
}

/// IST offset (+05:30); the Indian session has no DST
pub fn ist_offset() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("valid IST offset")
}

/// Whether `now` falls inside the Indian cash session (09:15-15:30 IST, Mon-Fri)
pub fn is_indian_session_open(now: DateTime<Utc>) -> bool {
    let local = now.with_timezone(&ist_offset());
    match local.weekday() {
        Weekday::Sat | Weekday::Sun => return false,
        _ => {}
    }
    let minutes = (local.hour() * 60 + local.minute()) as i32;
    let open = 9 * 60 + 15;
    let close = 15 * 60 + 30;
    minutes >= open && minutes <= close
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timeframe_plans() {
        let forex = Category::Forex.timeframe_plan();
        assert_eq!(forex.trend, Interval::Day1);
        assert_eq!(forex.entry, Interval::Hour1);

        let nse = Category::IndianFutures.timeframe_plan();
        assert_eq!(nse.trend, Interval::Hour4);
        assert_eq!(nse.entry, Interval::Minute15);
    }

    #[test]
    fn test_category_policies() {
        assert!(Category::IndianFutures.reentry_enabled());
        assert!(!Category::Forex.reentry_enabled());
        assert!(Category::CryptoScalping.spike_check_exempt());
        assert!(Category::IndianFutures.session_filters_enabled());
        assert_eq!(Category::CryptoScalping.tp_ratios(), [1.0, 2.0, 3.0]);
        assert!(Category::CryptoScalping.sl_atr_multiplier() > Category::Forex.sl_atr_multiplier());
    }

    #[test]
    fn test_indian_session_window() {
        // 2026-01-05 is a Monday; 10:00 IST == 04:30 UTC
        let open = Utc.with_ymd_and_hms(2026, 1, 5, 4, 30, 0).unwrap();
        assert!(is_indian_session_open(open));

        // 08:00 IST == 02:30 UTC, before the open
        let early = Utc.with_ymd_and_hms(2026, 1, 5, 2, 30, 0).unwrap();
        assert!(!is_indian_session_open(early));

        // Sunday
        let sunday = Utc.with_ymd_and_hms(2026, 1, 4, 4, 30, 0).unwrap();
        assert!(!is_indian_session_open(sunday));
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&Category::MetalsEnergy).unwrap();
        assert_eq!(json, "\"Metals/Energy\"");
        let back: Category = serde_json::from_str("\"NSE Live\"").unwrap();
        assert_eq!(back, Category::IndianFutures);
    }
}
