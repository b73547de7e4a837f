//! Fibonacci re-entry scoring
//!
//! While a position is open and its category allows scale-ins, each cycle
//! scores the current pullback against the retracement ladder between the
//! entry price and the swing extreme on the pullback side. Opportunities are
//! transient: they either fire a notification or are discarded.

use serde::{Deserialize, Serialize};

use crate::candles::CandleSeries;
use crate::indicators::TimeframeSnapshot;
use crate::positions::{Direction, Position};
use crate::utils::format_price;

/// The four standard retracement ratios
pub const FIB_RATIOS: [(f64, &str); 4] = [
    (0.236, "23.6%"),
    (0.382, "38.2%"),
    (0.500, "50.0%"),
    (0.618, "61.8%"),
];

/// Wick must exceed this multiple of the candle body to count as rejection
pub const REJECTION_WICK_RATIO: f64 = 2.0;

/// Tuning for the re-entry scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReentryConfig {
    /// Ignore pullbacks smaller than this many ticks (noise)
    pub min_pullback_ticks: f64,
    /// Ignore pullbacks beyond this many ticks (move has reversed)
    pub max_pullback_ticks: f64,
    /// Entry-timeframe bars examined for the swing extreme
    pub lookback_bars: usize,
    /// Price counts as "at" a level within this many ticks
    pub level_tolerance_ticks: f64,
    /// Minimum strength score to surface an opportunity
    pub min_strength: u8,
    /// Minimum risk:reward (distance to TP1 over distance to the stop)
    pub min_risk_reward: f64,
}

impl Default for ReentryConfig {
    fn default() -> Self {
        Self {
            min_pullback_ticks: 20.0,
            max_pullback_ticks: 400.0,
            lookback_bars: 20,
            level_tolerance_ticks: 10.0,
            min_strength: 55,
            min_risk_reward: 1.5,
        }
    }
}

/// A transient scale-in candidate; recomputed every cycle, never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReentryOpportunity {
    /// "ADD_TO_BUY" or "ADD_TO_SELL"
    #[serde(rename = "type")]
    pub kind: String,
    /// Additive score, 0-100
    pub strength: u8,
    pub reason: String,
    pub suggested_entry: f64,
    pub rejection_zone: String,
    pub fib_level: String,
    pub fib_price: f64,
    pub confirmation: String,
    pub risk_reward: String,
}

/// Score the current pullback against an open position.
///
/// Returns `None` whenever any precondition fails; the caller never sees an
/// opportunity without an open position, outside the pullback band, or below
/// the strength / risk:reward floors.
pub fn score_reentry(
    position: &Position,
    entry_series: &CandleSeries,
    snapshot: &TimeframeSnapshot,
    price: f64,
    tick_size: f64,
    config: &ReentryConfig,
) -> Option<ReentryOpportunity> {
    if tick_size <= 0.0 || entry_series.len() < 3 {
        return None;
    }

    // Pullback is measured on the adverse side of the entry
    let pullback = match position.direction {
        Direction::Buy => position.entry_price - price,
        Direction::Sell => price - position.entry_price,
    };
    let pullback_ticks = pullback / tick_size;
    if pullback_ticks < config.min_pullback_ticks || pullback_ticks > config.max_pullback_ticks {
        return None;
    }

    // Swing extreme over the lookback window, on the pullback side,
    // excluding the still-forming bar
    let closed = &entry_series.candles[..entry_series.len() - 1];
    let window_start = closed.len().saturating_sub(config.lookback_bars);
    let window = &closed[window_start..];
    if window.is_empty() {
        return None;
    }
    let extreme = match position.direction {
        Direction::Buy => window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
        Direction::Sell => window
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max),
    };

    let range = match position.direction {
        Direction::Buy => position.entry_price - extreme,
        Direction::Sell => extreme - position.entry_price,
    };
    if range <= 0.0 {
        return None;
    }

    // Retracement ladder between the anchor (entry) and the swing extreme
    let sign = position.direction.sign();
    let (fib_price, fib_label, fib_distance_ticks) = FIB_RATIOS
        .iter()
        .map(|(ratio, label)| {
            let level = position.entry_price - sign * ratio * range;
            ((level, *label), (price - level).abs() / tick_size)
        })
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|((level, label), distance)| (level, label, distance))?;

    // Rejection wick opposing the pullback, with the histogram confirming
    let candle = entry_series.last_closed()?;
    let body = candle.body();
    let (wick, histogram_confirms) = match position.direction {
        Direction::Buy => (candle.lower_wick(), snapshot.histogram > 0.0),
        Direction::Sell => (candle.upper_wick(), snapshot.histogram < 0.0),
    };
    let wick_ratio = if body > 0.0 { wick / body } else { 0.0 };
    let has_rejection = wick_ratio > REJECTION_WICK_RATIO && histogram_confirms;
    let at_level = fib_distance_ticks <= config.level_tolerance_ticks;

    if !has_rejection && !at_level {
        return None;
    }

    // Strength: fib proximity 35, histogram 25, RSI positioning 20,
    // rejection quality 20
    let proximity_score = {
        let falloff = config.level_tolerance_ticks * 3.0;
        let closeness = (1.0 - (fib_distance_ticks / falloff).min(1.0)).max(0.0);
        (closeness * 35.0).round() as u8
    };

    let histogram_score = if histogram_confirms {
        let building = match position.direction {
            Direction::Buy => snapshot.histogram > snapshot.prev_histogram,
            Direction::Sell => snapshot.histogram < snapshot.prev_histogram,
        };
        if building {
            25
        } else {
            15
        }
    } else {
        0
    };

    let rsi_score = match snapshot.rsi {
        Some(rsi) => {
            // Mean-reversion zone: pulled back but not collapsed
            let in_zone = match position.direction {
                Direction::Buy => (35.0..=55.0).contains(&rsi),
                Direction::Sell => (45.0..=65.0).contains(&rsi),
            };
            if in_zone {
                20
            } else {
                8
            }
        }
        None => 8,
    };

    let rejection_score = if has_rejection {
        let extra = ((wick_ratio - REJECTION_WICK_RATIO) * 4.0).min(8.0).max(0.0);
        12 + extra.round() as u8
    } else {
        0
    };

    let strength = (proximity_score + histogram_score + rsi_score + rejection_score).min(100);
    if strength < config.min_strength {
        return None;
    }

    // Risk:reward from the suggested entry against the live ladder
    let suggested_entry = fib_price;
    let risk = (suggested_entry - position.current_sl).abs();
    let reward = (position.tp_levels[0] - suggested_entry).abs();
    if risk <= 0.0 {
        return None;
    }
    let rr = reward / risk;
    if rr < config.min_risk_reward {
        return None;
    }

    let zone_half = config.level_tolerance_ticks * tick_size;
    let reason = format!(
        "Price at {} Fib ({:.1} ticks pullback)",
        fib_label, pullback_ticks
    );
    let confirmation = format!(
        "Histogram: {:.3} | RSI: {} | Wick: {}",
        snapshot.histogram,
        snapshot
            .rsi
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| "---".to_string()),
        format_price(wick, tick_size)
    );

    Some(ReentryOpportunity {
        kind: format!("ADD_TO_{}", position.direction.as_str()),
        strength,
        reason,
        suggested_entry,
        rejection_zone: format!(
            "{} - {}",
            format_price(suggested_entry - zone_half, tick_size),
            format_price(suggested_entry + zone_half, tick_size)
        ),
        fib_level: fib_label.to_string(),
        fib_price,
        confirmation,
        risk_reward: format!("1:{:.1}", rr),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candles::{test_candle, Interval};
    use crate::instruments::Category;
    use crate::positions::LifecycleStatus;
    use chrono::{TimeZone, Utc};

    fn buy_position() -> Position {
        let opened = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        Position {
            instrument: "Nifty Future".to_string(),
            direction: Direction::Buy,
            entry_price: 26000.0,
            original_sl: 25900.0,
            current_sl: 25900.0,
            tp_levels: [26150.0, 26300.0, 26500.0],
            tp_hits: [false, false, false],
            opened_at: opened,
            candle_time: opened,
            category: Category::IndianFutures,
            status: LifecycleStatus::Active,
        }
    }

    fn snapshot(histogram: f64, prev_histogram: f64, rsi: Option<f64>) -> TimeframeSnapshot {
        TimeframeSnapshot {
            macd_line: histogram * 2.0,
            signal_line: histogram,
            histogram,
            prev_histogram,
            close: 25950.0,
            ema_200: None,
            rsi,
            atr: Some(40.0),
            bar_time: Utc::now(),
        }
    }

    /// Window whose low sits 100 points under the entry, with a hammer as
    /// the last closed bar
    fn pullback_series() -> CandleSeries {
        let mut candles: Vec<_> = (0..19)
            .map(|i| {
                test_candle(
                    i * 900,
                    25980.0,
                    26010.0,
                    25900.0 + i as f64,
                    25960.0,
                    1000.0,
                )
            })
            .collect();
        // Rejection hammer: small body, long lower wick
        candles.push(test_candle(19 * 900, 25950.0, 25960.0, 25905.0, 25955.0, 1500.0));
        // Still-forming bar
        candles.push(test_candle(20 * 900, 25955.0, 25960.0, 25945.0, 25950.0, 200.0));
        CandleSeries::new(Interval::Minute15, candles)
    }

    fn config() -> ReentryConfig {
        ReentryConfig {
            min_pullback_ticks: 20.0,
            max_pullback_ticks: 10000.0,
            lookback_bars: 20,
            level_tolerance_ticks: 200.0,
            min_strength: 40,
            min_risk_reward: 0.5,
        }
    }

    #[test]
    fn test_opportunity_fires_on_rejection_at_level() {
        let position = buy_position();
        let series = pullback_series();
        let snap = snapshot(12.0, 8.0, Some(45.0));

        let opportunity =
            score_reentry(&position, &series, &snap, 25950.0, 0.05, &config()).unwrap();
        assert_eq!(opportunity.kind, "ADD_TO_BUY");
        assert!(opportunity.strength >= 40);
        assert!(opportunity.fib_level.ends_with('%'));
        assert!(opportunity.risk_reward.starts_with("1:"));
    }

    #[test]
    fn test_no_opportunity_below_min_pullback() {
        let position = buy_position();
        let series = pullback_series();
        let snap = snapshot(12.0, 8.0, Some(45.0));

        // Price one tick under entry: far below the 20-tick minimum
        let result = score_reentry(&position, &series, &snap, 25999.95, 0.05, &config());
        assert!(result.is_none());
    }

    #[test]
    fn test_no_opportunity_beyond_max_pullback() {
        let position = buy_position();
        let series = pullback_series();
        let snap = snapshot(12.0, 8.0, Some(45.0));

        let mut cfg = config();
        cfg.max_pullback_ticks = 100.0;
        // 1000 ticks adverse: the move has reversed, do not chase
        let result = score_reentry(&position, &series, &snap, 25950.0, 0.05, &cfg);
        assert!(result.is_none());
    }

    #[test]
    fn test_risk_reward_floor() {
        let position = buy_position();
        let series = pullback_series();
        let snap = snapshot(12.0, 8.0, Some(45.0));

        let mut cfg = config();
        cfg.min_risk_reward = 50.0;
        let result = score_reentry(&position, &series, &snap, 25950.0, 0.05, &cfg);
        assert!(result.is_none());
    }

    #[test]
    fn test_strength_floor() {
        let position = buy_position();
        let series = pullback_series();
        // Histogram disagrees and RSI is out of zone: weak candidate
        let snap = snapshot(-12.0, -8.0, Some(80.0));

        let mut cfg = config();
        cfg.min_strength = 60;
        let result = score_reentry(&position, &series, &snap, 25950.0, 0.05, &cfg);
        assert!(result.is_none());
    }

    #[test]
    fn test_sell_position_uses_upper_side() {
        let opened = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let position = Position {
            instrument: "Bank Nifty Future".to_string(),
            direction: Direction::Sell,
            entry_price: 59000.0,
            original_sl: 59250.0,
            current_sl: 59250.0,
            tp_levels: [58625.0, 58250.0, 57750.0],
            tp_hits: [false, false, false],
            opened_at: opened,
            candle_time: opened,
            category: Category::IndianFutures,
            status: LifecycleStatus::Active,
        };

        // Pullback above entry with an upper-wick rejection bar
        let mut candles: Vec<_> = (0..19)
            .map(|i| test_candle(i * 900, 59050.0, 59200.0 - i as f64, 59000.0, 59080.0, 900.0))
            .collect();
        candles.push(test_candle(19 * 900, 59090.0, 59195.0, 59080.0, 59095.0, 1200.0));
        candles.push(test_candle(20 * 900, 59095.0, 59100.0, 59085.0, 59090.0, 100.0));
        let series = CandleSeries::new(Interval::Minute15, candles);

        let snap = snapshot(-15.0, -10.0, Some(55.0));
        let opportunity =
            score_reentry(&position, &series, &snap, 59100.0, 0.05, &config()).unwrap();
        assert_eq!(opportunity.kind, "ADD_TO_SELL");
        // Ladder sits between entry and the window high, above the entry
        assert!(opportunity.fib_price > position.entry_price);
    }
}
