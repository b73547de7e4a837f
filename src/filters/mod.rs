//! Entry-gating filters
//!
//! Every filter suppresses new entries for the current cycle only; an
//! already-open Position is never touched by this layer.

pub mod orb;
pub mod premarket;

use chrono::{DateTime, Timelike, Utc};

use crate::candles::CandleSeries;
use crate::instruments::{ist_offset, is_indian_session_open, InstrumentSpec};
use crate::positions::Direction;
use crate::strategy::Bias;

/// Volume confirmation: the last closed bar must trade at least `multiple`
/// times its trailing average. Instruments without volume data pass.
pub fn volume_confirms(series: &CandleSeries, multiple: f64, lookback: usize) -> bool {
    let Some(last_closed) = series.last_closed() else {
        return false;
    };
    if series.len() < lookback + 2 {
        // Not enough history to judge; do not block the entry on it
        return true;
    }

    let end = series.len() - 2; // exclusive of the last closed bar
    let start = end.saturating_sub(lookback);
    let window = &series.candles[start..end];
    let average: f64 = window.iter().map(|c| c.volume).sum::<f64>() / window.len() as f64;

    if average <= 0.0 {
        return true;
    }
    last_closed.volume >= multiple * average
}

/// Whether the early-session pre-market gate window is active
pub fn in_premarket_window(now: DateTime<Utc>, window_end_minutes: u32) -> bool {
    if !is_indian_session_open(now) {
        return false;
    }
    let local = now.with_timezone(&ist_offset());
    let minutes = local.hour() * 60 + local.minute();
    let open = 9 * 60 + 15;
    minutes >= open && minutes < open + window_end_minutes
}

/// Directional alignment with the pre-market sentiment reading.
/// A NEUTRAL reading blocks nothing.
pub fn premarket_allows(direction: Direction, sentiment: Bias) -> bool {
    match sentiment {
        Bias::Neutral => true,
        Bias::Bullish => direction == Direction::Buy,
        Bias::Bearish => direction == Direction::Sell,
    }
}

/// Why an entry was suppressed this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRejection {
    MarketClosed,
    VolumeTooThin,
    OrbNotAligned,
    PremarketOpposed,
}

impl GateRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateRejection::MarketClosed => "market closed",
            GateRejection::VolumeTooThin => "volume below confirmation threshold",
            GateRejection::OrbNotAligned => "no same-side opening-range breakout",
            GateRejection::PremarketOpposed => "pre-market sentiment opposed",
        }
    }
}

/// Combined entry gate for one instrument and direction.
///
/// Market hours apply to every hours-gated category; the volume, ORB and
/// pre-market gates only to categories that declare session filters.
pub fn evaluate_entry_gates(
    spec: &InstrumentSpec,
    direction: Direction,
    entry_series: &CandleSeries,
    orb_alignment: Option<Direction>,
    premarket_sentiment: Option<Bias>,
    now: DateTime<Utc>,
    volume_multiple: f64,
    volume_lookback: usize,
    premarket_window_minutes: u32,
) -> Result<(), GateRejection> {
    if spec.category.market_hours_gated() && !is_indian_session_open(now) {
        return Err(GateRejection::MarketClosed);
    }

    if !spec.category.session_filters_enabled() {
        return Ok(());
    }

    if !volume_confirms(entry_series, volume_multiple, volume_lookback) {
        return Err(GateRejection::VolumeTooThin);
    }

    match orb_alignment {
        Some(side) if side == direction => {}
        _ => return Err(GateRejection::OrbNotAligned),
    }

    if in_premarket_window(now, premarket_window_minutes) {
        if let Some(sentiment) = premarket_sentiment {
            if !premarket_allows(direction, sentiment) {
                return Err(GateRejection::PremarketOpposed);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candles::{test_candle, Interval};
    use crate::instruments::Category;
    use chrono::TimeZone;

    fn series_with_volumes(volumes: &[f64]) -> CandleSeries {
        let candles = volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| test_candle(i as i64 * 900, 100.0, 101.0, 99.0, 100.0, v))
            .collect();
        CandleSeries::new(Interval::Minute15, candles)
    }

    #[test]
    fn test_volume_confirmation() {
        // 10 bars of volume 100, then a 150-volume closed bar + forming bar
        let mut volumes = vec![100.0; 10];
        volumes.push(150.0);
        volumes.push(5.0);
        let series = series_with_volumes(&volumes);

        assert!(volume_confirms(&series, 1.2, 10));
        assert!(!volume_confirms(&series, 1.6, 10));
    }

    #[test]
    fn test_volume_passes_without_data() {
        let series = series_with_volumes(&[0.0; 30]);
        assert!(volume_confirms(&series, 1.2, 20));
    }

    #[test]
    fn test_premarket_alignment() {
        assert!(premarket_allows(Direction::Buy, Bias::Bullish));
        assert!(!premarket_allows(Direction::Buy, Bias::Bearish));
        assert!(premarket_allows(Direction::Sell, Bias::Bearish));
        assert!(premarket_allows(Direction::Sell, Bias::Neutral));
    }

    #[test]
    fn test_premarket_window_bounds() {
        // Monday 09:30 IST = 04:00 UTC, inside a 75-minute window
        let inside = Utc.with_ymd_and_hms(2026, 1, 5, 4, 0, 0).unwrap();
        assert!(in_premarket_window(inside, 75));

        // 11:00 IST = 05:30 UTC, past the window
        let outside = Utc.with_ymd_and_hms(2026, 1, 5, 5, 30, 0).unwrap();
        assert!(!in_premarket_window(outside, 75));
    }

    #[test]
    fn test_gates_skip_unfiltered_categories() {
        let spec = InstrumentSpec::new("EUR/USD", "EURUSD=X", 0.0001, Category::Forex);
        let series = series_with_volumes(&[0.0; 3]);
        // Sunday midnight: forex is not hours-gated and has no session filters
        let now = Utc.with_ymd_and_hms(2026, 1, 4, 0, 0, 0).unwrap();
        assert!(evaluate_entry_gates(
            &spec,
            Direction::Buy,
            &series,
            None,
            None,
            now,
            1.2,
            20,
            75
        )
        .is_ok());
    }

    #[test]
    fn test_gates_require_orb_alignment() {
        let spec = InstrumentSpec::new("Nifty Future", "^NSEI", 0.05, Category::IndianFutures)
            .with_futures_base("NIFTY");
        let series = series_with_volumes(&[1000.0; 30]);
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 6, 0, 0).unwrap(); // 11:30 IST

        let blocked = evaluate_entry_gates(
            &spec,
            Direction::Buy,
            &series,
            Some(Direction::Sell),
            None,
            now,
            0.5,
            20,
            75,
        );
        assert_eq!(blocked, Err(GateRejection::OrbNotAligned));

        let allowed = evaluate_entry_gates(
            &spec,
            Direction::Buy,
            &series,
            Some(Direction::Buy),
            None,
            now,
            0.5,
            20,
            75,
        );
        assert!(allowed.is_ok());
    }

    #[test]
    fn test_gates_respect_market_hours() {
        let spec = InstrumentSpec::new("Nifty Future", "^NSEI", 0.05, Category::IndianFutures);
        let series = series_with_volumes(&[1000.0; 30]);
        // Saturday
        let weekend = Utc.with_ymd_and_hms(2026, 1, 3, 6, 0, 0).unwrap();
        let result = evaluate_entry_gates(
            &spec,
            Direction::Buy,
            &series,
            Some(Direction::Buy),
            None,
            weekend,
            0.5,
            20,
            75,
        );
        assert_eq!(result, Err(GateRejection::MarketClosed));
    }
}
