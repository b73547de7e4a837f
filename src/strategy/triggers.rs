//! Entry trigger detection from the last two closed entry-timeframe bars

use serde::{Deserialize, Serialize};

use crate::positions::Direction;

/// Discrete per-cycle event derived from the histogram pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    #[serde(rename = "BUY_CROSS")]
    BuyCross,
    #[serde(rename = "SELL_CROSS")]
    SellCross,
    #[serde(rename = "BULLISH_MOM")]
    BullishMom,
    #[serde(rename = "BEARISH_MOM")]
    BearishMom,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEvent::BuyCross => "BUY_CROSS",
            TriggerEvent::SellCross => "SELL_CROSS",
            TriggerEvent::BullishMom => "BULLISH_MOM",
            TriggerEvent::BearishMom => "BEARISH_MOM",
        }
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify the histogram pair into a trigger event
pub fn detect_trigger(prev_histogram: f64, histogram: f64) -> TriggerEvent {
    if prev_histogram < 0.0 && histogram > 0.0 {
        TriggerEvent::BuyCross
    } else if prev_histogram > 0.0 && histogram < 0.0 {
        TriggerEvent::SellCross
    } else if histogram > 0.0 {
        TriggerEvent::BullishMom
    } else {
        TriggerEvent::BearishMom
    }
}

/// Whether the trigger justifies a fresh entry in `direction`.
///
/// Momentum continuation only counts when it just turned: the previous
/// histogram must still have been on or over the zero line, so stale
/// several-bar-old momentum never re-triggers an entry.
pub fn trigger_allows_entry(event: TriggerEvent, prev_histogram: f64, direction: Direction) -> bool {
    match direction {
        Direction::Buy => {
            event == TriggerEvent::BuyCross
                || (event == TriggerEvent::BullishMom && prev_histogram <= 0.0)
        }
        Direction::Sell => {
            event == TriggerEvent::SellCross
                || (event == TriggerEvent::BearishMom && prev_histogram >= 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_detection() {
        assert_eq!(detect_trigger(-0.2, 0.1), TriggerEvent::BuyCross);
        assert_eq!(detect_trigger(0.2, -0.1), TriggerEvent::SellCross);
        assert_eq!(detect_trigger(0.1, 0.3), TriggerEvent::BullishMom);
        assert_eq!(detect_trigger(-0.1, -0.3), TriggerEvent::BearishMom);
    }

    #[test]
    fn test_zero_previous_is_momentum_not_cross() {
        assert_eq!(detect_trigger(0.0, 0.3), TriggerEvent::BullishMom);
        assert_eq!(detect_trigger(0.0, -0.3), TriggerEvent::BearishMom);
    }

    #[test]
    fn test_fresh_cross_allows_entry() {
        assert!(trigger_allows_entry(
            TriggerEvent::BuyCross,
            -0.2,
            Direction::Buy
        ));
        assert!(trigger_allows_entry(
            TriggerEvent::SellCross,
            0.2,
            Direction::Sell
        ));
    }

    #[test]
    fn test_stale_momentum_rejected() {
        // Histogram positive for several bars already
        assert!(!trigger_allows_entry(
            TriggerEvent::BullishMom,
            0.4,
            Direction::Buy
        ));
        // Momentum that only just turned is accepted
        assert!(trigger_allows_entry(
            TriggerEvent::BullishMom,
            0.0,
            Direction::Buy
        ));
        assert!(trigger_allows_entry(
            TriggerEvent::BearishMom,
            0.0,
            Direction::Sell
        ));
    }

    #[test]
    fn test_opposite_event_never_allows_entry() {
        assert!(!trigger_allows_entry(
            TriggerEvent::SellCross,
            0.2,
            Direction::Buy
        ));
        assert!(!trigger_allows_entry(
            TriggerEvent::BearishMom,
            0.1,
            Direction::Buy
        ));
    }
}
