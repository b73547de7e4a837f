//! Pure lifecycle evaluation
//!
//! `evaluate` takes the current position and the fresh price and returns the
//! next state plus the list of transitions, leaving the caller to apply the
//! result once. Nothing in this module mutates shared state.

use chrono::{DateTime, Utc};

use super::types::{
    Direction, LifecycleEvent, LifecycleEventKind, LifecycleStatus, Position,
};
use crate::instruments::{Category, InstrumentSpec};

/// Maximum tolerated single-bar move before the fresh price is treated as a
/// data glitch and replaced by the previous close
pub const MAX_SINGLE_BAR_MOVE: f64 = 0.05;

/// Fallback stop distance in ticks when ATR is unavailable
pub const FALLBACK_STOP_TICKS: f64 = 30.0;

/// Risk sizing and trailing policy resolved per instrument category
#[derive(Debug, Clone, Copy)]
pub struct RiskParams {
    pub sl_atr_multiplier: f64,
    pub tp_ratios: [f64; 3],
    pub move_to_breakeven_at_tp1: bool,
    pub move_to_tp1_at_tp2: bool,
}

impl RiskParams {
    pub fn for_category(category: Category) -> Self {
        Self {
            sl_atr_multiplier: category.sl_atr_multiplier(),
            tp_ratios: category.tp_ratios(),
            move_to_breakeven_at_tp1: true,
            move_to_tp1_at_tp2: true,
        }
    }
}

/// Stop distance from ATR, falling back to a fixed tick multiple when the
/// ATR is zero or unavailable
pub fn stop_distance(atr: Option<f64>, tick_size: f64, risk: &RiskParams) -> f64 {
    match atr {
        Some(value) if value > 0.0 => value * risk.sl_atr_multiplier,
        _ => FALLBACK_STOP_TICKS * tick_size,
    }
}

/// Replace a glitched price with the previous close.
///
/// Returns the price to use and whether a correction was applied. Categories
/// that legitimately move this fast are exempt.
pub fn sanitize_price(latest: f64, prev_close: f64, category: Category) -> (f64, bool) {
    if category.spike_check_exempt() || prev_close <= 0.0 {
        return (latest, false);
    }
    let change = (latest - prev_close).abs() / prev_close;
    if change > MAX_SINGLE_BAR_MOVE {
        (prev_close, true)
    } else {
        (latest, false)
    }
}

/// Build a fresh Position at `price` with the full SL/TP ladder
pub fn open_position(
    spec: &InstrumentSpec,
    direction: Direction,
    price: f64,
    atr: Option<f64>,
    candle_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Position {
    let risk = RiskParams::for_category(spec.category);
    let distance = stop_distance(atr, spec.tick_size, &risk);
    let sign = direction.sign();

    let sl = price - sign * distance;
    let tp_levels = [
        price + sign * distance * risk.tp_ratios[0],
        price + sign * distance * risk.tp_ratios[1],
        price + sign * distance * risk.tp_ratios[2],
    ];

    Position {
        instrument: spec.name.clone(),
        direction,
        entry_price: price,
        original_sl: sl,
        current_sl: sl,
        tp_levels,
        tp_hits: [false, false, false],
        opened_at: now,
        candle_time,
        category: spec.category,
        status: LifecycleStatus::New,
    }
}

/// Result of one lifecycle evaluation
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// The surviving position, or None after a terminal event
    pub position: Option<Position>,
    /// Transitions in the order they occurred
    pub events: Vec<LifecycleEvent>,
}

impl Evaluation {
    fn unchanged(position: Position) -> Self {
        Self {
            position: Some(position),
            events: Vec::new(),
        }
    }

    /// The terminal event of this evaluation, if any
    pub fn close_event(&self) -> Option<&LifecycleEvent> {
        self.events.iter().find(|e| e.kind.is_terminal())
    }
}

/// Evaluate an open position against the fresh price.
///
/// Order of checks matches the lifecycle contract: stop first, then the TP
/// ladder in ascending order, then the reversal close. Exactly one terminal
/// event is ever produced. `reversal_confirmed` must only be true when the
/// opposite bias is confirmed on both trend and momentum AND a fresh
/// opposite-direction cross fired this cycle.
pub fn evaluate(
    position: &Position,
    price: f64,
    reversal_confirmed: bool,
    risk: &RiskParams,
    now: DateTime<Utc>,
) -> Evaluation {
    let mut next = position.clone();
    let mut events = Vec::new();

    // 1. Stop check
    if next.stop_hit(price) {
        let kind = if next.stop_is_trailing() {
            LifecycleEventKind::TrailSlHit
        } else {
            LifecycleEventKind::SlHit
        };
        events.push(LifecycleEvent {
            kind,
            price,
            time: now,
        });
        return Evaluation {
            position: None,
            events,
        };
    }

    // 2. TP ladder, ascending; several levels can fall in one cycle
    let tp_event_kinds = [
        LifecycleEventKind::Tp1Hit,
        LifecycleEventKind::Tp2Hit,
        LifecycleEventKind::Tp3Hit,
    ];
    for index in 0..3 {
        if next.tp_hits[index] || !next.tp_reached(index, price) {
            continue;
        }
        next.tp_hits[index] = true;
        events.push(LifecycleEvent {
            kind: tp_event_kinds[index],
            price,
            time: now,
        });

        match index {
            0 => {
                if risk.move_to_breakeven_at_tp1 {
                    next.current_sl = tighten_stop(&next, next.entry_price);
                    next.status = LifecycleStatus::TrailingSlActive;
                } else {
                    next.status = LifecycleStatus::PartialTpHit;
                }
            }
            1 => {
                if risk.move_to_tp1_at_tp2 {
                    next.current_sl = tighten_stop(&next, next.tp_levels[0]);
                    next.status = LifecycleStatus::TrailingSlActive;
                }
            }
            _ => {
                // TP3 is a full exit regardless of the stop
                return Evaluation {
                    position: None,
                    events,
                };
            }
        }
    }

    // 3. Reversal close; no new position opens in the same cycle
    if reversal_confirmed {
        events.push(LifecycleEvent {
            kind: LifecycleEventKind::ReversalClose,
            price,
            time: now,
        });
        return Evaluation {
            position: None,
            events,
        };
    }

    if events.is_empty() {
        if next.status == LifecycleStatus::New {
            next.status = LifecycleStatus::Active;
        }
        return Evaluation::unchanged(next);
    }

    Evaluation {
        position: Some(next),
        events,
    }
}

/// Move the stop toward profit, never away from it
fn tighten_stop(position: &Position, target: f64) -> f64 {
    match position.direction {
        Direction::Buy => position.current_sl.max(target),
        Direction::Sell => position.current_sl.min(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn spec() -> InstrumentSpec {
        InstrumentSpec::new("EUR/USD", "EURUSD=X", 0.0001, Category::Forex)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap()
    }

    fn risk() -> RiskParams {
        RiskParams::for_category(Category::Forex)
    }

    /// Entry 100 with ATR distance 5: stop 95, TPs 107.5 / 115 / 125
    fn buy_position() -> Position {
        let mut spec = spec();
        spec.tick_size = 0.01;
        open_position(
            &spec,
            Direction::Buy,
            100.0,
            Some(5.0 / 1.5),
            now(),
            now(),
        )
    }

    #[test]
    fn test_ladder_arithmetic() {
        let position = buy_position();
        assert!((position.original_sl - 95.0).abs() < 1e-9);
        assert!((position.tp_levels[0] - 107.5).abs() < 1e-9);
        assert!((position.tp_levels[1] - 115.0).abs() < 1e-9);
        assert!((position.tp_levels[2] - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_sell_ladder_mirrors() {
        let mut spec = spec();
        spec.tick_size = 0.01;
        let position = open_position(&spec, Direction::Sell, 100.0, Some(5.0 / 1.5), now(), now());
        assert!((position.original_sl - 105.0).abs() < 1e-9);
        assert!((position.tp_levels[0] - 92.5).abs() < 1e-9);
        assert!((position.tp_levels[2] - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_atr_fallback_uses_tick_multiple() {
        let s = spec();
        let position = open_position(&s, Direction::Buy, 1.1, None, now(), now());
        let expected = FALLBACK_STOP_TICKS * s.tick_size;
        assert!((position.stop_distance() - expected).abs() < 1e-9);

        let zero_atr = open_position(&s, Direction::Buy, 1.1, Some(0.0), now(), now());
        assert!((zero_atr.stop_distance() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_tp1_sets_flag_and_moves_stop_to_breakeven() {
        let position = buy_position();
        let result = evaluate(&position, 108.0, false, &risk(), now());

        let updated = result.position.as_ref().expect("position stays open");
        assert!(updated.tp_hits[0]);
        assert!(!updated.tp_hits[1]);
        assert!((updated.current_sl - 100.0).abs() < 1e-9);
        assert_eq!(updated.status, LifecycleStatus::TrailingSlActive);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].kind, LifecycleEventKind::Tp1Hit);
        assert!(result.close_event().is_none());
    }

    #[test]
    fn test_full_sequence_closes_at_trailing_stop() {
        // Price path 100 (entry), 108 (TP1), 116 (TP2), 94 (trail stop)
        let mut position = buy_position();

        let step1 = evaluate(&position, 108.0, false, &risk(), now());
        position = step1.position.unwrap();

        let step2 = evaluate(&position, 116.0, false, &risk(), now());
        position = step2.position.unwrap();
        assert!(position.tp_hits[1]);
        // Stop now parked at the TP1 level
        assert!((position.current_sl - position.tp_levels[0]).abs() < 1e-9);

        let step3 = evaluate(&position, 94.0, false, &risk(), now());
        assert!(step3.position.is_none());
        assert_eq!(step3.events.len(), 1);
        assert_eq!(step3.events[0].kind, LifecycleEventKind::TrailSlHit);
    }

    #[test]
    fn test_untouched_stop_labels_plain_sl_hit() {
        let position = buy_position();
        let result = evaluate(&position, 94.0, false, &risk(), now());
        assert!(result.position.is_none());
        assert_eq!(result.events[0].kind, LifecycleEventKind::SlHit);
    }

    #[test]
    fn test_two_tps_in_one_cycle() {
        let position = buy_position();
        let result = evaluate(&position, 116.0, false, &risk(), now());
        let updated = result.position.unwrap();
        assert!(updated.tp_hits[0] && updated.tp_hits[1]);
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[0].kind, LifecycleEventKind::Tp1Hit);
        assert_eq!(result.events[1].kind, LifecycleEventKind::Tp2Hit);
    }

    #[test]
    fn test_tp3_is_full_exit() {
        let position = buy_position();
        let result = evaluate(&position, 126.0, false, &risk(), now());
        assert!(result.position.is_none());
        assert_eq!(
            result.events.last().unwrap().kind,
            LifecycleEventKind::Tp3Hit
        );
        // Exactly one terminal event even though three levels fell at once
        assert_eq!(
            result.events.iter().filter(|e| e.kind.is_terminal()).count(),
            1
        );
    }

    #[test]
    fn test_reversal_close() {
        let position = buy_position();
        let result = evaluate(&position, 101.0, true, &risk(), now());
        assert!(result.position.is_none());
        assert_eq!(result.events[0].kind, LifecycleEventKind::ReversalClose);
    }

    #[test]
    fn test_stop_never_loosens_for_buy() {
        let mut position = buy_position();
        let mut last_sl = position.current_sl;

        for price in [101.0, 108.0, 105.0, 116.0, 110.0] {
            let result = evaluate(&position, price, false, &risk(), now());
            match result.position {
                Some(next) => {
                    assert!(next.current_sl >= last_sl, "stop loosened at price {}", price);
                    last_sl = next.current_sl;
                    position = next;
                }
                None => break,
            }
        }
    }

    #[test]
    fn test_tp_flags_monotonic() {
        let mut position = buy_position();
        position = evaluate(&position, 108.0, false, &risk(), now())
            .position
            .unwrap();
        assert!(position.tp_hits[0]);

        // Price falls back below TP1 but stays above the relocated stop;
        // the flag must not reset
        position = evaluate(&position, 103.0, false, &risk(), now())
            .position
            .unwrap();
        assert!(position.tp_hits[0]);
    }

    #[test]
    fn test_sell_position_lifecycle() {
        let mut spec = spec();
        spec.tick_size = 0.01;
        let position = open_position(&spec, Direction::Sell, 100.0, Some(5.0 / 1.5), now(), now());

        // TP1 at 92.5
        let result = evaluate(&position, 92.0, false, &risk(), now());
        let updated = result.position.unwrap();
        assert!(updated.tp_hits[0]);
        assert!((updated.current_sl - 100.0).abs() < 1e-9);

        // Stop hit back at breakeven
        let closed = evaluate(&updated, 100.5, false, &risk(), now());
        assert!(closed.position.is_none());
        assert_eq!(closed.events[0].kind, LifecycleEventKind::TrailSlHit);
    }

    #[test]
    fn test_sanitize_price_spike() {
        let (price, corrected) = sanitize_price(110.0, 100.0, Category::Forex);
        assert!(corrected);
        assert!((price - 100.0).abs() < 1e-9);

        let (price, corrected) = sanitize_price(104.0, 100.0, Category::Forex);
        assert!(!corrected);
        assert!((price - 104.0).abs() < 1e-9);

        // Exempt category keeps the spike
        let (price, corrected) = sanitize_price(110.0, 100.0, Category::CryptoScalping);
        assert!(!corrected);
        assert!((price - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_new_position_becomes_active() {
        let position = buy_position();
        assert_eq!(position.status, LifecycleStatus::New);
        let result = evaluate(&position, 100.5, false, &risk(), now());
        assert_eq!(result.position.unwrap().status, LifecycleStatus::Active);
    }
}
