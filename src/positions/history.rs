//! Append-only signal history with trade metrics
//!
//! Every lifecycle transition is recorded; close events additionally carry
//! the computed trade metrics. The log is capped to the most recent N
//! events and persisted atomically after each append.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;

use super::types::{Direction, LifecycleEventKind, Position};
use crate::instruments::Category;
use crate::logger::{self, LogTag};
use crate::utils::atomic_write_json;

/// Default history cap, matching the published dashboard feed
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// Trade outcome attached to close events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeMetrics {
    /// Signed P/L expressed in instrument ticks
    pub pnl_ticks: f64,
    /// Signed P/L as a percentage of the entry price
    pub pnl_percent: f64,
    /// Seconds the position was held
    pub duration_secs: i64,
    /// Realized reward relative to the original risk distance
    pub achieved_rr: f64,
}

/// Compute close-time metrics for a position exiting at `exit_price`
pub fn trade_metrics(
    position: &Position,
    exit_price: f64,
    exit_time: DateTime<Utc>,
    tick_size: f64,
) -> TradeMetrics {
    let pnl = position.direction.sign() * (exit_price - position.entry_price);
    let pnl_ticks = if tick_size > 0.0 { pnl / tick_size } else { 0.0 };
    let pnl_percent = if position.entry_price != 0.0 {
        pnl / position.entry_price * 100.0
    } else {
        0.0
    };
    let risk = position.stop_distance();
    let achieved_rr = if risk > 0.0 { pnl / risk } else { 0.0 };

    TradeMetrics {
        pnl_ticks,
        pnl_percent,
        duration_secs: exit_time
            .signed_duration_since(position.opened_at)
            .num_seconds()
            .max(0),
        achieved_rr,
    }
}

/// Immutable record of one lifecycle transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub instrument: String,
    pub event: LifecycleEventKind,
    pub price: f64,
    pub time: DateTime<Utc>,
    pub category: Category,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub initial_sl: f64,
    /// Present on close events only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TradeMetrics>,
}

impl HistoryEvent {
    /// Build a record from a position and the transition it just made
    pub fn from_position(
        position: &Position,
        kind: LifecycleEventKind,
        price: f64,
        time: DateTime<Utc>,
        metrics: Option<TradeMetrics>,
    ) -> Self {
        Self {
            instrument: position.instrument.clone(),
            event: kind,
            price,
            time,
            category: position.category,
            direction: position.direction,
            entry_price: position.entry_price,
            entry_time: position.opened_at,
            initial_sl: position.original_sl,
            metrics,
        }
    }
}

/// Bounded append-only event log, persisted as JSON
pub struct HistoryLog {
    path: PathBuf,
    cap: usize,
    events: RwLock<Vec<HistoryEvent>>,
}

impl HistoryLog {
    /// Load the log from disk; an absent or corrupt file starts empty
    pub fn load(path: PathBuf, cap: usize) -> Self {
        let events: Vec<HistoryEvent> =
            crate::utils::load_json_or_none(&path).unwrap_or_default();
        if !events.is_empty() {
            logger::info(
                LogTag::History,
                &format!("Loaded {} history events from {}", events.len(), path.display()),
            );
        }
        Self {
            path,
            cap: cap.max(1),
            events: RwLock::new(events),
        }
    }

    /// Append an event, trim to the cap and persist
    pub async fn record(&self, event: HistoryEvent) {
        let snapshot = {
            let mut events = self.events.write().await;
            events.push(event);
            let overflow = events.len().saturating_sub(self.cap);
            if overflow > 0 {
                events.drain(..overflow);
            }
            events.clone()
        };

        if let Err(e) = atomic_write_json(&self.path, &snapshot) {
            logger::error(
                LogTag::History,
                &format!("Failed to persist history: {}", e),
            );
        }
    }

    /// Most recent events, newest last
    pub async fn recent(&self) -> Vec<HistoryEvent> {
        self.events.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::types::LifecycleStatus;
    use chrono::TimeZone;

    fn position() -> Position {
        let opened = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        Position {
            instrument: "EUR/USD".to_string(),
            direction: Direction::Buy,
            entry_price: 100.0,
            original_sl: 95.0,
            current_sl: 95.0,
            tp_levels: [107.5, 115.0, 125.0],
            tp_hits: [false, false, false],
            opened_at: opened,
            candle_time: opened,
            category: Category::Forex,
            status: LifecycleStatus::Active,
        }
    }

    #[test]
    fn test_trade_metrics_winning_buy() {
        let position = position();
        let exit = position.opened_at + chrono::Duration::hours(2);
        let metrics = trade_metrics(&position, 110.0, exit, 0.01);

        assert!((metrics.pnl_ticks - 1000.0).abs() < 1e-9);
        assert!((metrics.pnl_percent - 10.0).abs() < 1e-9);
        assert_eq!(metrics.duration_secs, 7200);
        assert!((metrics.achieved_rr - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_trade_metrics_losing_sell() {
        let mut position = position();
        position.direction = Direction::Sell;
        position.original_sl = 105.0;
        let exit = position.opened_at + chrono::Duration::minutes(30);
        let metrics = trade_metrics(&position, 105.0, exit, 0.01);

        // Sell stopped out above entry: a full -1R loss
        assert!(metrics.pnl_percent < 0.0);
        assert!((metrics.achieved_rr + 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_history_cap() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::load(dir.path().join("history.json"), 3);
        let position = position();

        for i in 0..5 {
            log.record(HistoryEvent::from_position(
                &position,
                LifecycleEventKind::Tp1Hit,
                100.0 + i as f64,
                position.opened_at,
                None,
            ))
            .await;
        }

        let events = log.recent().await;
        assert_eq!(events.len(), 3);
        // Oldest events were dropped
        assert!((events[0].price - 102.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_history_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let position = position();

        {
            let log = HistoryLog::load(path.clone(), 10);
            let metrics = trade_metrics(&position, 94.0, position.opened_at, 0.01);
            log.record(HistoryEvent::from_position(
                &position,
                LifecycleEventKind::SlHit,
                94.0,
                position.opened_at,
                Some(metrics),
            ))
            .await;
        }

        let reloaded = HistoryLog::load(path, 10);
        let events = reloaded.recent().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, LifecycleEventKind::SlHit);
        assert!(events[0].metrics.is_some());
    }
}
