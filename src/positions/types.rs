//! Position state and lifecycle event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::instruments::Category;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }

    /// +1 for BUY, -1 for SELL; multiplies price differences into P/L
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Human-readable lifecycle label carried on the position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleStatus {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Active")]
    Active,
    #[serde(rename = "Partial TP Hit")]
    PartialTpHit,
    #[serde(rename = "Trailing SL Active")]
    TrailingSlActive,
    #[serde(rename = "Reentry Opportunity")]
    ReentryOpportunity,
}

/// The unit of lifecycle state; at most one open Position per instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument display name; also the store key
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: f64,
    /// Stop as placed at open time; never changes
    pub original_sl: f64,
    /// Live stop; only ever tightens toward profit
    pub current_sl: f64,
    /// TP1/TP2/TP3, fixed at open time
    pub tp_levels: [f64; 3],
    /// Monotonic: once true, never reset while open
    pub tp_hits: [bool; 3],
    pub opened_at: DateTime<Utc>,
    /// Timestamp of the closed bar that originated the entry
    pub candle_time: DateTime<Utc>,
    pub category: Category,
    pub status: LifecycleStatus,
}

impl Position {
    /// Whether a price crossing this level would hit the current stop
    pub fn stop_hit(&self, price: f64) -> bool {
        match self.direction {
            Direction::Buy => price <= self.current_sl,
            Direction::Sell => price >= self.current_sl,
        }
    }

    /// Whether the given TP level (0-based) is reached at `price`
    pub fn tp_reached(&self, index: usize, price: f64) -> bool {
        match self.direction {
            Direction::Buy => price >= self.tp_levels[index],
            Direction::Sell => price <= self.tp_levels[index],
        }
    }

    /// Whether the stop has been moved off its original placement
    pub fn stop_is_trailing(&self) -> bool {
        self.current_sl != self.original_sl
    }

    /// Distance from entry to the original stop
    pub fn stop_distance(&self) -> f64 {
        (self.entry_price - self.original_sl).abs()
    }
}

/// Kind of lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEventKind {
    #[serde(rename = "ENTRY")]
    Entry,
    #[serde(rename = "TP1_HIT")]
    Tp1Hit,
    #[serde(rename = "TP2_HIT")]
    Tp2Hit,
    #[serde(rename = "TP3_HIT")]
    Tp3Hit,
    #[serde(rename = "SL_HIT")]
    SlHit,
    #[serde(rename = "TRAIL_SL_HIT")]
    TrailSlHit,
    #[serde(rename = "REVERSAL_CLOSE")]
    ReversalClose,
}

impl LifecycleEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEventKind::Entry => "ENTRY",
            LifecycleEventKind::Tp1Hit => "TP1_HIT",
            LifecycleEventKind::Tp2Hit => "TP2_HIT",
            LifecycleEventKind::Tp3Hit => "TP3_HIT",
            LifecycleEventKind::SlHit => "SL_HIT",
            LifecycleEventKind::TrailSlHit => "TRAIL_SL_HIT",
            LifecycleEventKind::ReversalClose => "REVERSAL_CLOSE",
        }
    }

    /// Whether this event removes the position from the active set
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleEventKind::Tp3Hit
                | LifecycleEventKind::SlHit
                | LifecycleEventKind::TrailSlHit
                | LifecycleEventKind::ReversalClose
        )
    }
}

impl std::fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A lifecycle transition produced by one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleEventKind,
    pub price: f64,
    pub time: DateTime<Utc>,
}
