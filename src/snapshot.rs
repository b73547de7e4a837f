//! Published per-cycle snapshot
//!
//! One record per instrument per cycle, serialized atomically for the
//! dashboard and served live by the webserver. The snapshot is also the
//! recovery source for the position store when its dedicated file is lost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::contracts::ContractInfo;
use crate::instruments::Category;
use crate::positions::Position;
use crate::reentry::ReentryOpportunity;
use crate::strategy::{Bias, TriggerEvent};
use crate::utils::atomic_write_json;

/// Where the instrument stands after a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    #[serde(rename = "WAITING")]
    Waiting,
    #[serde(rename = "LOOKING_FOR_BUY")]
    LookingForBuy,
    #[serde(rename = "LOOKING_FOR_SELL")]
    LookingForSell,
    #[serde(rename = "CONFLICT")]
    Conflict,
    #[serde(rename = "ENTRY_FILTERED")]
    EntryFiltered,
    #[serde(rename = "ACTIVE_BUY")]
    ActiveBuy,
    #[serde(rename = "ACTIVE_SELL")]
    ActiveSell,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Waiting => "WAITING",
            OverallStatus::LookingForBuy => "LOOKING_FOR_BUY",
            OverallStatus::LookingForSell => "LOOKING_FOR_SELL",
            OverallStatus::Conflict => "CONFLICT",
            OverallStatus::EntryFiltered => "ENTRY_FILTERED",
            OverallStatus::ActiveBuy => "ACTIVE_BUY",
            OverallStatus::ActiveSell => "ACTIVE_SELL",
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trend-timeframe view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendView {
    pub macd_line: f64,
    pub bias: Bias,
    pub label: String,
}

/// Momentum-timeframe view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumView {
    pub histogram: f64,
    pub bias: Bias,
    pub label: String,
}

/// Entry-timeframe view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryView {
    pub histogram: f64,
    pub status: TriggerEvent,
    pub close: f64,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_200: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
}

/// One instrument's published record for the cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub instrument: String,
    /// Live price after the sanity check
    pub ltp: f64,
    pub trend: TrendView,
    pub momentum: MomentumView,
    pub entry: EntryView,
    pub overall_status: OverallStatus,
    pub signal: Option<Position>,
    pub re_entry: Option<ReentryOpportunity>,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_info: Option<ContractInfo>,
    pub timestamp: DateTime<Utc>,
}

/// The full published snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedSnapshot {
    pub last_updated: DateTime<Utc>,
    /// Plain-text heartbeat for quick staleness checks on the dashboard
    pub backend_heartbeat: String,
    pub data: Vec<InstrumentRecord>,
}

impl PublishedSnapshot {
    pub fn new(data: Vec<InstrumentRecord>, now: DateTime<Utc>) -> Self {
        Self {
            last_updated: now,
            backend_heartbeat: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            data,
        }
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        atomic_write_json(path, self)
    }
}

/// Latest snapshot shared between the engine and the webserver
pub type SharedSnapshot = Arc<RwLock<Option<PublishedSnapshot>>>;

pub fn new_shared_snapshot() -> SharedSnapshot {
    Arc::new(RwLock::new(None))
}
