/// Shared application state for the webserver
///
/// References to the engine's live outputs that route handlers read; the
/// webserver never mutates engine state.
use std::sync::Arc;

use crate::filters::premarket::PremarketProvider;
use crate::positions::{HistoryLog, PositionStore};
use crate::snapshot::SharedSnapshot;

#[derive(Clone)]
pub struct AppState {
    /// Latest published snapshot, updated by the engine each cycle
    pub snapshot: SharedSnapshot,
    pub positions: Arc<PositionStore>,
    pub history: Arc<HistoryLog>,
    pub premarket: Arc<PremarketProvider>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        snapshot: SharedSnapshot,
        positions: Arc<PositionStore>,
        history: Arc<HistoryLog>,
        premarket: Arc<PremarketProvider>,
    ) -> Self {
        Self {
            snapshot,
            positions,
            history,
            premarket,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time).num_seconds().max(0) as u64
    }
}
