//! Active-position store
//!
//! One store instance is owned by the engine and passed where needed; there
//! is no ambient global state. Persistence is a plain serialize of the map,
//! written atomically after every mutation because the dashboard reads the
//! same file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::types::Position;
use crate::logger::{self, LogTag};
use crate::utils::{atomic_write_json, load_json_or_none};

pub struct PositionStore {
    path: PathBuf,
    positions: RwLock<HashMap<String, Position>>,
}

impl PositionStore {
    /// Load the store, falling back to recovery from the last published
    /// snapshot when the dedicated file is absent or corrupt.
    pub fn load(path: PathBuf, snapshot_fallback: &Path) -> Self {
        if let Some(map) = load_json_or_none::<HashMap<String, Position>>(&path) {
            logger::info(
                LogTag::Positions,
                &format!("Loaded {} active positions from {}", map.len(), path.display()),
            );
            return Self {
                path,
                positions: RwLock::new(map),
            };
        }

        let recovered = recover_from_snapshot(snapshot_fallback);
        if !recovered.is_empty() {
            logger::warning(
                LogTag::Positions,
                &format!(
                    "Recovered {} active positions from snapshot {}",
                    recovered.len(),
                    snapshot_fallback.display()
                ),
            );
            let store = Self {
                path,
                positions: RwLock::new(recovered),
            };
            store.persist_blocking();
            return store;
        }

        Self {
            path,
            positions: RwLock::new(HashMap::new()),
        }
    }

    /// In-memory store for tests and tools; still persists to `path`
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            positions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, instrument: &str) -> Option<Position> {
        self.positions.read().await.get(instrument).cloned()
    }

    /// Insert or replace the position for its instrument and persist.
    ///
    /// The map key is the instrument name, so the at-most-one-open-position
    /// invariant holds structurally.
    pub async fn upsert(&self, position: Position) {
        {
            let mut positions = self.positions.write().await;
            positions.insert(position.instrument.clone(), position);
        }
        self.persist().await;
    }

    /// Remove the position for an instrument and persist
    pub async fn remove(&self, instrument: &str) -> Option<Position> {
        let removed = {
            let mut positions = self.positions.write().await;
            positions.remove(instrument)
        };
        if removed.is_some() {
            self.persist().await;
        }
        removed
    }

    pub async fn all(&self) -> HashMap<String, Position> {
        self.positions.read().await.clone()
    }

    pub async fn open_count(&self) -> usize {
        self.positions.read().await.len()
    }

    async fn persist(&self) {
        let snapshot = self.positions.read().await.clone();
        if let Err(e) = atomic_write_json(&self.path, &snapshot) {
            logger::error(
                LogTag::Positions,
                &format!("Failed to persist positions: {}", e),
            );
        }
    }

    fn persist_blocking(&self) {
        // Only used during synchronous startup, before the runtime loops
        if let Ok(positions) = self.positions.try_read() {
            if let Err(e) = atomic_write_json(&self.path, &*positions) {
                logger::error(
                    LogTag::Positions,
                    &format!("Failed to persist recovered positions: {}", e),
                );
            }
        }
    }
}

/// Reconstruct the active set from the last published snapshot file.
///
/// The snapshot embeds each instrument's open position under `signal`; the
/// parse goes through `serde_json::Value` so the store stays decoupled from
/// the snapshot schema.
fn recover_from_snapshot(path: &Path) -> HashMap<String, Position> {
    let mut recovered = HashMap::new();
    let Some(root) = load_json_or_none::<serde_json::Value>(path) else {
        return recovered;
    };
    let Some(records) = root.get("data").and_then(|d| d.as_array()) else {
        return recovered;
    };

    for record in records {
        let Some(signal) = record.get("signal") else {
            continue;
        };
        if signal.is_null() {
            continue;
        }
        match serde_json::from_value::<Position>(signal.clone()) {
            Ok(position) => {
                recovered.insert(position.instrument.clone(), position);
            }
            Err(e) => {
                logger::warning(
                    LogTag::Positions,
                    &format!("Skipping unreadable snapshot signal: {}", e),
                );
            }
        }
    }
    recovered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::Category;
    use crate::positions::types::{Direction, LifecycleStatus};
    use chrono::{TimeZone, Utc};

    fn position(instrument: &str) -> Position {
        let opened = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        Position {
            instrument: instrument.to_string(),
            direction: Direction::Buy,
            entry_price: 100.0,
            original_sl: 95.0,
            current_sl: 95.0,
            tp_levels: [107.5, 115.0, 125.0],
            tp_hits: [false, true, false],
            opened_at: opened,
            candle_time: opened,
            category: Category::Forex,
            status: LifecycleStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_round_trip_is_field_for_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.json");
        let missing = dir.path().join("signals.json");

        let original = position("EUR/USD");
        {
            let store = PositionStore::empty(path.clone());
            store.upsert(original.clone()).await;
        }

        let reloaded = PositionStore::load(path, &missing);
        let restored = reloaded.get("EUR/USD").await.unwrap();
        assert_eq!(restored, original);
    }

    #[tokio::test]
    async fn test_one_position_per_instrument() {
        let dir = tempfile::tempdir().unwrap();
        let store = PositionStore::empty(dir.path().join("positions.json"));

        store.upsert(position("Gold")).await;
        let mut replacement = position("Gold");
        replacement.entry_price = 200.0;
        store.upsert(replacement).await;

        assert_eq!(store.open_count().await, 1);
        assert!((store.get("Gold").await.unwrap().entry_price - 200.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_remove_persists_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.json");
        let missing = dir.path().join("signals.json");

        {
            let store = PositionStore::empty(path.clone());
            store.upsert(position("Gold")).await;
            assert!(store.remove("Gold").await.is_some());
            assert!(store.remove("Gold").await.is_none());
        }

        let reloaded = PositionStore::load(path, &missing);
        assert_eq!(reloaded.open_count().await, 0);
    }

    #[tokio::test]
    async fn test_recovery_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("positions.json");
        let snapshot_path = dir.path().join("signals.json");

        let snapshot = serde_json::json!({
            "last_updated": "2026-01-05T10:00:00Z",
            "data": [
                { "instrument": "EUR/USD", "signal": position("EUR/USD") },
                { "instrument": "Gold", "signal": null },
            ]
        });
        std::fs::write(
            &snapshot_path,
            serde_json::to_string_pretty(&snapshot).unwrap(),
        )
        .unwrap();

        let store = PositionStore::load(store_path.clone(), &snapshot_path);
        assert_eq!(store.open_count().await, 1);
        assert!(store.get("EUR/USD").await.is_some());
        // Recovery writes the dedicated file back
        assert!(store_path.exists());
    }
}
