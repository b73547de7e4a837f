//! Opening-range breakout tracking
//!
//! The first 15 minutes of the Indian session (09:15-09:30 IST) establish a
//! high/low band per instrument per day. After the window closes, the first
//! price to leave the band on either side records a breakout; entries in the
//! gated categories must align with that side for the rest of the day.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::instruments::ist_offset;
use crate::logger::{self, LogTag};
use crate::positions::Direction;
use crate::utils::{atomic_write_json, load_json_or_none};

/// Minimum band width relative to its high; tighter ranges produce false
/// breakouts and are ignored
pub const MIN_RANGE_PCT: f64 = 0.002;

/// Days of per-day records kept on disk
pub const RETENTION_DAYS: i64 = 7;

/// One instrument's opening range for one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningRange {
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub breakout: Option<OrbBreakout>,
}

/// A recorded breakout of the opening band
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbBreakout {
    pub direction: Direction,
    pub price: f64,
    pub time: DateTime<Utc>,
}

/// Date-keyed opening-range state, persisted as JSON
pub struct OrbTracker {
    path: PathBuf,
    // date key ("YYYY-MM-DD" in IST) -> instrument -> range
    days: HashMap<String, HashMap<String, OpeningRange>>,
}

impl OrbTracker {
    pub fn load(path: PathBuf) -> Self {
        let days = load_json_or_none(&path).unwrap_or_default();
        Self { path, days }
    }

    /// Whether `now` is inside the 09:15-09:30 IST tracking window
    pub fn in_tracking_window(now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&ist_offset());
        let minutes = local.hour() * 60 + local.minute();
        minutes >= 9 * 60 + 15 && minutes <= 9 * 60 + 30
    }

    fn day_key(now: DateTime<Utc>) -> String {
        now.with_timezone(&ist_offset()).format("%Y-%m-%d").to_string()
    }

    /// Fold a fresh bar into today's band. Only effective inside the
    /// tracking window.
    pub fn update(&mut self, instrument: &str, high: f64, low: f64, volume: f64, now: DateTime<Utc>) {
        if !Self::in_tracking_window(now) {
            return;
        }
        let day = self.days.entry(Self::day_key(now)).or_default();
        let range = day.entry(instrument.to_string()).or_insert(OpeningRange {
            high,
            low,
            volume: 0.0,
            breakout: None,
        });
        range.high = range.high.max(high);
        range.low = range.low.min(low);
        range.volume += volume;
        self.persist();
    }

    /// Detect and record a breakout after the window closes.
    ///
    /// Returns the breakout side when one is on record for today (whether
    /// recorded now or earlier in the session).
    pub fn check_breakout(
        &mut self,
        instrument: &str,
        price: f64,
        now: DateTime<Utc>,
    ) -> Option<Direction> {
        if Self::in_tracking_window(now) {
            return None;
        }
        let key = Self::day_key(now);
        let range = self.days.get_mut(&key)?.get_mut(instrument)?;

        if let Some(breakout) = &range.breakout {
            return Some(breakout.direction);
        }

        // A band narrower than the floor is noise, not a range
        if range.high - range.low < range.high * MIN_RANGE_PCT {
            return None;
        }

        let direction = if price > range.high {
            Direction::Buy
        } else if price < range.low {
            Direction::Sell
        } else {
            return None;
        };

        range.breakout = Some(OrbBreakout {
            direction,
            price,
            time: now,
        });
        logger::info(
            LogTag::Filters,
            &format!(
                "{}: opening-range breakout {} @ {}",
                instrument,
                direction.as_str(),
                price
            ),
        );
        self.persist();
        Some(direction)
    }

    /// Drop per-day records older than the retention horizon
    pub fn cleanup(&mut self, now: DateTime<Utc>) {
        let cutoff = (now.with_timezone(&ist_offset()).date_naive()
            - chrono::Duration::days(RETENTION_DAYS))
        .format("%Y-%m-%d")
        .to_string();
        let before = self.days.len();
        self.days.retain(|day, _| day.as_str() >= cutoff.as_str());
        if self.days.len() != before {
            self.persist();
        }
    }

    fn persist(&self) {
        if let Err(e) = atomic_write_json(&self.path, &self.days) {
            logger::error(
                LogTag::Filters,
                &format!("Failed to persist opening ranges: {}", e),
            );
        }
    }
}
