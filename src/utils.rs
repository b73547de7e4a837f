use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Notify;

use crate::logger::{self, LogTag};

/// Waits for either shutdown signal or delay. Returns true if shutdown was triggered.
pub async fn check_shutdown_or_delay(shutdown: &Notify, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.notified() => true,
    }
}

/// Serialize a value to pretty JSON and write it atomically.
///
/// The dashboard reads the same files concurrently, so the write goes to a
/// sibling temp file first and is renamed into place.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load a JSON file, returning None when the file is absent or unparsable.
/// Parse failures are logged so corrupt state is visible.
pub fn load_json_or_none<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            logger::warning(
                LogTag::System,
                &format!("Failed to parse {}: {}", path.display(), e),
            );
            None
        }
    }
}

/// Helper function to format duration in a compact way
pub fn format_duration_compact(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let total_seconds = end.signed_duration_since(start).num_seconds().max(0);

    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        format!("{}m", total_seconds / 60)
    } else if total_seconds < 86400 {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        if minutes > 0 {
            format!("{}h{}m", hours, minutes)
        } else {
            format!("{}h", hours)
        }
    } else {
        let days = total_seconds / 86400;
        let hours = (total_seconds % 86400) / 3600;
        if hours > 0 {
            format!("{}d{}h", days, hours)
        } else {
            format!("{}d", days)
        }
    }
}

/// Format a price with a precision that fits the instrument's tick size.
///
/// A 0.0001-pip forex pair renders with 5 decimals, an index future with 2.
pub fn format_price(price: f64, tick_size: f64) -> String {
    let decimals = if tick_size >= 1.0 {
        2
    } else {
        // One digit more than the tick itself, mirroring broker quote feeds
        let mut d = 0u32;
        let mut t = tick_size;
        while t < 1.0 && d < 8 {
            t *= 10.0;
            d += 1;
        }
        (d + 1).min(8) as usize
    };
    format!("{:.*}", decimals, price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_duration_compact() {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        assert_eq!(
            format_duration_compact(start, start + chrono::Duration::seconds(42)),
            "42s"
        );
        assert_eq!(
            format_duration_compact(start, start + chrono::Duration::minutes(5)),
            "5m"
        );
        assert_eq!(
            format_duration_compact(start, start + chrono::Duration::minutes(125)),
            "2h5m"
        );
        assert_eq!(
            format_duration_compact(start, start + chrono::Duration::hours(49)),
            "2d1h"
        );
    }

    #[test]
    fn test_format_price_precision() {
        assert_eq!(format_price(1.084523, 0.0001), "1.08452");
        assert_eq!(format_price(26285.5, 0.05), "26285.500");
        assert_eq!(format_price(64250.0, 1.0), "64250.00");
    }

    #[test]
    fn test_atomic_write_round_trip() {
        let dir = std::env::temp_dir().join("biasbuster_utils_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("value.json");
        atomic_write_json(&path, &vec![1, 2, 3]).unwrap();
        let loaded: Vec<i32> = load_json_or_none(&path).unwrap();
        assert_eq!(loaded, vec![1, 2, 3]);
        std::fs::remove_dir_all(&dir).ok();
    }
}
