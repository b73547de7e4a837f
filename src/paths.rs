//! Centralized path resolution for BiasBuster
//!
//! All file and directory paths are resolved through this module so the
//! engine, webserver and tools agree on where state lives.
//!
//! ## Directory Structure
//!
//! ```text
//! <base>/
//! ├── data/
//! │   ├── config.json
//! │   ├── active_positions.json
//! │   ├── signal_history.json
//! │   ├── signals.json
//! │   ├── opening_ranges.json
//! │   ├── premarket_cues.json
//! │   └── telegram_subscribers.json
//! └── logs/
//!     └── biasbuster.log
//! ```

use once_cell::sync::Lazy;
use std::path::PathBuf;

/// Lazy-initialized base directory (thread-safe)
///
/// `BIASBUSTER_HOME` overrides the default of the current working directory,
/// which matches how the bot is normally run (alongside its data files).
static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(dir) = std::env::var("BIASBUSTER_HOME") {
        return PathBuf::from(dir);
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
});

/// Returns the base directory for all BiasBuster data
pub fn get_base_directory() -> PathBuf {
    BASE_DIRECTORY.clone()
}

/// Returns the data directory path
pub fn get_data_directory() -> PathBuf {
    BASE_DIRECTORY.join("data")
}

/// Returns the logs directory path
pub fn get_logs_directory() -> PathBuf {
    BASE_DIRECTORY.join("logs")
}

/// Path of the JSON configuration file
pub fn get_config_path() -> PathBuf {
    get_data_directory().join("config.json")
}

/// Path of the active-position store
pub fn get_positions_path() -> PathBuf {
    get_data_directory().join("active_positions.json")
}

/// Path of the signal history log
pub fn get_history_path() -> PathBuf {
    get_data_directory().join("signal_history.json")
}

/// Path of the published per-cycle snapshot (read by the dashboard)
pub fn get_signals_path() -> PathBuf {
    get_data_directory().join("signals.json")
}

/// Path of the opening-range tracker state
pub fn get_opening_ranges_path() -> PathBuf {
    get_data_directory().join("opening_ranges.json")
}

/// Path of the cached pre-market cues
pub fn get_premarket_path() -> PathBuf {
    get_data_directory().join("premarket_cues.json")
}

/// Path of the Telegram subscribers file
pub fn get_subscribers_path() -> PathBuf {
    get_data_directory().join("telegram_subscribers.json")
}

/// Path of the log file
pub fn get_log_file_path() -> PathBuf {
    get_logs_directory().join("biasbuster.log")
}

/// Ensure all required directories exist
///
/// Must run before logger initialization (the logger needs the logs
/// directory to create its file sink).
pub fn ensure_all_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_data_directory())?;
    std::fs::create_dir_all(get_logs_directory())?;
    Ok(())
}
