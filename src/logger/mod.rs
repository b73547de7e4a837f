//! Structured logging for BiasBuster
//!
//! Tag + level logging with per-module debug control:
//! - Standard levels (Error/Warning/Info/Debug/Verbose)
//! - `--debug-<module>` flags enable debug output per tag
//! - Dual output: colored console + plain file sink
//!
//! ## Usage
//!
//! ```rust,ignore
//! use biasbuster::logger::{self, LogTag};
//!
//! logger::info(LogTag::Engine, "Cycle complete");
//! logger::debug(LogTag::Data, "Raw response ..."); // only with --debug-data
//! ```
//!
//! Call `logger::init()` once at startup, after the directories exist.

mod core;
mod format;
mod levels;
mod tags;

pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Opens the file sink; level filtering is resolved lazily from the
/// command-line flags on first use.
pub fn init() {
    format::init_file_sink();
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level; only shown with the matching `--debug-<module>` flag
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level; only shown with `--verbose`
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Flush pending log writes (call during shutdown)
pub fn flush() {
    format::flush_file_sink();
}
