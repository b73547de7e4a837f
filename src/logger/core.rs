/// Core logging implementation with automatic filtering
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Everything above the minimum level threshold is dropped
/// 3. Debug level requires the matching `--debug-<module>` flag
/// 4. Verbose level requires `--verbose`
use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments;
use once_cell::sync::Lazy;

/// Minimum level resolved once from command-line flags
static MIN_LEVEL: Lazy<LogLevel> = Lazy::new(|| {
    if arguments::is_verbose_enabled() {
        LogLevel::Verbose
    } else if arguments::is_quiet_enabled() {
        LogLevel::Warning
    } else {
        LogLevel::Info
    }
});

/// Whether `--debug-<tag>` was passed for this tag
fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    arguments::has_arg(&format!("--debug-{}", tag.to_debug_key()))
}

/// Check if a log message should be displayed
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    if level == LogLevel::Debug {
        return *MIN_LEVEL >= LogLevel::Verbose || is_debug_enabled_for_tag(tag);
    }

    level <= *MIN_LEVEL
}

/// Internal logging function with automatic filtering
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level, message);
}
