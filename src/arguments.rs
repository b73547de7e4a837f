/// Centralized argument handling for BiasBuster
///
/// Consolidates command-line argument parsing and debug flag checking so the
/// logger and individual modules never touch `std::env` directly.
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
///
/// Thread-safe singleton so tests and tools can override `env::args()`.
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments (tests and tools)
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present on the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value following a flag, e.g. `--port 9090`
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// MODE FLAGS
// =============================================================================

/// Run one full evaluation cycle and exit (useful for cron-style scheduling)
pub fn is_run_once_enabled() -> bool {
    has_arg("--once")
}

/// Help requested
pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

/// Verbose logging
pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

/// Quiet logging (warnings and errors only)
pub fn is_quiet_enabled() -> bool {
    has_arg("--quiet")
}

/// Webserver port override
pub fn get_port_override() -> Option<u16> {
    get_arg_value("--port").and_then(|v| v.parse().ok())
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Engine cycle debug mode
pub fn is_debug_engine_enabled() -> bool {
    has_arg("--debug-engine")
}

/// Market-data fetch debug mode
pub fn is_debug_data_enabled() -> bool {
    has_arg("--debug-data")
}

/// Position lifecycle debug mode
pub fn is_debug_positions_enabled() -> bool {
    has_arg("--debug-positions")
}

/// Re-entry scorer debug mode
pub fn is_debug_reentry_enabled() -> bool {
    has_arg("--debug-reentry")
}

/// Entry filter debug mode
pub fn is_debug_filters_enabled() -> bool {
    has_arg("--debug-filters")
}

/// Telegram debug mode
pub fn is_debug_telegram_enabled() -> bool {
    has_arg("--debug-telegram")
}

/// Webserver debug mode
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// Print the CLI help text
pub fn print_help() {
    println!("BiasBuster - multi-timeframe signal engine");
    println!();
    println!("USAGE:");
    println!("  biasbuster [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("  --once                Run a single evaluation cycle and exit");
    println!("  --port <PORT>         Override the dashboard API port");
    println!("  --verbose             Show verbose logs");
    println!("  --quiet               Only warnings and errors");
    println!("  --debug-engine        Engine cycle diagnostics");
    println!("  --debug-data          Market-data fetch diagnostics");
    println!("  --debug-positions     Position lifecycle diagnostics");
    println!("  --debug-reentry       Re-entry scorer diagnostics");
    println!("  --debug-filters       Entry filter diagnostics");
    println!("  --debug-telegram      Telegram diagnostics");
    println!("  --debug-webserver     Webserver diagnostics");
    println!("  -h, --help            Print this help");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_value_lookup() {
        set_cmd_args(vec![
            "biasbuster".to_string(),
            "--port".to_string(),
            "9090".to_string(),
        ]);
        assert_eq!(get_arg_value("--port").as_deref(), Some("9090"));
        assert_eq!(get_port_override(), Some(9090));
        assert!(!has_arg("--once"));
        set_cmd_args(vec!["biasbuster".to_string()]);
    }
}
