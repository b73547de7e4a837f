use biasbuster::{arguments, logger, paths};
use biasbuster::logger::LogTag;

/// Main entry point for BiasBuster
///
/// Headless service: the engine loop plus the dashboard API webserver.
/// `--once` runs a single evaluation cycle and exits, which suits
/// cron-style scheduling.
#[tokio::main]
async fn main() {
    // Directories must exist before the logger opens its file sink
    if let Err(e) = paths::ensure_all_directories() {
        eprintln!("Failed to create required directories: {}", e);
        std::process::exit(1);
    }

    logger::init();

    if arguments::is_help_requested() {
        arguments::print_help();
        std::process::exit(0);
    }

    match biasbuster::run::run_bot().await {
        Ok(_) => {
            logger::info(LogTag::System, "BiasBuster completed successfully");
        }
        Err(e) => {
            logger::error(LogTag::System, &format!("BiasBuster failed: {}", e));
            std::process::exit(1);
        }
    }
}
