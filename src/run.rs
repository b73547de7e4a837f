//! Startup orchestration
//!
//! Wires the stores, collaborators and the engine together, spawns the
//! webserver, and runs the poll loop until shutdown.

use std::sync::Arc;
use tokio::sync::Notify;

use crate::config::Config;
use crate::engine::Engine;
use crate::filters::orb::OrbTracker;
use crate::filters::premarket::PremarketProvider;
use crate::logger::{self, LogTag};
use crate::marketdata::YahooChartSource;
use crate::positions::{HistoryLog, PositionStore};
use crate::snapshot::new_shared_snapshot;
use crate::telegram::{load_recipients, TelegramNotifier};
use crate::webserver::AppState;
use crate::{paths, shutdown};

pub async fn run_bot() -> Result<(), String> {
    logger::info(LogTag::System, "BiasBuster starting up...");

    // 1. Configuration (written with defaults on first run)
    let config = Config::load(&paths::get_config_path())
        .map_err(|e| format!("Failed to load config: {}", e))?;
    logger::info(
        LogTag::Config,
        &format!(
            "Configuration loaded: {} instruments, {}s poll interval",
            config.instruments.len(),
            config.engine.poll_interval_seconds
        ),
    );

    // 2. State: positions (with snapshot recovery), history, opening ranges
    let store = Arc::new(PositionStore::load(
        paths::get_positions_path(),
        &paths::get_signals_path(),
    ));
    logger::info(
        LogTag::Positions,
        &format!("{} positions in flight", store.open_count().await),
    );
    let history = Arc::new(HistoryLog::load(
        paths::get_history_path(),
        config.engine.history_cap,
    ));
    let orb = OrbTracker::load(paths::get_opening_ranges_path());
    let premarket = Arc::new(PremarketProvider::new(
        paths::get_premarket_path(),
        config.filters.premarket_max_age_hours,
    ));

    // 3. Notifications
    let notifier = if config.telegram.enabled {
        let recipients =
            load_recipients(&paths::get_subscribers_path(), &config.telegram.chat_ids);
        match TelegramNotifier::new(&config.telegram.bot_token, recipients) {
            Ok(notifier) => {
                logger::info(LogTag::Telegram, "Telegram alerts enabled");
                Some(Arc::new(notifier))
            }
            Err(e) => {
                logger::warning(
                    LogTag::Telegram,
                    &format!("Telegram disabled: {}", e),
                );
                None
            }
        }
    } else {
        None
    };

    if let Some(notifier) = &notifier {
        let notifier = Arc::clone(notifier);
        let count = config.instruments.len();
        tokio::spawn(async move {
            notifier.notify_startup(count).await;
        });
    }

    // 4. Shared snapshot + webserver
    let snapshot = new_shared_snapshot();
    let shutdown_notify = Arc::new(Notify::new());
    shutdown::install_handlers(Arc::clone(&shutdown_notify))
        .map_err(|e| format!("Failed to install signal handlers: {}", e))?;

    let webserver_handle = if config.webserver.enabled {
        let state = Arc::new(AppState::new(
            Arc::clone(&snapshot),
            Arc::clone(&store),
            Arc::clone(&history),
            Arc::clone(&premarket),
        ));
        let server_config = config.webserver.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = crate::webserver::start_server(&server_config, state).await {
                logger::error(LogTag::Webserver, &format!("Webserver failed: {}", e));
            }
        }))
    } else {
        None
    };

    // 5. The engine loop
    let source = Arc::new(YahooChartSource::new());
    let mut engine = Engine::new(
        config,
        source,
        store,
        history,
        notifier,
        premarket,
        orb,
        snapshot,
        paths::get_signals_path(),
    );
    engine.run(Arc::clone(&shutdown_notify)).await;

    // 6. Wind down
    shutdown::request_shutdown(&shutdown_notify);
    if let Some(handle) = webserver_handle {
        let _ = handle.await;
    }
    logger::flush();
    logger::info(LogTag::System, "BiasBuster stopped");
    Ok(())
}
