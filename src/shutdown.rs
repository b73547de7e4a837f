//! Graceful shutdown signaling
//!
//! A single `Notify` fans the stop request out to the engine loop and the
//! webserver. The engine finishes (or abandons between instruments) its
//! current cycle; the position store is already persisted after every
//! mutation, so there is nothing to flush besides the log file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger::{self, LogTag};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Whether a shutdown has been requested
pub fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Acquire)
}

/// Request a shutdown: flips the flag and wakes every waiter
pub fn request_shutdown(notify: &Notify) {
    if SHUTDOWN_REQUESTED.swap(true, Ordering::AcqRel) {
        return;
    }
    logger::info(LogTag::System, "Graceful shutdown initiated");
    notify.notify_waiters();
    crate::webserver::shutdown();
}

/// Install Ctrl+C (and SIGTERM on Unix) handlers that trigger the shutdown
pub fn install_handlers(notify: Arc<Notify>) -> anyhow::Result<()> {
    {
        let notify = Arc::clone(&notify);
        ctrlc::set_handler(move || {
            request_shutdown(&notify);
        })?;
    }

    #[cfg(unix)]
    {
        let notify = Arc::clone(&notify);
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(e) => {
                    logger::warning(
                        LogTag::System,
                        &format!("Failed to install SIGTERM handler: {}", e),
                    );
                    return;
                }
            };
            sigterm.recv().await;
            request_shutdown(&notify);
        });
    }

    Ok(())
}
