//! Telegram alerting
//!
//! Fire-and-forget pushes for lifecycle events, filterable per recipient by
//! instrument category. Send failures are logged and never surface to the
//! engine.

pub mod formatters;
pub mod notifier;
pub mod subscribers;

pub use notifier::TelegramNotifier;
pub use subscribers::{load_recipients, Recipient};
