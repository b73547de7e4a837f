//! Telegram notifier for lifecycle alerts
//!
//! One notifier instance fans every alert out to the resolved recipients,
//! honoring per-recipient category preferences. Sends are fire-and-forget
//! from the engine's perspective: failures are logged, never propagated.

use futures::future::join_all;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use super::formatters;
use super::subscribers::Recipient;
use crate::logger::{self, LogTag};
use crate::positions::{Position, TradeMetrics};
use crate::reentry::ReentryOpportunity;

pub struct TelegramNotifier {
    bot: Bot,
    recipients: Vec<Recipient>,
}

impl TelegramNotifier {
    /// Create a notifier; fails when the token is empty or no recipient
    /// could be resolved.
    pub fn new(bot_token: &str, recipients: Vec<Recipient>) -> Result<Self, String> {
        if bot_token.is_empty() {
            return Err("Bot token is empty".to_string());
        }
        if recipients.is_empty() {
            return Err("No Telegram recipients configured".to_string());
        }
        Ok(Self {
            bot: Bot::new(bot_token),
            recipients,
        })
    }

    /// Send a message to every recipient subscribed to `category`
    pub async fn send_message(&self, message: &str, category: Option<&str>) {
        let sends = self
            .recipients
            .iter()
            .filter(|r| category.map_or(true, |c| r.wants_category(c)))
            .map(|recipient| {
                let bot = self.bot.clone();
                let chat_id = ChatId(recipient.chat_id);
                let text = message.to_string();
                async move {
                    if let Err(e) = bot
                        .send_message(chat_id, text)
                        .parse_mode(ParseMode::Html)
                        .await
                    {
                        logger::warning(
                            LogTag::Telegram,
                            &format!("Failed to send to chat {}: {}", chat_id.0, e),
                        );
                        false
                    } else {
                        true
                    }
                }
            });

        let results = join_all(sends).await;
        let sent = results.iter().filter(|ok| **ok).count();
        logger::debug(
            LogTag::Telegram,
            &format!("Delivered to {}/{} recipients", sent, results.len()),
        );
    }

    pub async fn notify_new_signal(&self, position: &Position, tick_size: f64) {
        let message = formatters::new_signal_message(position, tick_size);
        self.send_message(&message, Some(position.category.as_str()))
            .await;
    }

    pub async fn notify_tp_hit(&self, position: &Position, level: usize, price: f64, tick_size: f64) {
        let message = formatters::tp_hit_message(position, level, price, tick_size);
        self.send_message(&message, Some(position.category.as_str()))
            .await;
    }

    pub async fn notify_sl_hit(
        &self,
        position: &Position,
        price: f64,
        is_trailing: bool,
        metrics: &TradeMetrics,
        tick_size: f64,
    ) {
        let message = formatters::sl_hit_message(position, price, is_trailing, metrics, tick_size);
        self.send_message(&message, Some(position.category.as_str()))
            .await;
    }

    pub async fn notify_reversal_close(
        &self,
        position: &Position,
        price: f64,
        metrics: &TradeMetrics,
        tick_size: f64,
    ) {
        let message = formatters::reversal_close_message(position, price, metrics, tick_size);
        self.send_message(&message, Some(position.category.as_str()))
            .await;
    }

    pub async fn notify_reentry(&self, position: &Position, opportunity: &ReentryOpportunity) {
        let message = formatters::reentry_message(&position.instrument, opportunity);
        self.send_message(&message, Some(position.category.as_str()))
            .await;
    }

    pub async fn notify_startup(&self, instrument_count: usize) {
        let message = formatters::startup_message(instrument_count);
        self.send_message(&message, None).await;
    }
}
