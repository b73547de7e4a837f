//! Subscriber resolution
//!
//! Recipients come from the subscribers JSON file when present (chat id to
//! active flag plus category preferences), else from the manual chat id list
//! in the config. An empty category list, or the `ALL` wildcard, receives
//! everything.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::logger::{self, LogTag};
use crate::utils::load_json_or_none;

/// One entry of the subscribers file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberEntry {
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub categories: Vec<String>,
}

fn default_active() -> bool {
    true
}

/// A resolved notification recipient
#[derive(Debug, Clone)]
pub struct Recipient {
    pub chat_id: i64,
    /// Empty means "all categories"
    pub categories: Vec<String>,
}

impl Recipient {
    /// Whether this recipient wants alerts for the given category
    pub fn wants_category(&self, category: &str) -> bool {
        if self.categories.is_empty() {
            return true;
        }
        self.categories
            .iter()
            .any(|c| c == "ALL" || c == category)
    }
}

/// Resolve the recipient list from the subscribers file, falling back to the
/// manual chat id list.
pub fn load_recipients(path: &Path, fallback_chat_ids: &[String]) -> Vec<Recipient> {
    if let Some(subscribers) = load_json_or_none::<HashMap<String, SubscriberEntry>>(path) {
        let recipients: Vec<Recipient> = subscribers
            .into_iter()
            .filter(|(_, entry)| entry.active)
            .filter_map(|(chat_id, entry)| match chat_id.parse::<i64>() {
                Ok(id) => Some(Recipient {
                    chat_id: id,
                    categories: entry.categories,
                }),
                Err(_) => {
                    logger::warning(
                        LogTag::Telegram,
                        &format!("Skipping invalid subscriber chat id: {}", chat_id),
                    );
                    None
                }
            })
            .collect();
        if !recipients.is_empty() {
            logger::info(
                LogTag::Telegram,
                &format!("Loaded {} subscribers from {}", recipients.len(), path.display()),
            );
            return recipients;
        }
    }

    fallback_chat_ids
        .iter()
        .filter_map(|raw| match raw.trim().parse::<i64>() {
            Ok(id) => Some(Recipient {
                chat_id: id,
                categories: Vec::new(),
            }),
            Err(_) => {
                logger::warning(
                    LogTag::Telegram,
                    &format!("Skipping invalid chat id in config: {}", raw),
                );
                None
            }
        })
        .collect()
}
