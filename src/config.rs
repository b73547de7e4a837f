use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::instruments::{Category, InstrumentSpec};
use crate::reentry::ReentryConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub instruments: Vec<InstrumentSpec>,
    pub engine: EngineConfig,
    pub data: DataConfig,
    pub filters: FiltersConfig,
    #[serde(default)]
    pub reentry: ReentryConfig,
    pub telegram: TelegramConfig,
    pub webserver: WebserverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between full evaluation cycles
    pub poll_interval_seconds: u64,
    /// Events kept in the signal history log
    pub history_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Fetch attempts per series, including the first
    pub retry_attempts: u32,
    /// Fixed delay between attempts, seconds
    pub retry_backoff_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// Last closed bar must trade this multiple of its trailing average
    pub volume_multiple: f64,
    /// Bars in the trailing volume average
    pub volume_lookback: usize,
    /// Minutes after the Indian open during which pre-market cues gate entries
    pub premarket_window_minutes: u32,
    /// Hours before the cached pre-market report goes stale
    pub premarket_max_age_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    /// Fallback recipients when no subscribers file exists
    #[serde(default)]
    pub chat_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebserverConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instruments: default_instruments(),
            engine: EngineConfig {
                poll_interval_seconds: 60,
                history_cap: 100,
            },
            data: DataConfig {
                retry_attempts: 3,
                retry_backoff_seconds: 2,
            },
            filters: FiltersConfig {
                volume_multiple: 1.2,
                volume_lookback: 20,
                premarket_window_minutes: 75,
                premarket_max_age_hours: 24,
            },
            reentry: ReentryConfig::default(),
            telegram: TelegramConfig {
                enabled: false,
                bot_token: String::new(),
                chat_ids: vec![],
            },
            webserver: WebserverConfig {
                enabled: true,
                host: "127.0.0.1".to_string(),
                port: 8003,
            },
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let default_config = Self::default();
            default_config.save(path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.instruments.is_empty() {
            anyhow::bail!("config contains no instruments");
        }
        for spec in &self.instruments {
            if spec.tick_size <= 0.0 {
                anyhow::bail!("instrument {} has non-positive tick size", spec.name);
            }
            if spec.symbol.is_empty() {
                anyhow::bail!("instrument {} has no quote symbol", spec.name);
            }
        }
        let mut names: Vec<&str> = self.instruments.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.instruments.len() {
            anyhow::bail!("duplicate instrument names in config");
        }
        if self.telegram.enabled && self.telegram.bot_token.is_empty() {
            anyhow::bail!("telegram enabled but bot_token is empty");
        }
        Ok(())
    }
}

/// The default instrument universe
fn default_instruments() -> Vec<InstrumentSpec> {
    use Category::*;
    vec![
        // Metals & energy
        InstrumentSpec::new("US Oil (WTI)", "CL=F", 0.01, MetalsEnergy),
        InstrumentSpec::new("Brent Crude Oil", "BZ=F", 0.01, MetalsEnergy),
        InstrumentSpec::new("Natural Gas", "NG=F", 0.001, MetalsEnergy),
        InstrumentSpec::new("Gold", "GC=F", 0.1, MetalsEnergy),
        InstrumentSpec::new("Silver", "SI=F", 0.005, MetalsEnergy),
        InstrumentSpec::new("Platinum", "PL=F", 0.1, MetalsEnergy),
        InstrumentSpec::new("Palladium", "PA=F", 0.1, MetalsEnergy),
        // Forex majors and crosses
        InstrumentSpec::new("EUR/USD", "EURUSD=X", 0.0001, Forex),
        InstrumentSpec::new("USD/JPY", "USDJPY=X", 0.01, Forex),
        InstrumentSpec::new("AUD/USD", "AUDUSD=X", 0.0001, Forex),
        InstrumentSpec::new("USD/CHF", "USDCHF=X", 0.0001, Forex),
        InstrumentSpec::new("NZD/USD", "NZDUSD=X", 0.0001, Forex),
        InstrumentSpec::new("USD/CAD", "USDCAD=X", 0.0001, Forex),
        InstrumentSpec::new("EUR/GBP", "EURGBP=X", 0.0001, Forex),
        InstrumentSpec::new("EUR/JPY", "EURJPY=X", 0.01, Forex),
        InstrumentSpec::new("GBP/JPY", "GBPJPY=X", 0.01, Forex),
        InstrumentSpec::new("AUD/JPY", "AUDJPY=X", 0.01, Forex),
        InstrumentSpec::new("NZD/JPY", "NZDJPY=X", 0.01, Forex),
        InstrumentSpec::new("GBP/CHF", "GBPCHF=X", 0.0001, Forex),
        InstrumentSpec::new("EUR/CAD", "EURCAD=X", 0.0001, Forex),
        InstrumentSpec::new("AUD/CAD", "AUDCAD=X", 0.0001, Forex),
        InstrumentSpec::new("CAD/JPY", "CADJPY=X", 0.01, Forex),
        InstrumentSpec::new("CHF/JPY", "CHFJPY=X", 0.01, Forex),
        // Crypto majors trade around the clock and move too fast for the
        // 200-EMA trend rule; they run the relaxed profile
        InstrumentSpec::new("Bitcoin", "BTC-USD", 1.0, CryptoScalping).relaxed(),
        InstrumentSpec::new("Ethereum", "ETH-USD", 0.1, CryptoScalping).relaxed(),
        InstrumentSpec::new("Solana", "SOL-USD", 0.01, CryptoScalping),
        InstrumentSpec::new("Ripple", "XRP-USD", 0.0001, CryptoScalping),
        InstrumentSpec::new("Cardano", "ADA-USD", 0.0001, CryptoScalping),
        InstrumentSpec::new("Dogecoin", "DOGE-USD", 0.00001, CryptoScalping),
        InstrumentSpec::new("Polkadot", "DOT-USD", 0.01, CryptoScalping),
        // Indian cash indices
        InstrumentSpec::new("Nifty 50", "^NSEI", 0.05, IndianIntraday),
        InstrumentSpec::new("Bank Nifty", "^NSEBANK", 0.05, IndianIntraday),
        InstrumentSpec::new("Sensex", "^BSESN", 0.05, IndianIntraday),
        // Index futures with monthly contract roll
        InstrumentSpec::new("Nifty Future", "^NSEI", 0.05, IndianFutures)
            .with_futures_base("NIFTY"),
        InstrumentSpec::new("Bank Nifty Future", "^NSEBANK", 0.05, IndianFutures)
            .with_futures_base("BANKNIFTY"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::RuleProfile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert!(config.instruments.len() > 30);
    }

    #[test]
    fn test_relaxed_profiles_assigned() {
        let config = Config::default();
        let btc = config
            .instruments
            .iter()
            .find(|s| s.name == "Bitcoin")
            .unwrap();
        assert_eq!(btc.rule_profile, RuleProfile::Relaxed);

        let sol = config
            .instruments
            .iter()
            .find(|s| s.name == "Solana")
            .unwrap();
        assert_eq!(sol.rule_profile, RuleProfile::Standard);
    }

    #[test]
    fn test_futures_instruments_have_bases() {
        let config = Config::default();
        let nifty = config
            .instruments
            .iter()
            .find(|s| s.name == "Nifty Future")
            .unwrap();
        assert_eq!(nifty.futures_base.as_deref(), Some("NIFTY"));
        assert_eq!(nifty.category, Category::IndianFutures);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.engine.poll_interval_seconds, 60);

        // Second load reads the written file back
        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.instruments.len(), config.instruments.len());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut config = Config::default();
        let duplicate = config.instruments[0].clone();
        config.instruments.push(duplicate);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_telegram_requires_token_when_enabled() {
        let mut config = Config::default();
        config.telegram.enabled = true;
        assert!(config.validate().is_err());
        config.telegram.bot_token = "123:abc".to_string();
        config.validate().unwrap();
    }
}
