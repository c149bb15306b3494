// src/config.rs

use crate::types::TimeInForce;
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Missing {broker} credentials for {mode} mode: {missing}")]
    MissingCredentials {
        broker: &'static str,
        mode: &'static str,
        missing: String,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    #[default]
    Paper,
    Live,
}

impl TradingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingMode::Paper => "paper",
            TradingMode::Live => "live",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    #[default]
    Alpaca,
    Questrade,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    SmaCrossover,
    PriceBand,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PriceBand {
    pub low: Decimal,
    pub high: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    pub short_window: usize,
    pub long_window: usize,
    pub bands: HashMap<String, PriceBand>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: StrategyKind::SmaCrossover,
            short_window: 10,
            long_window: 50,
            bands: HashMap::new(),
        }
    }
}

/// Forced exits on unrealized percentage gain or loss.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RiskConfig {
    pub enabled: bool,
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            take_profit_pct: Decimal::TEN,
            stop_loss_pct: Decimal::from(5),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarketHoursConfig {
    pub timezone: String,
    pub open: String,
    pub close: String,
    /// Minutes trimmed from both ends of the session.
    pub buffer_minutes: i64,
    pub closed_poll_secs: u64,
}

impl Default for MarketHoursConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            open: "09:30".to_string(),
            close: "16:00".to_string(),
            buffer_minutes: 0,
            closed_poll_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlpacaSettings {
    pub paper_api_key: Option<String>,
    pub paper_secret_key: Option<String>,
    pub live_api_key: Option<String>,
    pub live_secret_key: Option<String>,
    pub paper_base_url: String,
    pub live_base_url: String,
    pub data_base_url: String,
}

impl Default for AlpacaSettings {
    fn default() -> Self {
        Self {
            paper_api_key: None,
            paper_secret_key: None,
            live_api_key: None,
            live_secret_key: None,
            paper_base_url: "https://paper-api.alpaca.markets".to_string(),
            live_base_url: "https://api.alpaca.markets".to_string(),
            data_base_url: "https://data.alpaca.markets".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuestradeSettings {
    pub access_token: Option<String>,
    pub api_server: String,
    pub account_id: Option<String>,
    pub currency: String,
}

impl Default for QuestradeSettings {
    fn default() -> Self {
        Self {
            access_token: None,
            api_server: "https://api01.iq.questrade.com".to_string(),
            account_id: None,
            currency: "USD".to_string(),
        }
    }
}

/// Key pair and trading endpoint chosen for the active mode.
#[derive(Debug, Clone)]
pub struct AlpacaCredentials {
    pub api_key: String,
    pub secret_key: String,
    pub base_url: String,
    pub data_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub mode: TradingMode,
    pub broker: BrokerKind,
    pub assets: Vec<String>,
    pub default_allocation: Decimal,
    pub allocations: HashMap<String, Decimal>,
    pub check_interval_secs: u64,
    pub time_in_force: TimeInForce,
    pub state_file: String,
    pub log_dir: String,
    pub close_on_startup: bool,
    pub liquidate_on_exit: bool,
    pub verify_tradable: bool,
    pub profit_target: Option<Decimal>,
    pub http_timeout_secs: u64,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    pub market_hours: MarketHoursConfig,
    pub alpaca: AlpacaSettings,
    pub questrade: QuestradeSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: TradingMode::Paper,
            broker: BrokerKind::Alpaca,
            assets: vec![
                "DOGE/USD".to_string(),
                "BCH/USD".to_string(),
                "LTC/USD".to_string(),
            ],
            default_allocation: Decimal::from(20),
            allocations: HashMap::new(),
            check_interval_secs: 300,
            time_in_force: TimeInForce::Gtc,
            state_file: "bot_state.json".to_string(),
            log_dir: "logs".to_string(),
            close_on_startup: false,
            liquidate_on_exit: false,
            verify_tradable: false,
            profit_target: None,
            http_timeout_secs: 30,
            strategy: StrategyConfig::default(),
            risk: RiskConfig::default(),
            market_hours: MarketHoursConfig::default(),
            alpaca: AlpacaSettings::default(),
            questrade: QuestradeSettings::default(),
        }
    }
}

impl AppConfig {
    /// Layers `Settings.toml` (optional), `APP__*` variables, and the bare
    /// broker variables (`TRADING_MODE`, `PAPER_API_KEY`, ...) on top.
    pub fn new() -> Result<Self, SettingsError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("assets")
                    .try_parsing(true),
            )
            .set_override_option("mode", env_lowercase("TRADING_MODE"))?
            .set_override_option("alpaca.paper_api_key", env::var("PAPER_API_KEY").ok())?
            .set_override_option("alpaca.paper_secret_key", env::var("PAPER_SECRET_KEY").ok())?
            .set_override_option("alpaca.live_api_key", env::var("LIVE_API_KEY").ok())?
            .set_override_option("alpaca.live_secret_key", env::var("LIVE_SECRET_KEY").ok())?
            .set_override_option("alpaca.paper_base_url", env::var("PAPER_BASE_URL").ok())?
            .set_override_option("alpaca.live_base_url", env::var("LIVE_BASE_URL").ok())?
            .set_override_option(
                "questrade.access_token",
                env::var("QUESTRADE_ACCESS_TOKEN").ok(),
            )?
            .set_override_option(
                "questrade.api_server",
                env::var("QUESTRADE_API_BASE_URL").ok(),
            )?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.assets.is_empty() {
            return Err(SettingsError::Invalid("no assets configured".into()));
        }
        if self.check_interval_secs == 0 {
            return Err(SettingsError::Invalid(
                "check_interval_secs must be positive".into(),
            ));
        }
        if self.default_allocation <= Decimal::ZERO {
            return Err(SettingsError::Invalid(
                "default_allocation must be positive".into(),
            ));
        }
        let s = &self.strategy;
        if s.kind == StrategyKind::SmaCrossover
            && (s.short_window == 0 || s.short_window >= s.long_window)
        {
            return Err(SettingsError::Invalid(format!(
                "short_window ({}) must be positive and below long_window ({})",
                s.short_window, s.long_window
            )));
        }
        for (symbol, band) in &s.bands {
            if band.low > band.high {
                return Err(SettingsError::Invalid(format!(
                    "price band for {} has low {} above high {}",
                    symbol, band.low, band.high
                )));
            }
        }

        match self.broker {
            BrokerKind::Alpaca => self.alpaca_credentials().map(|_| ()),
            BrokerKind::Questrade => self.questrade_token().map(|_| ()),
        }
    }

    /// Dollar amount to commit to `symbol` on a buy.
    pub fn allocation_for(&self, symbol: &str) -> Decimal {
        lookup_symbol(&self.allocations, symbol)
            .copied()
            .unwrap_or(self.default_allocation)
    }

    pub fn alpaca_credentials(&self) -> Result<AlpacaCredentials, SettingsError> {
        let a = &self.alpaca;
        let (key, secret, base_url, key_name, secret_name) = match self.mode {
            TradingMode::Paper => (
                &a.paper_api_key,
                &a.paper_secret_key,
                &a.paper_base_url,
                "PAPER_API_KEY",
                "PAPER_SECRET_KEY",
            ),
            TradingMode::Live => (
                &a.live_api_key,
                &a.live_secret_key,
                &a.live_base_url,
                "LIVE_API_KEY",
                "LIVE_SECRET_KEY",
            ),
        };

        let missing: Vec<&str> = [(key, key_name), (secret, secret_name)]
            .iter()
            .filter(|(value, _)| value.as_deref().map_or(true, str::is_empty))
            .map(|(_, name)| *name)
            .collect();

        match (key, secret) {
            (Some(k), Some(s)) if missing.is_empty() => Ok(AlpacaCredentials {
                api_key: k.clone(),
                secret_key: s.clone(),
                base_url: base_url.clone(),
                data_base_url: a.data_base_url.clone(),
            }),
            _ => Err(SettingsError::MissingCredentials {
                broker: "Alpaca",
                mode: self.mode.as_str(),
                missing: missing.join(", "),
            }),
        }
    }

    pub fn questrade_token(&self) -> Result<String, SettingsError> {
        match self.questrade.access_token.as_deref() {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(SettingsError::MissingCredentials {
                broker: "Questrade",
                mode: self.mode.as_str(),
                missing: "QUESTRADE_ACCESS_TOKEN".to_string(),
            }),
        }
    }
}

fn env_lowercase(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_lowercase())
}

// Config keys may come back lowercased, so symbols are matched case-insensitively.
fn lookup_symbol<'a, T>(map: &'a HashMap<String, T>, symbol: &str) -> Option<&'a T> {
    map.get(symbol).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(symbol))
            .map(|(_, value)| value)
    })
}
