// src/core/market_hours.rs
use crate::config::MarketHoursConfig;
use crate::connectors::is_crypto;
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

/// Equity session gate. Crypto pairs trade around the clock.
#[derive(Debug, Clone)]
pub struct MarketHours {
    tz: Tz,
    open: NaiveTime,
    close: NaiveTime,
}

impl MarketHours {
    pub fn from_config(config: &MarketHoursConfig) -> anyhow::Result<Self> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("Unknown timezone {}: {}", config.timezone, e))?;
        let open = NaiveTime::parse_from_str(&config.open, "%H:%M")?;
        let close = NaiveTime::parse_from_str(&config.close, "%H:%M")?;

        let buffer = Duration::minutes(config.buffer_minutes);
        let open = open + buffer;
        let close = close - buffer;
        if open >= close {
            anyhow::bail!(
                "Market session {}-{} is empty after a {} minute buffer",
                config.open,
                config.close,
                config.buffer_minutes
            );
        }

        Ok(Self { tz, open, close })
    }

    pub fn is_tradable(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        is_crypto(symbol) || self.is_session_open(now)
    }

    pub fn is_session_open(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.tz);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let time = local.time();
        time >= self.open && time <= self.close
    }
}
