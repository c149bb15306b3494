// src/connectors/mod.rs
pub mod alpaca;
pub mod error;
pub mod messages;
pub mod questrade;
pub mod traits;

#[cfg(test)]
pub mod mock;

use crate::config::{AppConfig, BrokerKind};
use alpaca::AlpacaClient;
use anyhow::{Context, Result};
use error::BrokerError;
use messages::ApiErrorBody;
use questrade::QuestradeClient;
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use traits::BrokerClient;

/// Crypto pairs are written `BASE/QUOTE`; everything else is an equity.
pub fn is_crypto(symbol: &str) -> bool {
    symbol.contains('/')
}

/// Decodes a JSON body, turning non-2xx responses into `BrokerError::Api`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
) -> Result<T, BrokerError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        return Err(BrokerError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&text)?)
}

pub async fn build_broker(config: &AppConfig) -> Result<Arc<dyn BrokerClient>> {
    let timeout = Duration::from_secs(config.http_timeout_secs);
    match config.broker {
        BrokerKind::Alpaca => {
            let credentials = config.alpaca_credentials()?;
            let client = AlpacaClient::new(credentials, timeout)
                .context("Failed to build Alpaca client")?;
            Ok(Arc::new(client))
        }
        BrokerKind::Questrade => {
            let token = config.questrade_token()?;
            let client = QuestradeClient::connect(&config.questrade, token, timeout)
                .await
                .context("Failed to connect to Questrade")?;
            Ok(Arc::new(client))
        }
    }
}
