// src/connectors/questrade.rs
use crate::config::QuestradeSettings;
use crate::connectors::error::{BrokerError, Result};
use crate::connectors::messages::{
    QuestradeAccounts, QuestradeBalances, QuestradeCandles, QuestradeOrderRequest,
    QuestradeOrderResponse, QuestradePositions, QuestradeQuotes, QuestradeSymbol,
    QuestradeSymbols,
};
use crate::connectors::read_json;
use crate::connectors::traits::BrokerClient;
use crate::types::{BrokerPosition, OrderRequest, OrderResponse, Side, Ticker, TimeInForce};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const HISTORY_DAYS: i64 = 7;

/// Bearer-token REST client. The access token must already be valid; token
/// exchange happens outside the bot.
pub struct QuestradeClient {
    access_token: String,
    http_client: Client,
    api_server: Url,
    account_id: String,
    currency: String,
    symbol_ids: Mutex<HashMap<String, QuestradeSymbol>>,
}

impl QuestradeClient {
    /// Builds the client and resolves the account number (first account
    /// when none is configured).
    pub async fn connect(
        settings: &QuestradeSettings,
        access_token: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        let mut client = Self {
            access_token,
            http_client,
            api_server: Url::parse(&settings.api_server)?,
            account_id: settings.account_id.clone().unwrap_or_default(),
            currency: settings.currency.clone(),
            symbol_ids: Mutex::new(HashMap::new()),
        };

        if client.account_id.is_empty() {
            let response = client.request(Method::GET, "/v1/accounts")?.send().await?;
            let accounts: QuestradeAccounts = read_json(response).await?;
            client.account_id = accounts
                .accounts
                .into_iter()
                .next()
                .map(|a| a.number)
                .ok_or_else(|| BrokerError::missing("account", "Questrade login"))?;
            info!("Using Questrade account {}", client.account_id);
        }
        Ok(client)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.api_server.join(path)?;
        Ok(self
            .http_client
            .request(method, url)
            .bearer_auth(&self.access_token))
    }

    async fn lookup_symbol(&self, symbol: &str) -> Result<QuestradeSymbol> {
        let cached = self
            .symbol_ids
            .lock()
            .ok()
            .and_then(|cache| cache.get(symbol).cloned());
        if let Some(found) = cached {
            return Ok(found);
        }

        let response = self
            .request(Method::GET, "/v1/symbols/search")?
            .query(&[("prefix", symbol)])
            .send()
            .await?;
        let found: QuestradeSymbols = read_json(response).await?;
        let entry = found
            .symbols
            .into_iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| BrokerError::missing("symbol id", symbol))?;

        if let Ok(mut cache) = self.symbol_ids.lock() {
            cache.insert(symbol.to_string(), entry.clone());
        }
        Ok(entry)
    }
}

fn time_in_force_name(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::Ioc => "ImmediateOrCancel",
        TimeInForce::Day => "Day",
        TimeInForce::Gtc => "GoodTillCanceled",
    }
}

#[async_trait]
impl BrokerClient for QuestradeClient {
    fn name(&self) -> &'static str {
        "Questrade"
    }

    async fn latest_price(&self, symbol: &str) -> Result<Ticker> {
        let id = self.lookup_symbol(symbol).await?.symbol_id;
        let response = self
            .request(Method::GET, &format!("/v1/markets/quotes/{}", id))?
            .send()
            .await?;
        let quotes: QuestradeQuotes = read_json(response).await?;
        let price = quotes
            .quotes
            .into_iter()
            .next()
            .and_then(|q| q.last_trade_price)
            .ok_or_else(|| BrokerError::missing("last trade price", symbol))?;

        Ok(Ticker {
            symbol: symbol.to_string(),
            price,
            timestamp: Utc::now().timestamp_millis() as u64,
        })
    }

    async fn price_history(&self, symbol: &str) -> Result<Vec<Decimal>> {
        let id = self.lookup_symbol(symbol).await?.symbol_id;
        let end = Utc::now();
        let start = end - ChronoDuration::days(HISTORY_DAYS);
        let response = self
            .request(Method::GET, &format!("/v1/markets/candles/{}", id))?
            .query(&[
                ("startTime", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("endTime", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("interval", "OneMinute".to_string()),
            ])
            .send()
            .await?;
        let candles: QuestradeCandles = read_json(response).await?;
        Ok(candles.candles.into_iter().map(|c| c.close).collect())
    }

    async fn account_cash(&self) -> Result<Decimal> {
        let path = format!("/v1/accounts/{}/balances", self.account_id);
        let response = self.request(Method::GET, &path)?.send().await?;
        let balances: QuestradeBalances = read_json(response).await?;
        balances
            .per_currency_balances
            .into_iter()
            .find(|b| b.currency.eq_ignore_ascii_case(&self.currency))
            .map(|b| b.cash)
            .ok_or_else(|| BrokerError::missing("cash balance", &self.currency))
    }

    async fn list_positions(&self) -> Result<Vec<BrokerPosition>> {
        let path = format!("/v1/accounts/{}/positions", self.account_id);
        let response = self.request(Method::GET, &path)?.send().await?;
        let positions: QuestradePositions = read_json(response).await?;
        Ok(positions
            .positions
            .into_iter()
            .filter(|p| !p.open_quantity.is_zero())
            .map(|p| BrokerPosition {
                symbol: p.symbol,
                quantity: p.open_quantity,
                avg_entry_price: p.average_entry_price,
                market_value: p.current_market_value,
            })
            .collect())
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderResponse> {
        let symbol = self.lookup_symbol(&order.symbol).await?;
        let body = QuestradeOrderRequest {
            account_number: &self.account_id,
            symbol_id: symbol.symbol_id,
            quantity: order.quantity,
            is_all_or_none: false,
            is_anonymous: false,
            order_type: "Market",
            time_in_force: time_in_force_name(order.time_in_force),
            action: match order.side {
                Side::Buy => "Buy",
                Side::Sell => "Sell",
            },
            primary_route: "AUTO",
            secondary_route: "AUTO",
        };

        info!(
            "🚀 Sending Order: {} {} {} ({})",
            order.side, order.quantity, order.symbol, body.time_in_force
        );

        let path = format!("/v1/accounts/{}/orders", self.account_id);
        let response = self.request(Method::POST, &path)?.json(&body).send().await?;
        let placed: QuestradeOrderResponse = read_json(response).await?;

        let (id, status) = match placed.orders.into_iter().next() {
            Some(o) => (o.id.to_string(), o.state),
            None => (
                placed.order_id.map(|id| id.to_string()).unwrap_or_default(),
                "Accepted".to_string(),
            ),
        };
        Ok(OrderResponse {
            id,
            symbol: order.symbol.clone(),
            status,
        })
    }

    async fn close_position(&self, symbol: &str) -> Result<Option<OrderResponse>> {
        let held = self
            .list_positions()
            .await?
            .into_iter()
            .find(|p| p.symbol.eq_ignore_ascii_case(symbol));

        let Some(position) = held else {
            info!("No open Questrade position for {}.", symbol);
            return Ok(None);
        };

        let order = OrderRequest {
            symbol: position.symbol,
            side: Side::Sell,
            quantity: position.quantity,
            time_in_force: TimeInForce::Gtc,
        };
        self.submit_order(&order).await.map(Some)
    }

    async fn filter_tradable(&self, symbols: &[String]) -> Result<Vec<String>> {
        let mut tradable = Vec::new();
        for symbol in symbols {
            match self.lookup_symbol(symbol).await {
                Ok(found) if found.is_tradable => tradable.push(symbol.clone()),
                Ok(_) => warn!("{} is listed but not tradable.", symbol),
                Err(BrokerError::MissingData { .. }) => warn!("{} not found on Questrade.", symbol),
                Err(e) => return Err(e),
            }
        }
        Ok(tradable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_in_force_uses_questrade_names() {
        assert_eq!(time_in_force_name(TimeInForce::Ioc), "ImmediateOrCancel");
        assert_eq!(time_in_force_name(TimeInForce::Day), "Day");
        assert_eq!(time_in_force_name(TimeInForce::Gtc), "GoodTillCanceled");
    }

    #[tokio::test]
    async fn configured_account_skips_lookup() {
        let settings = QuestradeSettings {
            account_id: Some("51234567".to_string()),
            ..QuestradeSettings::default()
        };
        let client = QuestradeClient::connect(&settings, "token".to_string(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(client.account_id, "51234567");
        assert_eq!(client.currency, "USD");
        assert_eq!(
            client.api_server.join("/v1/accounts").unwrap().as_str(),
            "https://api01.iq.questrade.com/v1/accounts"
        );
    }
}
