// src/connectors/alpaca.rs
use crate::config::AlpacaCredentials;
use crate::connectors::error::{BrokerError, Result};
use crate::connectors::messages::{
    AlpacaAccount, AlpacaAsset, AlpacaCryptoBars, AlpacaCryptoLatestTrades, AlpacaOrder,
    AlpacaOrderRequest, AlpacaPosition, AlpacaStockBars, AlpacaStockLatestTrade,
};
use crate::connectors::traits::BrokerClient;
use crate::connectors::{is_crypto, read_json};
use crate::types::{symbol_key, BrokerPosition, OrderRequest, OrderResponse, Side, Ticker};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Days of one-minute bars pulled for each history request.
const HISTORY_DAYS: i64 = 7;
const BARS_PAGE_LIMIT: &str = "10000";
const MAX_BAR_PAGES: usize = 5;

pub struct AlpacaClient {
    api_key: String,
    secret_key: String,
    http_client: Client,
    base_url: Url,
    data_url: Url,
}

impl AlpacaClient {
    pub fn new(credentials: AlpacaCredentials, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key: credentials.api_key,
            secret_key: credentials.secret_key,
            http_client,
            base_url: Url::parse(&credentials.base_url)?,
            data_url: Url::parse(&credentials.data_base_url)?,
        })
    }

    fn request(&self, method: Method, base: &Url, path: &str) -> Result<RequestBuilder> {
        let url = base.join(path)?;
        Ok(self
            .http_client
            .request(method, url)
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.secret_key))
    }

    fn history_start() -> String {
        (Utc::now() - ChronoDuration::days(HISTORY_DAYS)).to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    async fn crypto_bars(&self, symbol: &str) -> Result<Vec<Decimal>> {
        let start = Self::history_start();
        let mut closes = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_BAR_PAGES {
            let mut query = vec![
                ("symbols", symbol.to_string()),
                ("timeframe", "1Min".to_string()),
                ("start", start.clone()),
                ("limit", BARS_PAGE_LIMIT.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let response = self
                .request(Method::GET, &self.data_url, "/v1beta3/crypto/us/bars")?
                .query(&query)
                .send()
                .await?;
            let mut page: AlpacaCryptoBars = read_json(response).await?;

            if let Some(bars) = page.bars.remove(symbol) {
                closes.extend(bars.into_iter().map(|b| b.close));
            }
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(closes)
    }

    async fn stock_bars(&self, symbol: &str) -> Result<Vec<Decimal>> {
        let start = Self::history_start();
        let path = format!("/v2/stocks/{}/bars", symbol);
        let mut closes = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_BAR_PAGES {
            let mut query = vec![
                ("timeframe", "1Min".to_string()),
                ("start", start.clone()),
                ("limit", BARS_PAGE_LIMIT.to_string()),
                ("feed", "iex".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let response = self
                .request(Method::GET, &self.data_url, &path)?
                .query(&query)
                .send()
                .await?;
            let page: AlpacaStockBars = read_json(response).await?;

            closes.extend(page.bars.unwrap_or_default().into_iter().map(|b| b.close));
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(closes)
    }

    async fn active_assets(&self, asset_class: &str) -> Result<Vec<AlpacaAsset>> {
        let response = self
            .request(Method::GET, &self.base_url, "/v2/assets")?
            .query(&[("status", "active"), ("asset_class", asset_class)])
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl BrokerClient for AlpacaClient {
    fn name(&self) -> &'static str {
        "Alpaca"
    }

    async fn latest_price(&self, symbol: &str) -> Result<Ticker> {
        let price = if is_crypto(symbol) {
            let response = self
                .request(Method::GET, &self.data_url, "/v1beta3/crypto/us/latest/trades")?
                .query(&[("symbols", symbol)])
                .send()
                .await?;
            let mut body: AlpacaCryptoLatestTrades = read_json(response).await?;
            body.trades
                .remove(symbol)
                .ok_or_else(|| BrokerError::missing("latest trade", symbol))?
                .price
        } else {
            let path = format!("/v2/stocks/{}/trades/latest", symbol);
            let response = self
                .request(Method::GET, &self.data_url, &path)?
                .query(&[("feed", "iex")])
                .send()
                .await?;
            let body: AlpacaStockLatestTrade = read_json(response).await?;
            body.trade.price
        };

        Ok(Ticker {
            symbol: symbol.to_string(),
            price,
            timestamp: Utc::now().timestamp_millis() as u64,
        })
    }

    async fn price_history(&self, symbol: &str) -> Result<Vec<Decimal>> {
        let closes = if is_crypto(symbol) {
            self.crypto_bars(symbol).await?
        } else {
            self.stock_bars(symbol).await?
        };
        debug!("Fetched {} bars for {}", closes.len(), symbol);
        Ok(closes)
    }

    async fn account_cash(&self) -> Result<Decimal> {
        let response = self
            .request(Method::GET, &self.base_url, "/v2/account")?
            .send()
            .await?;
        let account: AlpacaAccount = read_json(response).await?;
        Ok(account.cash)
    }

    async fn list_positions(&self) -> Result<Vec<BrokerPosition>> {
        let response = self
            .request(Method::GET, &self.base_url, "/v2/positions")?
            .send()
            .await?;
        let positions: Vec<AlpacaPosition> = read_json(response).await?;
        Ok(positions
            .into_iter()
            .map(|p| BrokerPosition {
                symbol: p.symbol,
                quantity: p.qty,
                avg_entry_price: p.avg_entry_price,
                market_value: p.market_value,
            })
            .collect())
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderResponse> {
        let body = AlpacaOrderRequest {
            symbol: &order.symbol,
            qty: order.quantity.normalize().to_string(),
            side: match order.side {
                Side::Buy => "buy",
                Side::Sell => "sell",
            },
            order_type: "market",
            time_in_force: order.time_in_force.as_str(),
            client_order_id: Uuid::new_v4().to_string(),
        };

        info!(
            "🚀 Sending Order: {} {} {} ({})",
            order.side,
            body.qty,
            order.symbol,
            body.time_in_force
        );

        let response = self
            .request(Method::POST, &self.base_url, "/v2/orders")?
            .json(&body)
            .send()
            .await?;
        let placed: AlpacaOrder = read_json(response).await?;

        Ok(OrderResponse {
            id: placed.id,
            symbol: placed.symbol,
            status: placed.status,
        })
    }

    async fn close_position(&self, symbol: &str) -> Result<Option<OrderResponse>> {
        let path = format!("/v2/positions/{}", symbol_key(symbol));
        let response = self
            .request(Method::DELETE, &self.base_url, &path)?
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            info!("Position for {} not found or already closed.", symbol);
            return Ok(None);
        }

        let placed: AlpacaOrder = read_json(response).await?;
        Ok(Some(OrderResponse {
            id: placed.id,
            symbol: placed.symbol,
            status: placed.status,
        }))
    }

    async fn filter_tradable(&self, symbols: &[String]) -> Result<Vec<String>> {
        let mut tradable = HashSet::new();
        if symbols.iter().any(|s| is_crypto(s)) {
            tradable.extend(
                self.active_assets("crypto")
                    .await?
                    .into_iter()
                    .filter(|a| a.tradable)
                    .map(|a| symbol_key(&a.symbol)),
            );
        }
        if symbols.iter().any(|s| !is_crypto(s)) {
            tradable.extend(
                self.active_assets("us_equity")
                    .await?
                    .into_iter()
                    .filter(|a| a.tradable)
                    .map(|a| symbol_key(&a.symbol)),
            );
        }

        Ok(symbols
            .iter()
            .filter(|s| tradable.contains(&symbol_key(s)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_path_drops_pair_separator() {
        assert_eq!(symbol_key("BCH/USD"), "BCHUSD");
        assert_eq!(symbol_key("ltcusd"), "LTCUSD");
        assert_eq!(symbol_key("AAPL"), "AAPL");
    }

    #[test]
    fn endpoints_join_onto_base_url() {
        let client = AlpacaClient::new(
            AlpacaCredentials {
                api_key: "key".to_string(),
                secret_key: "secret".to_string(),
                base_url: "https://paper-api.alpaca.markets".to_string(),
                data_base_url: "https://data.alpaca.markets".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap();

        let url = client.data_url.join("/v2/stocks/AAPL/bars").unwrap();
        assert_eq!(url.as_str(), "https://data.alpaca.markets/v2/stocks/AAPL/bars");
        assert_eq!(client.name(), "Alpaca");
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let result = AlpacaClient::new(
            AlpacaCredentials {
                api_key: "key".to_string(),
                secret_key: "secret".to_string(),
                base_url: "not a url".to_string(),
                data_base_url: "https://data.alpaca.markets".to_string(),
            },
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(BrokerError::InvalidUrl(_))));
    }
}
