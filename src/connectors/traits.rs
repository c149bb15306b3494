// src/connectors/traits.rs
use crate::connectors::error::Result;
use crate::types::{BrokerPosition, OrderRequest, OrderResponse, Ticker};
use async_trait::async_trait;
use rust_decimal::Decimal;

#[async_trait]
pub trait BrokerClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn latest_price(&self, symbol: &str) -> Result<Ticker>;

    /// Closing prices of recent one-minute bars, oldest first.
    async fn price_history(&self, symbol: &str) -> Result<Vec<Decimal>>;

    async fn account_cash(&self) -> Result<Decimal>;

    async fn list_positions(&self) -> Result<Vec<BrokerPosition>>;

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderResponse>;

    // None when the broker holds nothing for `symbol`.
    async fn close_position(&self, symbol: &str) -> Result<Option<OrderResponse>>;

    /// The subset of `symbols` the broker lists as active and tradable.
    async fn filter_tradable(&self, symbols: &[String]) -> Result<Vec<String>>;
}
