// src/connectors/messages.rs
//! Wire shapes for the broker REST payloads. Only the fields the bot reads.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Error body shared by both brokers: `{"code": ..., "message": "..."}`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

// --- Alpaca ---

#[derive(Debug, Deserialize)]
pub struct AlpacaAccount {
    pub cash: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AlpacaPosition {
    pub symbol: String,
    pub qty: Decimal,
    pub avg_entry_price: Decimal,
    #[serde(default)]
    pub market_value: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct AlpacaOrderRequest<'a> {
    pub symbol: &'a str,
    pub qty: String,
    pub side: &'static str,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub time_in_force: &'static str,
    pub client_order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AlpacaOrder {
    pub id: String,
    pub symbol: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AlpacaAsset {
    pub symbol: String,
    #[serde(default)]
    pub tradable: bool,
}

#[derive(Debug, Deserialize)]
pub struct AlpacaTrade {
    #[serde(rename = "p")]
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AlpacaBar {
    #[serde(rename = "c")]
    pub close: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AlpacaCryptoLatestTrades {
    pub trades: HashMap<String, AlpacaTrade>,
}

#[derive(Debug, Deserialize)]
pub struct AlpacaStockLatestTrade {
    pub trade: AlpacaTrade,
}

#[derive(Debug, Deserialize)]
pub struct AlpacaCryptoBars {
    #[serde(default)]
    pub bars: HashMap<String, Vec<AlpacaBar>>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlpacaStockBars {
    #[serde(default)]
    pub bars: Option<Vec<AlpacaBar>>,
    pub next_page_token: Option<String>,
}

// --- Questrade ---

#[derive(Debug, Deserialize)]
pub struct QuestradeAccounts {
    pub accounts: Vec<QuestradeAccount>,
}

#[derive(Debug, Deserialize)]
pub struct QuestradeAccount {
    pub number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestradeBalances {
    pub per_currency_balances: Vec<QuestradeBalance>,
}

#[derive(Debug, Deserialize)]
pub struct QuestradeBalance {
    pub currency: String,
    pub cash: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct QuestradePositions {
    pub positions: Vec<QuestradePosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestradePosition {
    pub symbol: String,
    pub open_quantity: Decimal,
    pub average_entry_price: Decimal,
    #[serde(default)]
    pub current_market_value: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct QuestradeSymbols {
    pub symbols: Vec<QuestradeSymbol>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestradeSymbol {
    pub symbol: String,
    pub symbol_id: u64,
    #[serde(default)]
    pub is_tradable: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuestradeQuotes {
    pub quotes: Vec<QuestradeQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestradeQuote {
    pub last_trade_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct QuestradeCandles {
    pub candles: Vec<QuestradeCandle>,
}

#[derive(Debug, Deserialize)]
pub struct QuestradeCandle {
    pub close: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestradeOrderRequest<'a> {
    pub account_number: &'a str,
    pub symbol_id: u64,
    #[serde(serialize_with = "rust_decimal::serde::arbitrary_precision::serialize")]
    pub quantity: Decimal,
    pub is_all_or_none: bool,
    pub is_anonymous: bool,
    pub order_type: &'static str,
    pub time_in_force: &'static str,
    pub action: &'static str,
    pub primary_route: &'static str,
    pub secondary_route: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestradeOrderResponse {
    pub order_id: Option<u64>,
    #[serde(default)]
    pub orders: Vec<QuestradeOrder>,
}

#[derive(Debug, Deserialize)]
pub struct QuestradeOrder {
    pub id: u64,
    pub state: String,
}
