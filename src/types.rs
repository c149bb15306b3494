// src/types.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order lifetime policy sent with every market order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Ioc,
    Day,
    #[default]
    Gtc,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Ioc => "ioc",
            TimeInForce::Day => "day",
            TimeInForce::Gtc => "gtc",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Trade advice with the price the decision was made at.
    Advice(Side, Decimal),
    Hold,
}

/// A holding the bot believes it owns. Not reconciled against the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub entry_price: Decimal,
}

impl Position {
    /// Unrealized gain in percent at `price`. `None` when the entry price is zero
    /// or the result does not fit a `Decimal`.
    pub fn unrealized_pct(&self, price: Decimal) -> Option<Decimal> {
        if self.entry_price.is_zero() {
            return None;
        }
        price
            .checked_sub(self.entry_price)?
            .checked_div(self.entry_price)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }
}

/// Broker-neutral spelling of a symbol: `BCH/USD`, `BCHUSD` and `bchusd`
/// all map to `BCHUSD`.
pub fn symbol_key(symbol: &str) -> String {
    symbol.replace('/', "").to_uppercase()
}

/// A position as reported by the broker's own ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerPosition {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_entry_price: Decimal,
    pub market_value: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub time_in_force: TimeInForce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub symbol: String,
    pub status: String,
}
