// src/connectors/mock.rs
//! In-memory broker used by executor and engine tests.
use crate::connectors::error::{BrokerError, Result};
use crate::connectors::traits::BrokerClient;
use crate::types::{BrokerPosition, OrderRequest, OrderResponse, Ticker};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockBroker {
    pub cash: Mutex<Decimal>,
    pub prices: Mutex<HashMap<String, Decimal>>,
    pub history: Mutex<HashMap<String, Vec<Decimal>>>,
    pub positions: Mutex<Vec<BrokerPosition>>,
    pub orders: Mutex<Vec<OrderRequest>>,
    pub closed: Mutex<Vec<String>>,
    pub reject_orders: Mutex<bool>,
    pub fail_close: Mutex<Vec<String>>,
    pub fail_cash: Mutex<bool>,
}

impl MockBroker {
    pub fn with_cash(cash: Decimal) -> Self {
        let broker = Self::default();
        *broker.cash.lock().unwrap() = cash;
        broker
    }

    pub fn set_history(&self, symbol: &str, closes: Vec<Decimal>) {
        self.history
            .lock()
            .unwrap()
            .insert(symbol.to_string(), closes);
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    pub fn reject_orders(&self, reject: bool) {
        *self.reject_orders.lock().unwrap() = reject;
    }

    pub fn hold(&self, symbol: &str, quantity: Decimal, avg_entry_price: Decimal) {
        self.positions.lock().unwrap().push(BrokerPosition {
            symbol: symbol.to_string(),
            quantity,
            avg_entry_price,
            market_value: None,
        });
    }

    pub fn fail_close_for(&self, symbol: &str) {
        self.fail_close.lock().unwrap().push(symbol.to_string());
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }
}

fn rejected(status: u16, message: &str) -> BrokerError {
    BrokerError::Api {
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl BrokerClient for MockBroker {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn latest_price(&self, symbol: &str) -> Result<Ticker> {
        let price = self
            .prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| BrokerError::missing("latest trade", symbol))?;
        Ok(Ticker {
            symbol: symbol.to_string(),
            price,
            timestamp: 0,
        })
    }

    async fn price_history(&self, symbol: &str) -> Result<Vec<Decimal>> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }

    async fn account_cash(&self) -> Result<Decimal> {
        if *self.fail_cash.lock().unwrap() {
            return Err(rejected(503, "service unavailable"));
        }
        Ok(*self.cash.lock().unwrap())
    }

    async fn list_positions(&self) -> Result<Vec<BrokerPosition>> {
        Ok(self.positions.lock().unwrap().clone())
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderResponse> {
        if *self.reject_orders.lock().unwrap() {
            return Err(rejected(403, "insufficient balance"));
        }
        let mut orders = self.orders.lock().unwrap();
        orders.push(order.clone());
        Ok(OrderResponse {
            id: format!("mock-{}", orders.len()),
            symbol: order.symbol.clone(),
            status: "accepted".to_string(),
        })
    }

    async fn close_position(&self, symbol: &str) -> Result<Option<OrderResponse>> {
        if self.fail_close.lock().unwrap().iter().any(|s| s == symbol) {
            return Err(rejected(422, "position is locked"));
        }
        let mut positions = self.positions.lock().unwrap();
        let Some(index) = positions.iter().position(|p| p.symbol == symbol) else {
            return Ok(None);
        };
        positions.remove(index);
        self.closed.lock().unwrap().push(symbol.to_string());
        Ok(Some(OrderResponse {
            id: format!("close-{}", symbol),
            symbol: symbol.to_string(),
            status: "accepted".to_string(),
        }))
    }

    async fn filter_tradable(&self, symbols: &[String]) -> Result<Vec<String>> {
        let known = self.prices.lock().unwrap();
        let history = self.history.lock().unwrap();
        Ok(symbols
            .iter()
            .filter(|s| known.contains_key(*s) || history.contains_key(*s))
            .cloned()
            .collect())
    }
}
