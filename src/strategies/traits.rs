// src/strategies/traits.rs
use crate::types::{Position, Signal};
use rust_decimal::Decimal;

pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    // Closing prices needed per evaluation. 1 means the latest price is enough.
    fn required_history(&self) -> usize;

    /// Decide on `symbol` given its ordered closing prices (oldest first) and
    /// the tracked position, if any. The last price is the current price.
    fn evaluate(&self, symbol: &str, prices: &[Decimal], position: Option<&Position>) -> Signal;
}
