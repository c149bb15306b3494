// src/core/executor.rs
use crate::connectors::traits::BrokerClient;
use crate::storage::{StateSnapshot, StateStore};
use crate::types::{OrderRequest, Position, Side, TimeInForce};
use crate::utils::precision::order_quantity;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What happened to one trade decision.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Bought(Position),
    Sold {
        position: Position,
        exit_price: Decimal,
        realized_pnl: Decimal,
    },
    Skipped(&'static str),
    Failed(String),
}

/// Turns decisions into market orders and keeps the state file in step
/// with accepted orders.
pub struct TradeExecutor {
    broker: Arc<dyn BrokerClient>,
    store: StateStore,
    time_in_force: TimeInForce,
}

impl TradeExecutor {
    pub fn new(broker: Arc<dyn BrokerClient>, store: StateStore, time_in_force: TimeInForce) -> Self {
        Self {
            broker,
            store,
            time_in_force,
        }
    }

    async fn persist(&self, state: &StateSnapshot) {
        if let Err(e) = self.store.save(state).await {
            error!("Failed to save bot state: {}", e);
        }
    }

    /// Buys `allocation` dollars of `symbol` at `price`, drawing from `cash`.
    pub async fn buy(
        &self,
        state: &mut StateSnapshot,
        symbol: &str,
        price: Decimal,
        allocation: Decimal,
        cash: &mut Decimal,
    ) -> ExecutionOutcome {
        if state.contains(symbol) {
            info!("Skipping {} (already in position).", symbol);
            return ExecutionOutcome::Skipped("already in position");
        }
        if *cash < allocation {
            warn!(
                "Insufficient cash to trade {}. Available: ${}, Required: ${}. Skipping.",
                symbol, cash, allocation
            );
            return ExecutionOutcome::Skipped("insufficient cash");
        }

        let quantity = match order_quantity(allocation, price) {
            Some(q) if !q.is_zero() => q,
            _ => {
                warn!(
                    "⚠️ Quantity for {} is zero at price {}. Not entering position.",
                    symbol, price
                );
                return ExecutionOutcome::Skipped("zero quantity");
            }
        };

        let order = OrderRequest {
            symbol: symbol.to_string(),
            side: Side::Buy,
            quantity,
            time_in_force: self.time_in_force,
        };

        match self.broker.submit_order(&order).await {
            Ok(response) => {
                let position = Position {
                    symbol: symbol.to_string(),
                    quantity,
                    entry_price: price,
                };
                state.insert(position.clone());
                self.persist(state).await;
                *cash -= quantity * price;
                info!(
                    "✅ Bought {}. Qty: {} @ ${} (order {} {}). Remaining cash: ${:.2}",
                    symbol, quantity, price, response.id, response.status, cash
                );
                ExecutionOutcome::Bought(position)
            }
            Err(e) => {
                error!("Failed to buy {}: {}", symbol, e);
                ExecutionOutcome::Failed(e.to_string())
            }
        }
    }

    /// Sells the tracked quantity of `symbol` at market.
    pub async fn sell(&self, state: &mut StateSnapshot, symbol: &str, price: Decimal) -> ExecutionOutcome {
        let Some(position) = state.get(symbol) else {
            info!("No tracked position for {}. Nothing to sell.", symbol);
            return ExecutionOutcome::Skipped("no position");
        };

        let order = OrderRequest {
            symbol: symbol.to_string(),
            side: Side::Sell,
            quantity: position.quantity,
            time_in_force: self.time_in_force,
        };

        match self.broker.submit_order(&order).await {
            Ok(response) => {
                state.remove(symbol);
                self.persist(state).await;
                let realized_pnl = (price - position.entry_price) * position.quantity;
                info!(
                    "✅ Sold {}. Qty: {} @ ${} (order {} {}). Realized P&L: ${:.2}",
                    symbol, position.quantity, price, response.id, response.status, realized_pnl
                );
                ExecutionOutcome::Sold {
                    position,
                    exit_price: price,
                    realized_pnl,
                }
            }
            Err(e) => {
                error!("Failed to sell {}: {}", symbol, e);
                ExecutionOutcome::Failed(e.to_string())
            }
        }
    }

    /// Market-sells every tracked position. Positions whose order fails stay
    /// tracked. Returns how many were closed.
    pub async fn liquidate_tracked(&self, state: &mut StateSnapshot) -> usize {
        info!("Checking for open positions to close.");
        let mut closed = 0;

        for position in state.positions() {
            info!(
                "Closing position for {}. Qty: {}",
                position.symbol, position.quantity
            );
            let order = OrderRequest {
                symbol: position.symbol.clone(),
                side: Side::Sell,
                quantity: position.quantity,
                time_in_force: self.time_in_force,
            };
            match self.broker.submit_order(&order).await {
                Ok(_) => {
                    state.remove(&position.symbol);
                    closed += 1;
                    info!("Successfully closed position for {}.", position.symbol);
                }
                Err(e) => error!("Failed to close position for {}: {}", position.symbol, e),
            }
        }

        self.persist(state).await;
        info!("Closed {} tracked position(s).", closed);
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::mock::MockBroker;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        broker: Arc<MockBroker>,
        store: StateStore,
        executor: TradeExecutor,
    }

    fn fixture(cash: Decimal) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let broker = Arc::new(MockBroker::with_cash(cash));
        let executor = TradeExecutor::new(broker.clone(), store.clone(), TimeInForce::Ioc);
        Fixture {
            _dir: dir,
            broker,
            store,
            executor,
        }
    }

    #[tokio::test]
    async fn buy_submits_rounded_quantity_and_persists() {
        let f = fixture(dec!(100));
        let mut state = StateSnapshot::default();
        let mut cash = dec!(100);

        let outcome = f
            .executor
            .buy(&mut state, "DOGE/USD", dec!(3), dec!(20), &mut cash)
            .await;

        let expected = Position {
            symbol: "DOGE/USD".to_string(),
            quantity: dec!(6.6667),
            entry_price: dec!(3),
        };
        assert_eq!(outcome, ExecutionOutcome::Bought(expected.clone()));
        assert_eq!(cash, dec!(100) - dec!(6.6667) * dec!(3));

        let orders = f.broker.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Buy);
        assert_eq!(orders[0].quantity, dec!(6.6667));
        assert_eq!(orders[0].time_in_force, TimeInForce::Ioc);

        let on_disk = f.store.load().await;
        assert_eq!(on_disk.get("DOGE/USD"), Some(expected));
    }

    #[tokio::test]
    async fn buy_is_skipped_without_enough_cash() {
        let f = fixture(dec!(10));
        let mut state = StateSnapshot::default();
        let mut cash = dec!(10);

        let outcome = f
            .executor
            .buy(&mut state, "DOGE/USD", dec!(3), dec!(20), &mut cash)
            .await;

        assert_eq!(outcome, ExecutionOutcome::Skipped("insufficient cash"));
        assert!(f.broker.orders().is_empty());
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn rejected_buy_leaves_state_untouched() {
        let f = fixture(dec!(100));
        f.broker.reject_orders(true);
        let mut state = StateSnapshot::default();
        let mut cash = dec!(100);

        let outcome = f
            .executor
            .buy(&mut state, "BCH/USD", dec!(300), dec!(20), &mut cash)
            .await;

        assert!(matches!(outcome, ExecutionOutcome::Failed(_)));
        assert!(state.is_empty());
        assert_eq!(cash, dec!(100));
        assert!(f.store.load().await.is_empty());
    }

    #[tokio::test]
    async fn sell_uses_tracked_quantity_and_reports_pnl() {
        let f = fixture(dec!(0));
        let mut state = StateSnapshot::default();
        state.insert(Position {
            symbol: "BCH/USD".to_string(),
            quantity: dec!(0.5),
            entry_price: dec!(300),
        });

        let outcome = f.executor.sell(&mut state, "BCH/USD", dec!(320)).await;

        match outcome {
            ExecutionOutcome::Sold {
                position,
                exit_price,
                realized_pnl,
            } => {
                assert_eq!(position.quantity, dec!(0.5));
                assert_eq!(exit_price, dec!(320));
                assert_eq!(realized_pnl, dec!(10));
            }
            other => panic!("expected a sale, got {:?}", other),
        }
        assert!(!state.contains("BCH/USD"));
        assert_eq!(f.broker.orders()[0].quantity, dec!(0.5));
        assert_eq!(f.broker.orders()[0].side, Side::Sell);
    }

    #[tokio::test]
    async fn failed_sell_keeps_position() {
        let f = fixture(dec!(0));
        f.broker.reject_orders(true);
        let mut state = StateSnapshot::default();
        state.insert(Position {
            symbol: "BCH/USD".to_string(),
            quantity: dec!(0.5),
            entry_price: dec!(300),
        });

        let outcome = f.executor.sell(&mut state, "BCH/USD", dec!(280)).await;

        assert!(matches!(outcome, ExecutionOutcome::Failed(_)));
        assert!(state.contains("BCH/USD"));
    }

    #[tokio::test]
    async fn liquidate_closes_everything_tracked() {
        let f = fixture(dec!(0));
        let mut state = StateSnapshot::default();
        for symbol in ["BCH/USD", "DOGE/USD"] {
            state.insert(Position {
                symbol: symbol.to_string(),
                quantity: dec!(1),
                entry_price: dec!(10),
            });
        }

        let closed = f.executor.liquidate_tracked(&mut state).await;

        assert_eq!(closed, 2);
        assert!(state.is_empty());
        assert_eq!(f.broker.orders().len(), 2);
        assert!(f.store.load().await.is_empty());
    }
}
