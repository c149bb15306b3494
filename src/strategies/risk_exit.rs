// src/strategies/risk_exit.rs
use crate::strategies::traits::Strategy;
use crate::types::{Position, Side, Signal};
use rust_decimal::Decimal;
use tracing::info;

/// Wraps another strategy and forces a SELL once an open position's
/// unrealized gain reaches `take_profit_pct` or its loss reaches `stop_loss_pct`.
pub struct RiskExit<S> {
    inner: S,
    take_profit_pct: Decimal,
    stop_loss_pct: Decimal,
}

impl<S: Strategy> RiskExit<S> {
    pub fn new(inner: S, take_profit_pct: Decimal, stop_loss_pct: Decimal) -> Self {
        Self {
            inner,
            take_profit_pct,
            stop_loss_pct,
        }
    }
}

impl<S: Strategy> Strategy for RiskExit<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn required_history(&self) -> usize {
        self.inner.required_history()
    }

    fn evaluate(&self, symbol: &str, prices: &[Decimal], position: Option<&Position>) -> Signal {
        if let (Some(pos), Some(&price)) = (position, prices.last()) {
            if let Some(pct) = pos.unrealized_pct(price) {
                if pct >= self.take_profit_pct {
                    info!(
                        "Take-profit triggered for {} at {} (+{:.2}%).",
                        symbol, price, pct
                    );
                    return Signal::Advice(Side::Sell, price);
                }
                if pct <= -self.stop_loss_pct {
                    info!(
                        "Stop-loss triggered for {} at {} ({:.2}%).",
                        symbol, price, pct
                    );
                    return Signal::Advice(Side::Sell, price);
                }
            }
        }

        self.inner.evaluate(symbol, prices, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Always says BUY so fall-through is observable.
    struct AlwaysBuy;

    impl Strategy for AlwaysBuy {
        fn name(&self) -> &'static str {
            "AlwaysBuy"
        }
        fn required_history(&self) -> usize {
            1
        }
        fn evaluate(&self, _: &str, prices: &[Decimal], _: Option<&Position>) -> Signal {
            Signal::Advice(Side::Buy, *prices.last().unwrap())
        }
    }

    fn guarded() -> RiskExit<AlwaysBuy> {
        RiskExit::new(AlwaysBuy, dec!(10), dec!(5))
    }

    fn entry_at_100() -> Position {
        Position {
            symbol: "DOGE/USD".to_string(),
            quantity: dec!(10),
            entry_price: dec!(100),
        }
    }

    #[test]
    fn gain_above_take_profit_forces_sell() {
        let pos = entry_at_100();
        assert_eq!(
            guarded().evaluate("DOGE/USD", &[dec!(111)], Some(&pos)),
            Signal::Advice(Side::Sell, dec!(111))
        );
    }

    #[test]
    fn loss_beyond_stop_loss_forces_sell() {
        let pos = entry_at_100();
        assert_eq!(
            guarded().evaluate("DOGE/USD", &[dec!(94)], Some(&pos)),
            Signal::Advice(Side::Sell, dec!(94))
        );
    }

    #[test]
    fn thresholds_are_inclusive() {
        let pos = entry_at_100();
        assert_eq!(
            guarded().evaluate("DOGE/USD", &[dec!(110)], Some(&pos)),
            Signal::Advice(Side::Sell, dec!(110))
        );
        assert_eq!(
            guarded().evaluate("DOGE/USD", &[dec!(95)], Some(&pos)),
            Signal::Advice(Side::Sell, dec!(95))
        );
    }

    #[test]
    fn moderate_gain_falls_through() {
        let pos = entry_at_100();
        assert_eq!(
            guarded().evaluate("DOGE/USD", &[dec!(105)], Some(&pos)),
            Signal::Advice(Side::Buy, dec!(105))
        );
    }

    #[test]
    fn no_position_falls_through() {
        assert_eq!(
            guarded().evaluate("DOGE/USD", &[dec!(50)], None),
            Signal::Advice(Side::Buy, dec!(50))
        );
    }

    #[test]
    fn overflowing_percentage_falls_through() {
        let pos = Position {
            symbol: "DOGE/USD".to_string(),
            quantity: dec!(10),
            entry_price: dec!(0.0000000000000000000000000001),
        };
        assert_eq!(
            guarded().evaluate("DOGE/USD", &[dec!(1000000)], Some(&pos)),
            Signal::Advice(Side::Buy, dec!(1000000))
        );
    }
}
