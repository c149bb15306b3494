// src/strategies/sma_crossover.rs
use crate::strategies::traits::Strategy;
use crate::types::{Position, Side, Signal};
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Arithmetic mean of the last `window` prices. `None` with fewer samples.
pub fn sma(prices: &[Decimal], window: usize) -> Option<Decimal> {
    if window == 0 || prices.len() < window {
        return None;
    }
    let sum: Decimal = prices[prices.len() - window..].iter().sum();
    Some(sum / Decimal::from(window))
}

pub struct SmaCrossover {
    short_window: usize,
    long_window: usize,
}

impl SmaCrossover {
    /// Creates a new SmaCrossover strategy.
    ///
    /// # Arguments
    /// * `short_window` - Samples in the fast average (e.g., 10).
    /// * `long_window` - Samples in the slow average (e.g., 50).
    pub fn new(short_window: usize, long_window: usize) -> Self {
        Self {
            short_window,
            long_window,
        }
    }
}

impl Default for SmaCrossover {
    fn default() -> Self {
        Self::new(10, 50)
    }
}

impl Strategy for SmaCrossover {
    fn name(&self) -> &'static str {
        "SmaCrossover"
    }

    fn required_history(&self) -> usize {
        self.long_window
    }

    fn evaluate(&self, symbol: &str, prices: &[Decimal], position: Option<&Position>) -> Signal {
        let (Some(short_sma), Some(long_sma), Some(&price)) = (
            sma(prices, self.short_window),
            sma(prices, self.long_window),
            prices.last(),
        ) else {
            info!(
                "Not enough data for SMA calculation for {} ({} samples). Skipping.",
                symbol,
                prices.len()
            );
            return Signal::Hold;
        };

        debug!("{}: short SMA {} / long SMA {}", symbol, short_sma, long_sma);

        if short_sma > long_sma && position.is_none() {
            info!(
                "{}: short SMA {:.4} above long SMA {:.4}. Signal: BUY",
                symbol, short_sma, long_sma
            );
            return Signal::Advice(Side::Buy, price);
        }
        if short_sma < long_sma && position.is_some() {
            info!(
                "{}: short SMA {:.4} below long SMA {:.4}. Signal: SELL",
                symbol, short_sma, long_sma
            );
            return Signal::Advice(Side::Sell, price);
        }

        Signal::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn flat(n: usize, price: Decimal) -> Vec<Decimal> {
        vec![price; n]
    }

    /// 40 samples at `base` followed by 10 at `tail`: long SMA mixes both,
    /// short SMA is exactly `tail`.
    fn stepped(base: Decimal, tail: Decimal) -> Vec<Decimal> {
        let mut prices = flat(40, base);
        prices.extend(flat(10, tail));
        prices
    }

    fn open_position() -> Position {
        Position {
            symbol: "BCH/USD".to_string(),
            quantity: dec!(0.5),
            entry_price: dec!(300),
        }
    }

    #[test]
    fn sma_is_undefined_below_window() {
        let prices = flat(9, dec!(1));
        assert_eq!(sma(&prices, 10), None);

        let prices = flat(49, dec!(2));
        assert_eq!(sma(&prices, 10), Some(dec!(2)));
        assert_eq!(sma(&prices, 50), None);
    }

    #[test]
    fn sma_uses_only_the_last_window() {
        let prices: Vec<Decimal> = (1..=12).map(Decimal::from).collect();
        // last 10 = 3..=12, mean 7.5
        assert_eq!(sma(&prices, 10), Some(dec!(7.5)));
    }

    #[test]
    fn upward_cross_without_position_buys_at_last_price() {
        let strategy = SmaCrossover::default();
        let prices = stepped(dec!(100), dec!(110));

        assert_eq!(
            strategy.evaluate("BCH/USD", &prices, None),
            Signal::Advice(Side::Buy, dec!(110))
        );
    }

    #[test]
    fn upward_cross_with_position_holds() {
        let strategy = SmaCrossover::default();
        let prices = stepped(dec!(100), dec!(110));
        let position = open_position();

        assert_eq!(
            strategy.evaluate("BCH/USD", &prices, Some(&position)),
            Signal::Hold
        );
    }

    #[test]
    fn downward_cross_with_position_sells() {
        let strategy = SmaCrossover::default();
        let prices = stepped(dec!(100), dec!(90));
        let position = open_position();

        assert_eq!(
            strategy.evaluate("BCH/USD", &prices, Some(&position)),
            Signal::Advice(Side::Sell, dec!(90))
        );
    }

    #[test]
    fn downward_cross_without_position_holds() {
        let strategy = SmaCrossover::default();
        let prices = stepped(dec!(100), dec!(90));
        assert_eq!(strategy.evaluate("BCH/USD", &prices, None), Signal::Hold);
    }

    #[test]
    fn equal_averages_hold() {
        let strategy = SmaCrossover::default();
        let prices = flat(60, dec!(42));
        let position = open_position();

        assert_eq!(strategy.evaluate("BCH/USD", &prices, None), Signal::Hold);
        assert_eq!(
            strategy.evaluate("BCH/USD", &prices, Some(&position)),
            Signal::Hold
        );
    }

    #[test]
    fn insufficient_history_holds() {
        let strategy = SmaCrossover::default();
        let mut prices = flat(39, dec!(100));
        prices.extend(flat(10, dec!(200)));

        assert_eq!(prices.len(), 49);
        assert_eq!(strategy.evaluate("BCH/USD", &prices, None), Signal::Hold);
        assert_eq!(strategy.evaluate("BCH/USD", &[], None), Signal::Hold);
    }
}
