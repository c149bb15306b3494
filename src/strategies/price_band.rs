// src/strategies/price_band.rs
use crate::config::PriceBand;
use crate::strategies::traits::Strategy;
use crate::types::{Position, Side, Signal};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::info;

/// Static bands per symbol: enter inside `[low, high]`, exit at either edge.
pub struct PriceBandStrategy {
    bands: HashMap<String, PriceBand>,
}

impl PriceBandStrategy {
    pub fn new(bands: HashMap<String, PriceBand>) -> Self {
        let bands = bands
            .into_iter()
            .map(|(symbol, band)| (symbol.to_uppercase(), band))
            .collect();
        Self { bands }
    }
}

impl Strategy for PriceBandStrategy {
    fn name(&self) -> &'static str {
        "PriceBand"
    }

    fn required_history(&self) -> usize {
        1
    }

    fn evaluate(&self, symbol: &str, prices: &[Decimal], position: Option<&Position>) -> Signal {
        let Some(&price) = prices.last() else {
            return Signal::Hold;
        };
        let Some(band) = self.bands.get(&symbol.to_uppercase()) else {
            info!("{}: no price band configured. Skipping.", symbol);
            return Signal::Hold;
        };

        match position {
            None if price >= band.low && price <= band.high => {
                info!(
                    "{}: price {} inside band [{}, {}]. Signal: BUY",
                    symbol, price, band.low, band.high
                );
                Signal::Advice(Side::Buy, price)
            }
            None => {
                info!("{}: price {} is out of trade limits. Skipping.", symbol, price);
                Signal::Hold
            }
            Some(_) if price <= band.low => {
                info!("{}: price {} hit stop-loss at {}. Signal: SELL", symbol, price, band.low);
                Signal::Advice(Side::Sell, price)
            }
            Some(_) if price >= band.high => {
                info!(
                    "{}: price {} reached take-profit at {}. Signal: SELL",
                    symbol, price, band.high
                );
                Signal::Advice(Side::Sell, price)
            }
            Some(_) => Signal::Hold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn strategy() -> PriceBandStrategy {
        let mut bands = HashMap::new();
        bands.insert(
            "aapl".to_string(),
            PriceBand {
                low: dec!(150),
                high: dec!(200),
            },
        );
        PriceBandStrategy::new(bands)
    }

    fn held() -> Position {
        Position {
            symbol: "AAPL".to_string(),
            quantity: dec!(0.0571),
            entry_price: dec!(175),
        }
    }

    #[test]
    fn buys_inside_band_when_flat() {
        let s = strategy();
        assert_eq!(
            s.evaluate("AAPL", &[dec!(175)], None),
            Signal::Advice(Side::Buy, dec!(175))
        );
        assert_eq!(
            s.evaluate("AAPL", &[dec!(150)], None),
            Signal::Advice(Side::Buy, dec!(150))
        );
    }

    #[test]
    fn holds_outside_band_when_flat() {
        let s = strategy();
        assert_eq!(s.evaluate("AAPL", &[dec!(149.99)], None), Signal::Hold);
        assert_eq!(s.evaluate("AAPL", &[dec!(250)], None), Signal::Hold);
    }

    #[test]
    fn exits_at_either_edge_when_holding() {
        let s = strategy();
        let position = held();
        assert_eq!(
            s.evaluate("AAPL", &[dec!(140)], Some(&position)),
            Signal::Advice(Side::Sell, dec!(140))
        );
        assert_eq!(
            s.evaluate("AAPL", &[dec!(205)], Some(&position)),
            Signal::Advice(Side::Sell, dec!(205))
        );
        assert_eq!(s.evaluate("AAPL", &[dec!(180)], Some(&position)), Signal::Hold);
    }

    #[test]
    fn unknown_symbol_holds() {
        assert_eq!(strategy().evaluate("TSLA", &[dec!(700)], None), Signal::Hold);
    }
}
