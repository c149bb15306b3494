// src/strategies/mod.rs
pub mod price_band;
pub mod risk_exit;
pub mod sma_crossover;
pub mod traits;

use crate::config::{RiskConfig, StrategyConfig, StrategyKind};
use price_band::PriceBandStrategy;
use risk_exit::RiskExit;
use sma_crossover::SmaCrossover;
use traits::Strategy;

/// Builds the configured evaluator, wrapped in forced exits when enabled.
pub fn build_strategy(config: &StrategyConfig, risk: &RiskConfig) -> Box<dyn Strategy> {
    match (config.kind, risk.enabled) {
        (StrategyKind::SmaCrossover, false) => {
            Box::new(SmaCrossover::new(config.short_window, config.long_window))
        }
        (StrategyKind::SmaCrossover, true) => Box::new(RiskExit::new(
            SmaCrossover::new(config.short_window, config.long_window),
            risk.take_profit_pct,
            risk.stop_loss_pct,
        )),
        (StrategyKind::PriceBand, false) => {
            Box::new(PriceBandStrategy::new(config.bands.clone()))
        }
        (StrategyKind::PriceBand, true) => Box::new(RiskExit::new(
            PriceBandStrategy::new(config.bands.clone()),
            risk.take_profit_pct,
            risk.stop_loss_pct,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_respects_kind_and_history() {
        let mut config = StrategyConfig::default();
        let risk = RiskConfig {
            enabled: true,
            ..RiskConfig::default()
        };

        let sma = build_strategy(&config, &risk);
        assert_eq!(sma.name(), "SmaCrossover");
        assert_eq!(sma.required_history(), 50);

        config.kind = StrategyKind::PriceBand;
        let band = build_strategy(&config, &RiskConfig::default());
        assert_eq!(band.name(), "PriceBand");
        assert_eq!(band.required_history(), 1);
    }
}
