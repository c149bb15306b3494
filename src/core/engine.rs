// src/core/engine.rs
use crate::config::AppConfig;
use crate::connectors::traits::BrokerClient;
use crate::core::executor::{ExecutionOutcome, TradeExecutor};
use crate::core::market_hours::MarketHours;
use crate::storage::{StateSnapshot, StateStore};
use crate::strategies::traits::Strategy;
use crate::types::{Side, Signal};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Evaluating,
    OrderPending,
}

/// Summary of one pass over the configured assets.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleReport {
    pub evaluated: usize,
    pub orders: usize,
    pub realized_pnl: Decimal,
    pub market_closed: bool,
}

/// Why `run_until` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    ProfitTarget,
}

pub struct TradingEngine {
    config: AppConfig,
    broker: Arc<dyn BrokerClient>,
    strategy: Box<dyn Strategy>,
    executor: TradeExecutor,
    store: StateStore,
    market_hours: MarketHours,
    assets: Vec<String>,
    phase: EnginePhase,
    realized_pnl: Decimal,
    stop_signal: watch::Receiver<bool>,
}

impl TradingEngine {
    pub fn new(
        config: AppConfig,
        broker: Arc<dyn BrokerClient>,
        strategy: Box<dyn Strategy>,
    ) -> Result<Self> {
        let store = StateStore::new(&config.state_file);
        let executor = TradeExecutor::new(broker.clone(), store.clone(), config.time_in_force);
        let market_hours = MarketHours::from_config(&config.market_hours)
            .context("Invalid market hours configuration")?;
        let assets = config.assets.clone();

        Ok(Self {
            config,
            broker,
            strategy,
            executor,
            store,
            market_hours,
            assets,
            phase: EnginePhase::Idle,
            realized_pnl: Decimal::ZERO,
            stop_signal: watch::channel(false).1,
        })
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Polls until Ctrl+C or the profit target.
    pub async fn run(&mut self) -> Result<StopReason> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Polls until `shutdown` resolves or the profit target is hit. A shutdown
    /// arriving mid-cycle lets the current asset finish, including its order
    /// and state write, before liquidation runs.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<StopReason>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let watcher = tokio::spawn(async move {
            shutdown.await;
            let _ = stop_tx.send(true);
        });
        self.stop_signal = stop_rx;

        let reason = self.poll_loop().await;
        watcher.abort();
        reason
    }

    async fn poll_loop(&mut self) -> Result<StopReason> {
        info!(
            "Engine starting. Strategy: {}, Broker: {}, Mode: {}",
            self.strategy.name(),
            self.broker.name(),
            self.config.mode.as_str()
        );

        self.startup().await;
        let mut stop = self.stop_signal.clone();

        loop {
            if self.stop_requested() {
                return Ok(self.shutdown().await);
            }

            let wait_secs = match self.run_cycle().await {
                Ok(report) => {
                    self.realized_pnl += report.realized_pnl;
                    if self.profit_target_reached() {
                        info!(
                            "Profit target reached: ${:.2}. Stopping trading.",
                            self.realized_pnl
                        );
                        return Ok(StopReason::ProfitTarget);
                    }
                    if report.market_closed {
                        info!("Market is closed. Waiting for next session.");
                        self.config.market_hours.closed_poll_secs
                    } else {
                        self.config.check_interval_secs
                    }
                }
                Err(e) => {
                    error!("Unexpected error: {:#}", e);
                    self.phase = EnginePhase::Idle;
                    self.config.check_interval_secs
                }
            };

            if self.stop_requested() {
                return Ok(self.shutdown().await);
            }
            info!("Sleeping for {} seconds.", wait_secs);
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(wait_secs)) => {}
                _ = stop.changed() => return Ok(self.shutdown().await),
            }
        }
    }

    fn stop_requested(&self) -> bool {
        *self.stop_signal.borrow()
    }

    fn profit_target_reached(&self) -> bool {
        matches!(self.config.profit_target, Some(target) if self.realized_pnl >= target)
    }

    async fn startup(&mut self) {
        if self.config.verify_tradable {
            info!("Verifying tradable assets...");
            match self.broker.filter_tradable(&self.assets).await {
                Ok(tradable) if tradable.is_empty() => {
                    error!("No configured asset is tradable. Check your API permissions.");
                }
                Ok(tradable) => {
                    info!("Filtered tradable assets: {:?}", tradable);
                    self.assets = tradable;
                }
                Err(e) => error!("Error verifying tradable assets: {}", e),
            }
        }

        if self.config.close_on_startup {
            let mut state = self.store.load().await;
            if !state.is_empty() {
                self.executor.liquidate_tracked(&mut state).await;
            }
        }
    }

    async fn shutdown(&mut self) -> StopReason {
        info!("Bot stopped manually.");
        debug!("Shutdown reached in {:?} phase.", self.phase());
        if self.config.liquidate_on_exit {
            let mut state = self.store.load().await;
            self.executor.liquidate_tracked(&mut state).await;
        }
        self.phase = EnginePhase::Idle;
        StopReason::Interrupted
    }

    /// One pass: reload state, fetch cash, then evaluate and trade each
    /// asset in order.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let open_assets: Vec<String> = self
            .assets
            .iter()
            .filter(|a| self.market_hours.is_tradable(a, now))
            .cloned()
            .collect();
        if open_assets.is_empty() {
            report.market_closed = true;
            return Ok(report);
        }

        self.phase = EnginePhase::Evaluating;
        let mut state = self.store.load().await;
        let mut cash = self
            .broker
            .account_cash()
            .await
            .context("Failed to fetch account cash")?;
        info!("Available cash: ${}", cash);

        for asset in &open_assets {
            info!("Evaluating asset: {}", asset);
            let Some(prices) = self.fetch_prices(asset).await else {
                continue;
            };
            report.evaluated += 1;

            let position = state.get(asset);
            match self.strategy.evaluate(asset, &prices, position.as_ref()) {
                Signal::Advice(side, price) => {
                    self.phase = EnginePhase::OrderPending;
                    let outcome = self.execute(&mut state, asset, side, price, &mut cash).await;
                    self.phase = EnginePhase::Evaluating;

                    match outcome {
                        ExecutionOutcome::Bought(_) => report.orders += 1,
                        ExecutionOutcome::Sold { realized_pnl, .. } => {
                            report.orders += 1;
                            report.realized_pnl += realized_pnl;
                        }
                        ExecutionOutcome::Skipped(reason) => debug!("{}: {}", asset, reason),
                        ExecutionOutcome::Failed(_) => {}
                    }
                }
                Signal::Hold => info!("No trade signal for {}.", asset),
            }

            if self.stop_requested() {
                info!("Shutdown requested. Skipping the remaining assets.");
                break;
            }
        }

        self.phase = EnginePhase::Idle;
        Ok(report)
    }

    async fn fetch_prices(&self, asset: &str) -> Option<Vec<Decimal>> {
        let fetched = if self.strategy.required_history() > 1 {
            self.broker.price_history(asset).await
        } else {
            self.broker.latest_price(asset).await.map(|t| {
                debug!("{} last traded at {} (ts {})", t.symbol, t.price, t.timestamp);
                vec![t.price]
            })
        };

        match fetched {
            Ok(prices) if prices.is_empty() => {
                warn!("No price data for {}. Skipping.", asset);
                None
            }
            Ok(prices) => Some(prices),
            Err(e) => {
                error!("Error fetching prices for {}: {}", asset, e);
                None
            }
        }
    }

    async fn execute(
        &self,
        state: &mut StateSnapshot,
        asset: &str,
        side: Side,
        price: Decimal,
        cash: &mut Decimal,
    ) -> ExecutionOutcome {
        info!("Signal detected for {}: {} @ {}", asset, side, price);
        match side {
            Side::Buy => {
                let allocation = self.config.allocation_for(asset);
                self.executor.buy(state, asset, price, allocation, cash).await
            }
            Side::Sell => self.executor.sell(state, asset, price).await,
        }
    }
}
