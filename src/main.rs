// src/main.rs
use crate::config::{AppConfig, TradingMode};
use crate::connectors::build_broker;
use crate::connectors::traits::BrokerClient;
use crate::core::engine::{StopReason, TradingEngine};
use crate::storage::{StateSnapshot, StateStore};
use crate::strategies::build_strategy;
use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing::{error, info, warn};

mod config;
mod connectors;
mod core;
mod logging;
mod storage;
mod strategies;
mod types;
mod utils;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "Polling SMA crossover trading bot for Alpaca and Questrade.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the polling loop (default).
    Run,
    /// Liquidates every position the broker reports and clears the state file.
    CloseAll,
    /// Closes the broker position for one symbol.
    Close {
        /// Symbol to close (e.g., "USDTUSD", "AAPL").
        symbol: String,
    },
    /// Logs account cash and the broker's open positions.
    Portfolio,
    /// Reports which configured assets the broker lists as tradable.
    CheckTradable,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    // 1. Load Configuration
    let config = AppConfig::new();
    let log_dir = config
        .as_ref()
        .map(|c| c.log_dir.clone())
        .unwrap_or_else(|_| AppConfig::default().log_dir);
    let _log_guard = logging::init(&log_dir);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    println!("========================================");
    println!("       THE CROSSOVER BOT - v{}", env!("CARGO_PKG_VERSION"));
    println!("========================================");
    println!("Broker: {:?}", config.broker);
    println!("Assets: {}", config.assets.join(", "));
    println!(
        "Mode:   {}",
        match config.mode {
            TradingMode::Live => "🚨 LIVE TRADING",
            TradingMode::Paper => "📝 PAPER TRADING",
        }
    );
    println!("========================================");

    // 2. Initialize Components
    let broker = build_broker(&config).await?;
    info!("Connected to {} API.", broker.name());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let strategy = build_strategy(&config.strategy, &config.risk);
            let mut engine = TradingEngine::new(config, broker, strategy)?;
            match engine.run().await? {
                StopReason::Interrupted => info!("Engine stopped."),
                StopReason::ProfitTarget => {
                    info!("Engine stopped at profit target (${:.2}).", engine.realized_pnl())
                }
            }
        }
        Commands::CloseAll => close_all(broker.as_ref(), &config).await?,
        Commands::Close { symbol } => close_one(broker.as_ref(), &config, &symbol).await?,
        Commands::Portfolio => log_portfolio(broker.as_ref()).await?,
        Commands::CheckTradable => {
            let tradable = broker.filter_tradable(&config.assets).await?;
            for asset in &config.assets {
                if tradable.contains(asset) {
                    info!("✅ {} is tradable.", asset);
                } else {
                    warn!("❌ {} is not tradable.", asset);
                }
            }
        }
    }

    Ok(())
}

/// Sells everything on the broker's books, then forgets tracked positions.
/// Entries whose close failed stay tracked.
async fn close_all(broker: &dyn BrokerClient, config: &AppConfig) -> Result<()> {
    info!("Closing all open positions...");
    let positions = broker.list_positions().await?;
    if positions.is_empty() {
        info!("No open positions.");
    }

    let mut failed = Vec::new();
    for position in positions {
        match broker.close_position(&position.symbol).await {
            Ok(Some(order)) => info!(
                "Closed position for {}, Quantity: {} (order {} {})",
                position.symbol, position.quantity, order.id, order.status
            ),
            Ok(None) => info!("Position for {} already closed.", position.symbol),
            Err(e) => {
                error!("Failed to close position for {}: {}", position.symbol, e);
                failed.push(position.symbol);
            }
        }
    }

    let store = StateStore::new(&config.state_file);
    let mut tracked = store.load().await;
    let mut kept = StateSnapshot::default();
    for symbol in &failed {
        if let Some(position) = tracked.remove_matching(symbol) {
            kept.insert(position);
        }
    }
    store.save(&kept).await?;

    if failed.is_empty() {
        info!("All positions closed. Cleared {}.", store.path().display());
    } else {
        warn!(
            "{} position(s) could not be closed: {}",
            failed.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

async fn close_one(broker: &dyn BrokerClient, config: &AppConfig, symbol: &str) -> Result<()> {
    info!("Attempting to close position for {}...", symbol);
    match broker.close_position(symbol).await? {
        Some(order) => info!(
            "Position for {} successfully closed (order {} {}).",
            symbol, order.id, order.status
        ),
        None => info!("No open position found for {}.", symbol),
    }

    let store = StateStore::new(&config.state_file);
    let mut state = store.load().await;
    if let Some(position) = state.remove_matching(symbol) {
        store.save(&state).await?;
        info!("Stopped tracking {}.", position.symbol);
    }
    Ok(())
}

async fn log_portfolio(broker: &dyn BrokerClient) -> Result<()> {
    info!("Available cash: ${}", broker.account_cash().await?);
    let positions = broker.list_positions().await?;
    if positions.is_empty() {
        info!("Portfolio is empty.");
        return Ok(());
    }

    info!("Current Portfolio:");
    for p in positions {
        match p.market_value {
            Some(value) => info!(
                "{}: {} units at ${} (value ${:.2})",
                p.symbol, p.quantity, p.avg_entry_price, value
            ),
            None => info!("{}: {} units at ${}", p.symbol, p.quantity, p.avg_entry_price),
        }
    }
    Ok(())
}
