// src/storage/state.rs
use crate::types::{symbol_key, Position};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to write state file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-disk shape of a single holding. The symbol is the map key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PositionRecord {
    #[serde(rename = "qty", with = "rust_decimal::serde::arbitrary_precision")]
    quantity: Decimal,
    #[serde(alias = "price", with = "rust_decimal::serde::arbitrary_precision")]
    entry_price: Decimal,
}

/// Every position the bot believes it holds, keyed by symbol.
///
/// Older state files used `invested_assets` as the root key and `price` for the
/// entry price; both are accepted on load and rewritten in the current shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default, alias = "invested_assets")]
    positions: BTreeMap<String, PositionRecord>,
}

impl StateSnapshot {
    pub fn get(&self, symbol: &str) -> Option<Position> {
        self.positions.get(symbol).map(|r| Position {
            symbol: symbol.to_string(),
            quantity: r.quantity,
            entry_price: r.entry_price,
        })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn insert(&mut self, position: Position) {
        self.positions.insert(
            position.symbol,
            PositionRecord {
                quantity: position.quantity,
                entry_price: position.entry_price,
            },
        );
    }

    pub fn remove(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol).map(|r| Position {
            symbol: symbol.to_string(),
            quantity: r.quantity,
            entry_price: r.entry_price,
        })
    }

    /// Removes the tracked entry naming the same asset as `symbol`, so
    /// `BCHUSD` matches a position kept under `BCH/USD`.
    pub fn remove_matching(&mut self, symbol: &str) -> Option<Position> {
        if self.contains(symbol) {
            return self.remove(symbol);
        }
        let wanted = symbol_key(symbol);
        let key = self
            .positions
            .keys()
            .find(|key| symbol_key(key) == wanted)
            .cloned()?;
        self.remove(&key)
    }

    pub fn positions(&self) -> Vec<Position> {
        self.positions
            .keys()
            .filter_map(|symbol| self.get(symbol))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Flat JSON file holding the full `StateSnapshot`. Read whole, written whole.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files load as an empty snapshot.
    pub async fn load(&self) -> StateSnapshot {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "State file {} not found. Initializing a new state.",
                    self.path.display()
                );
                return StateSnapshot::default();
            }
            Err(e) => {
                error!(
                    "Failed to read state file {}: {}. Initializing a new state.",
                    self.path.display(),
                    e
                );
                return StateSnapshot::default();
            }
        };

        match serde_json::from_str::<StateSnapshot>(&data) {
            Ok(state) => {
                info!("State loaded: {} tracked position(s)", state.len());
                state
            }
            Err(e) => {
                error!(
                    "State file {} is corrupted ({}). Initializing a new state.",
                    self.path.display(),
                    e
                );
                StateSnapshot::default()
            }
        }
    }

    pub async fn save(&self, state: &StateSnapshot) -> Result<(), StateError> {
        let data = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|source| StateError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        info!("💾 State saved ({} position(s))", state.len());
        Ok(())
    }
}
