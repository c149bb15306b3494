// src/connectors/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("API error: status {status}, msg: {message}")]
    Api { status: u16, message: String },
    #[error("No {what} returned for {symbol}")]
    MissingData { what: &'static str, symbol: String },
}

impl BrokerError {
    pub fn missing(what: &'static str, symbol: &str) -> Self {
        BrokerError::MissingData {
            what,
            symbol: symbol.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
