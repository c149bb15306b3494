// src/core/mod.rs
pub mod engine;
pub mod executor;
pub mod market_hours;
