// src/storage/mod.rs
pub mod state;

pub use state::{StateSnapshot, StateStore};
