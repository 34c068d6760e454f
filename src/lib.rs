//! FerroKV - a small in-memory key-value store served over HTTP
//!
//! - `store` owns all key/value state and its synchronization
//! - `web` translates HTTP requests into store calls
//! - `config` holds the server settings

pub mod config;
pub mod store;
pub mod web;

/// Re-export commonly used types
pub use config::Config;
pub use store::{KvStore, StoreError, StoreStats};
