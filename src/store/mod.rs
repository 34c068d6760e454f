//! In-memory storage module
//!
//! Holds every key/value pair of the server behind a sharded lock map.
//! This module knows nothing about HTTP.

mod error;
mod memory;
mod router;

pub use error::{Result, StoreError};
pub use memory::{default_shard_count, KvStore, StoreStats};
pub use router::ShardRouter;
