//! Key routing for the sharded map
//!
//! Routes keys to shards using SipHash-1-3.

use siphasher::sip::SipHasher13;
use std::hash::{Hash, Hasher};

/// Routes keys to shard indices
#[derive(Debug, Clone)]
pub struct ShardRouter {
    num_shards: usize,
}

impl ShardRouter {
    /// Create a new shard router, `num_shards` is clamped to at least 1
    pub fn new(num_shards: usize) -> Self {
        ShardRouter {
            num_shards: num_shards.max(1),
        }
    }

    /// Route a key to a shard index
    ///
    /// The same key always lands on the same shard, which is what keeps
    /// every operation on that key behind a single lock.
    pub fn route(&self, key: &str) -> usize {
        (self.hash_key(key) % self.num_shards as u64) as usize
    }

    fn hash_key(&self, key: &str) -> u64 {
        let mut hasher = SipHasher13::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    /// Get the number of shards
    pub fn num_shards(&self) -> usize {
        self.num_shards
    }
}
