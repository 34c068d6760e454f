//! Sharded in-memory storage implementation

use super::error::{Result, StoreError};
use super::router::ShardRouter;
use bytes::Bytes;
use serde::Serialize;
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// One shard of the store, hashed with SipHash like the router
type ShardMap = HashMap<String, Bytes, BuildHasherDefault<SipHasher13>>;

/// Upper bound for the automatically chosen shard count
const MAX_DEFAULT_SHARDS: usize = 16;

/// One shard per CPU core, min 1, max 16
pub fn default_shard_count() -> usize {
    num_cpus::get().clamp(1, MAX_DEFAULT_SHARDS)
}

/// Concurrent in-memory key/value store
///
/// Keys are split across a fixed set of shards, each guarded by its own
/// `RwLock`. A key always routes to the same shard, so all operations on a
/// single key are serialized by one lock while unrelated keys proceed in
/// parallel. Every method takes `&self`; share the store with `Arc`.
pub struct KvStore {
    shards: Vec<RwLock<ShardMap>>,
    router: ShardRouter,
}

impl KvStore {
    /// Create a store with the default shard count
    pub fn new() -> Self {
        Self::with_shards(default_shard_count())
    }

    /// Create a store with a specific shard count (at least 1)
    pub fn with_shards(num_shards: usize) -> Self {
        let router = ShardRouter::new(num_shards);
        let shards = (0..router.num_shards())
            .map(|_| RwLock::new(ShardMap::default()))
            .collect();

        KvStore { shards, router }
    }

    /// Get the value stored under `key`
    pub fn get(&self, key: &str) -> Result<Bytes> {
        let value = self.read_shard(key).get(key).cloned();

        match value {
            Some(value) => {
                debug!("GET {} ({} bytes)", key, value.len());
                Ok(value)
            }
            None => {
                debug!("GET {}: not found", key);
                Err(StoreError::NotFound(key.to_string()))
            }
        }
    }

    /// Insert or overwrite the value for `key`
    ///
    /// Returns `true` if the key was not present before.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Bytes>) -> bool {
        let key = key.into();
        let value = value.into();
        debug!("PUT {} ({} bytes)", key, value.len());

        self.write_shard(&key).insert(key, value).is_none()
    }

    /// Remove the entry for `key`
    pub fn delete(&self, key: &str) -> Result<()> {
        match self.write_shard(key).remove(key) {
            Some(_) => {
                debug!("DELETE {}", key);
                Ok(())
            }
            None => {
                debug!("DELETE {}: not found", key);
                Err(StoreError::NotFound(key.to_string()))
            }
        }
    }

    /// List every key currently in the store, in no particular order
    ///
    /// All shard read locks are held together while collecting, so the
    /// result is the exact key set at a single instant.
    pub fn list_keys(&self) -> Vec<String> {
        let shards = self.read_all();
        let mut keys = Vec::with_capacity(shards.iter().map(|shard| shard.len()).sum());

        for shard in &shards {
            keys.extend(shard.keys().cloned());
        }

        keys
    }

    /// Number of entries in the store
    pub fn len(&self) -> usize {
        self.read_all().iter().map(|shard| shard.len()).sum()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the number of shards
    pub fn num_shards(&self) -> usize {
        self.router.num_shards()
    }

    /// Snapshot statistics about the store
    pub fn stats(&self) -> StoreStats {
        let shards = self.read_all();
        let mut keys = 0;
        let mut used_memory_bytes = 0;

        for shard in &shards {
            keys += shard.len();
            used_memory_bytes += shard
                .iter()
                .map(|(key, value)| key.len() + value.len())
                .sum::<usize>();
        }

        StoreStats {
            shards: shards.len(),
            keys,
            used_memory_bytes,
        }
    }

    fn read_shard(&self, key: &str) -> RwLockReadGuard<'_, ShardMap> {
        self.shards[self.router.route(key)]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_shard(&self, key: &str) -> RwLockWriteGuard<'_, ShardMap> {
        self.shards[self.router.route(key)]
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock every shard for reading, always in index order
    fn read_all(&self) -> Vec<RwLockReadGuard<'_, ShardMap>> {
        self.shards
            .iter()
            .map(|shard| shard.read().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }
}

impl Default for KvStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub shards: usize,
    pub keys: usize,
    /// Key and value bytes, excluding map overhead
    pub used_memory_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ShardRouter;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_get_missing_key() {
        let store = KvStore::new();

        assert_eq!(
            store.get("missing"),
            Err(StoreError::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_put_get() {
        let store = KvStore::new();
        assert!(store.put("key", "value"));

        assert_eq!(store.get("key").unwrap(), Bytes::from("value"));
    }

    #[test]
    fn test_overwrite() {
        let store = KvStore::new();
        assert!(store.put("key", "value"));
        assert!(!store.put("key", "new-value"));

        assert_eq!(store.get("key").unwrap(), Bytes::from("new-value"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete() {
        let store = KvStore::new();
        store.put("key", "value");

        assert_eq!(store.delete("key"), Ok(()));
        assert_eq!(
            store.get("key"),
            Err(StoreError::NotFound("key".to_string()))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_missing_leaves_store_unchanged() {
        let store = KvStore::new();
        store.put("other", "value");

        assert_eq!(
            store.delete("missing"),
            Err(StoreError::NotFound("missing".to_string()))
        );
        assert_eq!(store.list_keys(), vec!["other".to_string()]);
    }

    #[test]
    fn test_list_keys() {
        let store = KvStore::with_shards(4);
        assert!(store.list_keys().is_empty());

        store.put("a", "1");
        store.put("b", "2");
        store.put("c", "3");

        let keys: HashSet<String> = store.list_keys().into_iter().collect();
        let expected: HashSet<String> = ["a", "b", "c"].iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_list_keys_across_shards_has_no_duplicates() {
        let store = KvStore::with_shards(8);
        for i in 0..500 {
            store.put(format!("key_{}", i), "v");
        }

        let keys = store.list_keys();
        assert_eq!(keys.len(), 500);
        assert_eq!(keys.iter().collect::<HashSet<_>>().len(), 500);
    }

    #[test]
    fn test_stats() {
        let store = KvStore::with_shards(3);
        store.put("ab", "cde");
        store.put("f", "");

        assert_eq!(
            store.stats(),
            StoreStats {
                shards: 3,
                keys: 2,
                used_memory_bytes: 6,
            }
        );
    }

    #[test]
    fn test_default_shard_count_in_range() {
        let count = default_shard_count();
        assert!((1..=MAX_DEFAULT_SHARDS).contains(&count));
        assert_eq!(KvStore::new().num_shards(), count);
    }

    #[test]
    fn test_concurrent_put_then_get() {
        let store = KvStore::with_shards(4);
        let n = 100;

        std::thread::scope(|s| {
            for i in 0..n {
                let store = &store;
                s.spawn(move || store.put(format!("key{}", i), format!("value{}", i)));
            }
        });

        std::thread::scope(|s| {
            for i in 0..n {
                let store = &store;
                s.spawn(move || {
                    let value = store.get(&format!("key{}", i)).unwrap();
                    assert_eq!(value, Bytes::from(format!("value{}", i)));
                });
            }
        });

        assert_eq!(store.len(), n);
    }

    #[test]
    fn test_concurrent_deletes_of_one_key() {
        let store = KvStore::with_shards(4);
        store.put("victim", "value");
        let threads = 16;
        let barrier = Barrier::new(threads);

        let results: Vec<Result<()>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        store.delete("victim")
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| *r == Err(StoreError::NotFound("victim".to_string()))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_keys_sees_moving_key() {
        let store = KvStore::with_shards(8);
        let router = ShardRouter::new(8);

        // Two names for the marker that live on different shards
        let first = "marker-0".to_string();
        let second = (1..)
            .map(|i| format!("marker-{}", i))
            .find(|k| router.route(k) != router.route(&first))
            .unwrap();
        for i in 0..64 {
            store.put(format!("filler_{}", i), "v");
        }
        store.put(first.clone(), "m");

        let rounds = 2000;
        let barrier = Barrier::new(2);

        std::thread::scope(|s| {
            s.spawn(|| {
                barrier.wait();
                let (mut from, mut to) = (&first, &second);
                for _ in 0..rounds {
                    store.put(to.clone(), "m");
                    store.delete(from).unwrap();
                    std::mem::swap(&mut from, &mut to);
                }
            });
            s.spawn(|| {
                barrier.wait();
                for _ in 0..rounds {
                    let keys = store.list_keys();
                    let copies = keys.iter().filter(|k| **k == first || **k == second).count();
                    assert!(copies >= 1, "marker missing from snapshot");
                    assert_eq!(keys.len() - copies, 64);
                }
            });
        });
    }

    #[test]
    fn test_concurrent_reads_and_writes_on_one_key() {
        let store = Arc::new(KvStore::with_shards(2));
        let writers = 8;
        let barrier = Arc::new(Barrier::new(writers * 2));
        let written: HashSet<Bytes> = (0..writers)
            .map(|i| Bytes::from(format!("value-{}", i).repeat(64)))
            .collect();

        let mut handles = Vec::new();
        for i in 0..writers {
            let store = store.clone();
            let barrier = barrier.clone();
            handles.push(std::thread::spawn(move || {
                barrier.wait();
                for _ in 0..200 {
                    store.put("shared", format!("value-{}", i).repeat(64));
                }
            }));
        }
        for _ in 0..writers {
            let store = store.clone();
            let barrier = barrier.clone();
            let written = written.clone();
            handles.push(std::thread::spawn(move || {
                barrier.wait();
                for _ in 0..200 {
                    match store.get("shared") {
                        // A read sees either nothing yet or one whole written value
                        Ok(value) => assert!(written.contains(&value)),
                        Err(e) => assert_eq!(e, StoreError::NotFound("shared".to_string())),
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.list_keys(), vec!["shared".to_string()]);
    }
}
