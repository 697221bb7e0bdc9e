//! Thread-Safe Storage Engine
//!
//! This module implements the core storage engine for linekv.
//! It provides a concurrent string-to-string map with no knowledge of the
//! wire protocol.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, we use multiple shards to reduce contention.
//! 2. **RwLock**: `get` takes the shared mode, `set` and `delete` take the exclusive mode.
//! 3. **Total Operations**: No operation returns an error. A poisoned shard lock
//!    is recovered, since every write to a `HashMap` either fully happens or not at all.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every key hashes to exactly one shard, so each operation on a single key
//! is linearizable. Nothing is atomic across keys or across calls.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

/// A single shard containing a portion of the key-value pairs.
#[derive(Debug, Default)]
struct Shard {
    data: RwLock<HashMap<String, String>>,
}

impl Shard {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Snapshot of storage engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub keys: u64,
    pub get_ops: u64,
    pub set_ops: u64,
    pub del_ops: u64,
}

/// The main storage engine for linekv.
///
/// Designed to be wrapped in an `Arc` and shared across all client
/// handler tasks. All operations are thread-safe and never fail.
///
/// # Example
///
/// ```
/// use linekv::storage::StorageEngine;
///
/// let engine = StorageEngine::new();
///
/// engine.set("name".to_string(), "linekv".to_string());
/// assert_eq!(engine.get("name"), Some("linekv".to_string()));
///
/// engine.delete("name");
/// assert_eq!(engine.get("name"), None);
/// ```
pub struct StorageEngine {
    /// Sharded storage for reduced lock contention
    shards: Vec<Shard>,

    /// Statistics: total number of keys
    key_count: AtomicU64,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: total DEL operations
    del_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .field("del_count", &self.del_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty storage engine.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
        }
    }

    /// Determines which shard a key belongs to.
    #[inline]
    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &str) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Sets a key-value pair, overwriting any previous value.
    pub fn set(&self, key: String, value: String) {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.get_shard(&key).write();
        if data.insert(key, value).is_none() {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Gets the value for a key, or `None` if it was never set or was deleted.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        self.get_shard(key).read().get(key).cloned()
    }

    /// Deletes a key. Deleting an absent key is a no-op.
    ///
    /// Returns `true` if a key was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.get_shard(key).write();
        if data.remove(key).is_some() {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the engine counters.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let engine = StorageEngine::new();

        engine.set("key".into(), "value".into());
        assert_eq!(engine.get("key"), Some("value".to_string()));
    }

    #[test]
    fn test_get_nonexistent() {
        let engine = StorageEngine::new();
        assert_eq!(engine.get("nonexistent"), None);
    }

    #[test]
    fn test_last_write_wins() {
        let engine = StorageEngine::new();

        engine.set("key".into(), "v1".into());
        engine.set("key".into(), "v2".into());

        assert_eq!(engine.get("key"), Some("v2".to_string()));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_delete() {
        let engine = StorageEngine::new();

        engine.set("key".into(), "value".into());
        assert!(engine.delete("key"));
        assert_eq!(engine.get("key"), None);
        assert!(!engine.delete("key")); // Already deleted
        assert!(engine.is_empty());
    }

    #[test]
    fn test_delete_absent_key() {
        let engine = StorageEngine::new();

        assert!(!engine.delete("never_set"));
        assert_eq!(engine.get("never_set"), None);
    }

    #[test]
    fn test_stats() {
        let engine = StorageEngine::new();

        engine.set("a".into(), "1".into());
        engine.set("b".into(), "2".into());
        engine.get("a");
        engine.delete("b");

        assert_eq!(
            engine.stats(),
            StorageStats {
                keys: 1,
                get_ops: 1,
                set_ops: 2,
                del_ops: 1,
            }
        );
    }

    #[test]
    fn test_debug_shows_counters() {
        let engine = StorageEngine::new();
        engine.set("k".to_string(), "v".to_string());
        engine.get("k");
        engine.delete("k");

        let debug = format!("{:?}", engine);
        assert!(debug.contains("get_count: 1"));
        assert!(debug.contains("set_count: 1"));
        assert!(debug.contains("del_count: 1"));
    }

    #[test]
    fn test_concurrent_access() {
        let engine = Arc::new(StorageEngine::new());
        let mut handles = vec![];

        // Spawn multiple writers
        for i in 0..10 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key_{}_{}", i, j);
                    engine.set(key.clone(), "value".into());
                    engine.get(&key);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 1000);
    }

    #[test]
    fn test_no_lost_updates_or_torn_values() {
        let engine = Arc::new(StorageEngine::new());
        let mut handles = vec![];

        for i in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                let key = format!("worker_{}", i);
                for round in 0..500 {
                    // Each value is a run of one digit, so a torn read would mix digits.
                    let digit = char::from(b'0' + (round % 10) as u8);
                    let value: String = std::iter::repeat(digit).take(64).collect();

                    engine.set(key.clone(), value.clone());
                    assert_eq!(engine.get(&key), Some(value));

                    if round % 7 == 0 {
                        engine.delete(&key);
                        assert_eq!(engine.get(&key), None);
                    }
                }
                engine.set(key, format!("final_{}", i));
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..8 {
            assert_eq!(
                engine.get(&format!("worker_{}", i)),
                Some(format!("final_{}", i))
            );
        }
        assert_eq!(engine.len(), 8);
    }

    #[test]
    fn test_poisoned_shard_is_recovered() {
        let engine = Arc::new(StorageEngine::new());
        engine.set("key".into(), "value".into());

        let poisoner = Arc::clone(&engine);
        let result = thread::spawn(move || {
            let _guard = poisoner.get_shard("key").write();
            panic!("poison the shard");
        })
        .join();
        assert!(result.is_err());

        assert_eq!(engine.get("key"), Some("value".to_string()));
        engine.set("key".into(), "other".into());
        assert_eq!(engine.get("key"), Some("other".to_string()));
    }
}
