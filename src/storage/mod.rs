//! Storage Engine Module
//!
//! This module provides the core storage functionality for linekv:
//! a thread-safe, sharded key-value map.
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **Total Operations**: `set`, `get` and `delete` never fail
//!
//! ## Example
//!
//! ```
//! use linekv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(StorageEngine::new());
//!
//! engine.set("name".to_string(), "value".to_string());
//! assert_eq!(engine.get("name"), Some("value".to_string()));
//! ```

pub mod engine;

pub use engine::{StorageEngine, StorageStats};
