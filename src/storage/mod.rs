//! Storage Engine Module
//!
//! This module provides the core storage for partmap: a slot store with a
//! free list, a partition table indexing it, and the [`ConcurrentMap`] facade
//! that guards both with one reader/writer lock.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                ConcurrentMap  (RwLock)                      │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Part 0  │ │ Part 1  │ │ Part 2  │ │...N     │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! │  ┌──────────────────────────────┐ ┌──────────────┐          │
//! │  │         SlotStore            │ │   FreeList   │          │
//! │  └──────────────────────────────┘ └──────────────┘          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Partitioned Index**: `N` small lookup maps instead of one large one
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **Slot Reuse**: Deleted slots are recycled before the store grows
//! - **Verified Keys**: Partition-key collisions never alias two keys
//!
//! ## Example
//!
//! ```
//! use partmap::key::StrKey;
//! use partmap::storage::{ConcurrentMap, MapConfig};
//! use std::sync::Arc;
//!
//! let map = Arc::new(ConcurrentMap::with_config(MapConfig::for_expected_entries(10_000)).unwrap());
//!
//! map.set(&StrKey::new("name"), "Ariz");
//! assert_eq!(map.get(&StrKey::new("name")), Some("Ariz"));
//! ```

pub mod config;
pub mod engine;
pub mod partition;
pub mod slots;

// Re-export commonly used types
pub use config::{ConfigError, MapConfig, DEFAULT_INITIAL_CAPACITY, DEFAULT_PARTITIONS, MAX_PARTITIONS};
pub use engine::{ConcurrentMap, MapStats};
pub use partition::PartitionTable;
pub use slots::{Slot, SlotStore};
