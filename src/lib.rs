//! # partmap - A Partition-Indexed Concurrent Map
//!
//! partmap is a concurrency-safe key-value container meant to replace a
//! `RwLock<HashMap>` in multi-threaded programs. Keys are strings, opaque
//! bytes or 64-bit integers; values are any single type `V` per map.
//!
//! ## Features
//!
//! - **Partitioned Index**: Keys are spread over a fixed number of lookup maps
//! - **Slot Store**: Values live in an index-addressed array with O(1) reuse
//!   of deleted slots, so churn does not grow memory
//! - **One Lock**: Reads share, writes exclude; allocation is globally serialized
//! - **Collision Safe**: Canonical keys are stored and verified on lookup
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                partmap                                  │
//! │                                                                         │
//! │  ┌─────────────┐  partition key (u64)  ┌─────────────────────────────┐  │
//! │  │    Key      │──────────────────────>│       ConcurrentMap         │  │
//! │  │ StrKey      │  canonical key        │  ┌───────────────────────┐  │  │
//! │  │ BytesKey    │──────────────────────>│  │ PartitionTable  (N)   │  │  │
//! │  │ I64Key      │                       │  ├───────────────────────┤  │  │
//! │  └─────────────┘                       │  │ SlotStore + FreeList  │  │  │
//! │                                        │  └───────────────────────┘  │  │
//! │                                        │        one RwLock           │  │
//! │                                        └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use partmap::{ConcurrentMap, I64Key, StrKey};
//!
//! let map = ConcurrentMap::new(4).unwrap();
//! map.set(&StrKey::new("a"), 1);
//! map.set(&StrKey::new("b"), 2);
//! map.set(&I64Key::new(3), 3);
//! assert_eq!(map.len(), 3);
//!
//! map.delete(&StrKey::new("b"));
//! assert_eq!(map.get(&StrKey::new("b")), None);
//!
//! map.range(|key, value| {
//!     println!("{} = {}", key, value);
//!     true
//! });
//! ```
//!
//! ## Module Overview
//!
//! - [`key`]: Key types and the partition checksum
//! - [`storage`]: Slot store, partition table and the concurrent map
//!
//! ## Design Highlights
//!
//! ### Partitioning Is Not Sharded Locking
//!
//! The slot store and its free list are shared by every partition. A single
//! `RwLock` therefore covers slots, free list and partitions together;
//! partitions only keep each lookup map small.
//!
//! ### Iteration Order
//!
//! `range` walks the slot store in ascending slot order, skipping free slots.
//! Without deletes this is insertion order.

pub mod key;
pub mod storage;

// Re-export commonly used types for convenience
pub use key::{BytesKey, CanonicalKey, I64Key, Partitionable, StrKey};
pub use storage::{ConcurrentMap, ConfigError, MapConfig, MapStats};

/// Version of partmap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
