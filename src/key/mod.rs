//! Key Abstraction Module
//!
//! Every key stored in a [`ConcurrentMap`](crate::storage::ConcurrentMap) is
//! reduced to two things:
//!
//! - a **partition key** (`u64`) that routes the key to one of the map's
//!   partitions and indexes it inside that partition, and
//! - a **canonical key** ([`CanonicalKey`]) that is stored alongside the value
//!   and compared on every lookup, so two keys whose partition keys collide are
//!   never confused.
//!
//! ## Supported Key Types
//!
//! | Type         | Partition key                  | Canonical form          |
//! |--------------|--------------------------------|-------------------------|
//! | [`StrKey`]   | CRC-64 of the UTF-8 bytes      | `CanonicalKey::Bytes`   |
//! | [`BytesKey`] | CRC-64 of the bytes            | `CanonicalKey::Bytes`   |
//! | [`I64Key`]   | the integer's bits as `u64`    | `CanonicalKey::Int`     |
//!
//! ## Example
//!
//! ```
//! use partmap::key::{I64Key, Partitionable, StrKey};
//!
//! let a = StrKey::new("hello");
//! let b = StrKey::new("hello");
//! assert_eq!(a.partition_key(), b.partition_key());
//!
//! let n = I64Key::new(-1);
//! assert_eq!(n.partition_key(), u64::MAX);
//! ```

pub mod types;

// Re-export commonly used types
pub use types::{checksum, BytesKey, CanonicalKey, I64Key, Partitionable, StrKey};
