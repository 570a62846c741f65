//! Key Types
//!
//! This module defines the [`Partitionable`] capability and the concrete key
//! types the map accepts out of the box. Everything here is pure computation:
//! no state, no locking.
//!
//! ## Checksum
//!
//! String and byte keys are partitioned by their CRC-64/XZ checksum (the
//! ECMA-182 polynomial in reflected form with all-ones init and xorout).
//! A 64-bit checksum is not injective, which is why the canonical key travels
//! with every stored value and is compared on lookup.

use bytes::Bytes;
use crc::{Crc, CRC_64_XZ};
use std::fmt;

/// CRC-64 engine shared by every string/byte key.
const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_XZ);

/// Computes the 64-bit partition checksum of a byte string.
#[inline]
pub fn checksum(bytes: &[u8]) -> u64 {
    CRC64.checksum(bytes)
}

/// The original, disambiguating form of a key.
///
/// Stored next to each value in the slot store. Cloning is cheap: byte keys
/// share their buffer through [`Bytes`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalKey {
    /// A binary-safe string key
    Bytes(Bytes),
    /// A signed 64-bit integer key
    Int(i64),
}

impl CanonicalKey {
    /// Returns the key bytes if this is a byte key.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CanonicalKey::Bytes(b) => Some(b),
            CanonicalKey::Int(_) => None,
        }
    }

    /// Returns the integer if this is an integer key.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CanonicalKey::Int(n) => Some(*n),
            CanonicalKey::Bytes(_) => None,
        }
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalKey::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            CanonicalKey::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for CanonicalKey {
    fn from(s: &str) -> Self {
        CanonicalKey::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for CanonicalKey {
    fn from(s: String) -> Self {
        CanonicalKey::Bytes(Bytes::from(s))
    }
}

impl From<Bytes> for CanonicalKey {
    fn from(b: Bytes) -> Self {
        CanonicalKey::Bytes(b)
    }
}

impl From<i64> for CanonicalKey {
    fn from(n: i64) -> Self {
        CanonicalKey::Int(n)
    }
}

/// Anything that can be used as a map key.
///
/// Implementors must be consistent: two keys that are equal must report the
/// same `partition_key`, and `matches` must agree with equality of
/// `canonical()`.
pub trait Partitionable {
    /// The 64-bit key used for partition routing and in-partition indexing.
    fn partition_key(&self) -> u64;

    /// The canonical form stored alongside the value.
    fn canonical(&self) -> CanonicalKey;

    /// Returns true if `stored` is this key's canonical form.
    ///
    /// The default allocates via `canonical()`; concrete key types override
    /// it with a borrowed comparison.
    fn matches(&self, stored: &CanonicalKey) -> bool {
        self.canonical() == *stored
    }
}

impl Partitionable for CanonicalKey {
    fn partition_key(&self) -> u64 {
        match self {
            CanonicalKey::Bytes(b) => checksum(b),
            CanonicalKey::Int(n) => *n as u64,
        }
    }

    fn canonical(&self) -> CanonicalKey {
        self.clone()
    }

    #[inline]
    fn matches(&self, stored: &CanonicalKey) -> bool {
        self == stored
    }
}

/// A string key, partitioned by the CRC-64 of its UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrKey {
    key: u64,
    value: Bytes,
}

impl StrKey {
    /// Creates a key from a string slice.
    pub fn new(s: &str) -> Self {
        Self::from_bytes(Bytes::copy_from_slice(s.as_bytes()))
    }

    fn from_bytes(value: Bytes) -> Self {
        Self {
            key: checksum(&value),
            value,
        }
    }
}

impl From<String> for StrKey {
    fn from(s: String) -> Self {
        Self::from_bytes(Bytes::from(s))
    }
}

impl From<&str> for StrKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Partitionable for StrKey {
    #[inline]
    fn partition_key(&self) -> u64 {
        self.key
    }

    fn canonical(&self) -> CanonicalKey {
        CanonicalKey::Bytes(self.value.clone())
    }

    #[inline]
    fn matches(&self, stored: &CanonicalKey) -> bool {
        matches!(stored, CanonicalKey::Bytes(b) if *b == self.value)
    }
}

/// An opaque binary key. Shares the canonical form of [`StrKey`], so the
/// same bytes address the same entry through either type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesKey {
    key: u64,
    value: Bytes,
}

impl BytesKey {
    /// Creates a key from anything convertible into [`Bytes`].
    pub fn new(value: impl Into<Bytes>) -> Self {
        let value = value.into();
        Self {
            key: checksum(&value),
            value,
        }
    }
}

impl Partitionable for BytesKey {
    #[inline]
    fn partition_key(&self) -> u64 {
        self.key
    }

    fn canonical(&self) -> CanonicalKey {
        CanonicalKey::Bytes(self.value.clone())
    }

    #[inline]
    fn matches(&self, stored: &CanonicalKey) -> bool {
        matches!(stored, CanonicalKey::Bytes(b) if *b == self.value)
    }
}

/// A signed 64-bit integer key. Its bit pattern is the partition key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct I64Key(i64);

impl I64Key {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for I64Key {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Partitionable for I64Key {
    #[inline]
    fn partition_key(&self) -> u64 {
        self.0 as u64
    }

    fn canonical(&self) -> CanonicalKey {
        CanonicalKey::Int(self.0)
    }

    #[inline]
    fn matches(&self, stored: &CanonicalKey) -> bool {
        matches!(stored, CanonicalKey::Int(n) if *n == self.0)
    }
}
