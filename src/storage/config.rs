//! Map Configuration
//!
//! The partition count is fixed for the lifetime of a map, so it is validated
//! once, at construction. An invalid configuration never produces a map.

use thiserror::Error;

/// Partition count used by [`MapConfig::default`].
pub const DEFAULT_PARTITIONS: usize = 100;

/// Initial slot-store capacity used by [`MapConfig::default`].
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Upper bound on the partition count.
pub const MAX_PARTITIONS: usize = 65_536;

/// Target entries per partition when sizing from an expected load.
const ENTRIES_PER_PARTITION: usize = 1024;

/// Errors that can occur while building a map.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A map needs at least one partition
    #[error("partition count must be at least 1")]
    ZeroPartitions,

    /// Partition count above [`MAX_PARTITIONS`]
    #[error("partition count too large: {count} (max: {max})")]
    TooManyPartitions { count: usize, max: usize },
}

/// Construction options for a [`ConcurrentMap`](super::ConcurrentMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapConfig {
    /// Number of independent partitions (default: 100)
    pub partitions: usize,

    /// Slots reserved up front (default: 1024)
    pub initial_capacity: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            partitions: DEFAULT_PARTITIONS,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl MapConfig {
    /// Creates a config with the given partition count and default capacity.
    pub fn new(partitions: usize) -> Self {
        Self {
            partitions,
            ..Self::default()
        }
    }

    /// Sizes a config from the number of entries the map is expected to hold.
    ///
    /// Aims for about 1024 entries per partition and reserves room for all
    /// `expected` entries.
    ///
    /// ```
    /// use partmap::storage::MapConfig;
    ///
    /// let config = MapConfig::for_expected_entries(1_000_000);
    /// assert_eq!(config.partitions, 977);
    /// assert_eq!(MapConfig::for_expected_entries(0).partitions, 1);
    /// ```
    pub fn for_expected_entries(expected: usize) -> Self {
        let partitions = expected
            .div_ceil(ENTRIES_PER_PARTITION)
            .clamp(1, MAX_PARTITIONS);

        Self {
            partitions,
            initial_capacity: expected,
        }
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroPartitions`] if `partitions == 0`
    /// - [`ConfigError::TooManyPartitions`] if `partitions > MAX_PARTITIONS`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions == 0 {
            return Err(ConfigError::ZeroPartitions);
        }
        if self.partitions > MAX_PARTITIONS {
            return Err(ConfigError::TooManyPartitions {
                count: self.partitions,
                max: MAX_PARTITIONS,
            });
        }
        Ok(())
    }
}
