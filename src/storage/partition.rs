//! Partition Table
//!
//! A fixed number of independent maps from partition key to slot index. A key
//! lives in partition `partition_key % N`; spreading keys this way keeps each
//! individual map small as the total entry count grows.
//!
//! Partitioning shards the *index*, not the lock. The table is mutated under
//! the same exclusive lock as the slot store because both are updated together
//! by every `set` and `delete`.

use std::collections::HashMap;

/// `N` independent partition-key to slot-index maps.
#[derive(Debug)]
pub struct PartitionTable {
    partitions: Vec<HashMap<u64, usize>>,
}

impl PartitionTable {
    /// Creates `count` empty partitions.
    ///
    /// `count` has already been validated to be at least 1.
    pub fn new(count: usize) -> Self {
        debug_assert!(count > 0, "partition count must be positive");
        Self {
            partitions: (0..count).map(|_| HashMap::new()).collect(),
        }
    }

    /// Maps a partition key to its partition id.
    #[inline]
    pub fn resolve(&self, partition_key: u64) -> usize {
        (partition_key % self.partitions.len() as u64) as usize
    }

    #[inline]
    pub fn lookup(&self, partition_id: usize, partition_key: u64) -> Option<usize> {
        self.partitions[partition_id].get(&partition_key).copied()
    }

    /// Maps `partition_key` to `slot_index`, returning any index it replaced.
    pub fn insert(&mut self, partition_id: usize, partition_key: u64, slot_index: usize) -> Option<usize> {
        self.partitions[partition_id].insert(partition_key, slot_index)
    }

    pub fn remove(&mut self, partition_id: usize, partition_key: u64) -> Option<usize> {
        self.partitions[partition_id].remove(&partition_key)
    }

    /// Total mappings across all partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(HashMap::len).sum()
    }

    /// Number of mappings in each partition, by partition id.
    pub fn sizes(&self) -> Vec<usize> {
        self.partitions.iter().map(HashMap::len).collect()
    }

    /// Removes every mapping; the partition count is kept.
    pub fn clear(&mut self) {
        for partition in &mut self.partitions {
            partition.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_modulo() {
        let table = PartitionTable::new(4);
        assert_eq!(table.sizes().len(), 4);
        assert_eq!(table.resolve(0), 0);
        assert_eq!(table.resolve(5), 1);
        assert_eq!(table.resolve(u64::MAX), (u64::MAX % 4) as usize);
    }

    #[test]
    fn test_single_partition() {
        let table = PartitionTable::new(1);
        assert_eq!(table.resolve(12345), 0);
        assert_eq!(table.resolve(u64::MAX), 0);
    }

    #[test]
    fn test_insert_lookup_remove() {
        let mut table = PartitionTable::new(3);
        let pid = table.resolve(10);

        assert_eq!(table.lookup(pid, 10), None);
        assert_eq!(table.insert(pid, 10, 7), None);
        assert_eq!(table.lookup(pid, 10), Some(7));
        assert_eq!(table.insert(pid, 10, 8), Some(7));
        assert_eq!(table.len(), 1);

        assert_eq!(table.remove(pid, 10), Some(8));
        assert_eq!(table.remove(pid, 10), None);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_sizes_and_clear() {
        let mut table = PartitionTable::new(2);
        for key in 0..10u64 {
            let pid = table.resolve(key);
            table.insert(pid, key, key as usize);
        }
        assert_eq!(table.sizes(), vec![5, 5]);
        assert_eq!(table.len(), 10);

        table.clear();
        assert_eq!(table.len(), 0);
        assert_eq!(table.sizes(), vec![0, 0]);
    }
}
