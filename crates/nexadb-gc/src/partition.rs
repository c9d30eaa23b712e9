use nexadb_core::{CoreError, CoreResult};
use xxhash_rust::xxh3::xxh3_64;

use crate::state::CollectionState;

/// Deterministically distributes collection-level work into disjoint buckets.
pub trait Partitioner: Send + Sync {
    /// Splits `states` into exactly `num_partitions` buckets.
    ///
    /// Every input collection lands in exactly one bucket, and the same
    /// collection id with the same `num_partitions` always lands in the
    /// same bucket. Buckets may be empty.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `num_partitions` is zero.
    fn partition(
        &self,
        states: &[CollectionState],
        num_partitions: usize,
    ) -> CoreResult<Vec<Vec<CollectionState>>>;
}

/// Partitioner hashing collection ids with xxh3 and reducing modulo the
/// partition count.
///
/// Partition assignment is an internal scheduling detail, not a persisted
/// format, so the hash only needs to be stable within one build.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashPartitioner;

impl HashPartitioner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Partitioner for HashPartitioner {
    fn partition(
        &self,
        states: &[CollectionState],
        num_partitions: usize,
    ) -> CoreResult<Vec<Vec<CollectionState>>> {
        if num_partitions == 0 {
            return Err(CoreError::ValidationError(
                "num_partitions must be >= 1".to_string(),
            ));
        }
        let mut buckets: Vec<Vec<CollectionState>> =
            (0..num_partitions).map(|_| Vec::new()).collect();
        for state in states {
            let hash = xxh3_64(state.collection_id.as_bytes());
            let index = (hash % num_partitions as u64) as usize;
            buckets[index].push(state.clone());
        }
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SegmentState;
    use std::collections::HashSet;

    fn states(ids: &[&str]) -> Vec<CollectionState> {
        ids.iter()
            .map(|id| {
                CollectionState::new(*id)
                    .with_segment(SegmentState::dropping(format!("{id}-seg"), None))
            })
            .collect()
    }

    #[test]
    fn zero_partitions_is_rejected() {
        let result = HashPartitioner::new().partition(&states(&["c1"]), 0);
        assert!(result.is_err());
    }

    #[test]
    fn empty_input_yields_empty_buckets() {
        let buckets = HashPartitioner::new().partition(&[], 3).unwrap();
        assert_eq!(buckets.len(), 3);
        assert!(buckets.iter().all(Vec::is_empty));
    }

    #[test]
    fn single_partition_holds_everything() {
        let input = states(&["c1", "c2", "c3"]);
        let buckets = HashPartitioner::new().partition(&input, 1).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].len(), 3);
    }

    #[test]
    fn partitioning_is_a_total_disjoint_cover() {
        let input = states(&["c1", "c2", "c3", "c4", "c5", "c6", "c7"]);
        let buckets = HashPartitioner::new().partition(&input, 4).unwrap();
        assert_eq!(buckets.len(), 4);

        let assigned: Vec<&str> = buckets
            .iter()
            .flatten()
            .map(|state| state.collection_id.as_str())
            .collect();
        assert_eq!(assigned.len(), input.len());
        let unique: HashSet<&str> = assigned.iter().copied().collect();
        assert_eq!(unique.len(), input.len());
    }

    #[test]
    fn partitioning_is_deterministic() {
        let input = states(&["alpha", "beta", "gamma", "delta"]);
        let first = HashPartitioner::new().partition(&input, 3).unwrap();
        let second = HashPartitioner::new().partition(&input, 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn bucket_preserves_input_order() {
        let input = states(&["c1", "c2", "c3", "c4", "c5"]);
        let buckets = HashPartitioner::new().partition(&input, 1).unwrap();
        let order: Vec<&str> = buckets[0]
            .iter()
            .map(|state| state.collection_id.as_str())
            .collect();
        assert_eq!(order, vec!["c1", "c2", "c3", "c4", "c5"]);
    }
}
