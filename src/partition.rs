//! Splits the item range of a run into one contiguous shard per worker.

use std::ops::Range;

use crate::config::validate_pair;
use crate::error::Result;

/// Half-open range of item indices owned by a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    pub start: usize,
    pub end: usize,
}

impl Shard {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Partition `[0, data_size)` into `thread_count` shards.
///
/// Every shard holds `data_size / thread_count` items except the last, which
/// also takes the remainder.
pub fn partition(data_size: usize, thread_count: usize) -> Result<Vec<Shard>> {
    validate_pair(thread_count, data_size)?;

    let per_thread = data_size / thread_count;
    let shards = (0..thread_count)
        .map(|t| {
            let start = t * per_thread;
            let end = if t == thread_count - 1 {
                data_size
            } else {
                start + per_thread
            };
            Shard { start, end }
        })
        .collect();
    Ok(shards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn bounds(shards: &[Shard]) -> Vec<(usize, usize)> {
        shards.iter().map(|s| (s.start, s.end)).collect()
    }

    #[test]
    fn even_split() {
        let shards = partition(10, 2).unwrap();
        assert_eq!(bounds(&shards), vec![(0, 5), (5, 10)]);
    }

    #[test]
    fn last_shard_absorbs_remainder() {
        let shards = partition(10, 4).unwrap();
        assert_eq!(bounds(&shards), vec![(0, 2), (2, 4), (4, 6), (6, 10)]);
        assert_eq!(shards[3].len(), 4);
    }

    #[test]
    fn single_thread_owns_everything() {
        let shards = partition(7, 1).unwrap();
        assert_eq!(bounds(&shards), vec![(0, 7)]);
    }

    #[test]
    fn zero_threads_is_invalid() {
        assert!(matches!(
            partition(10, 0),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn fewer_items_than_threads_is_invalid() {
        assert!(partition(3, 4).is_err());
    }

    #[test]
    fn covers_range_exactly_once() {
        for data_size in 1..=64 {
            for threads in 1..=data_size.min(12) {
                let shards = partition(data_size, threads).unwrap();
                assert_eq!(shards.len(), threads);

                let mut seen = vec![0u8; data_size];
                for shard in &shards {
                    for i in shard.range() {
                        seen[i] += 1;
                    }
                }
                assert!(
                    seen.iter().all(|&c| c == 1),
                    "gap or overlap for data_size={} threads={}",
                    data_size,
                    threads
                );

                for pair in shards.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
            }
        }
    }
}
