use tracing::warn;

use crate::engine::StorageEngine;
use crate::partition::Shard;
use crate::progress::{percent_done, ProgressTable};

/// Common prefix of every key the harness writes.
pub const KEY_PREFIX: &str = "key_t";

pub fn item_key(worker: usize, index: usize) -> String {
    format!("{}{}_{}", KEY_PREFIX, worker, index)
}

pub fn item_value(index: usize) -> String {
    format!("value_{}", index)
}

/// Outcome of one worker's shard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub written: u64,
    pub failures: u64,
}

/// Write every item of `shard` in order, keeping `table[worker]` current.
///
/// Failed puts are logged and skipped. The slot ends at 100 either way.
pub fn write_shard<E: StorageEngine>(
    engine: &E,
    shard: Shard,
    worker: usize,
    table: &ProgressTable,
) -> WorkerReport {
    let total = shard.len();
    let mut report = WorkerReport {
        worker,
        ..Default::default()
    };

    for (done, index) in shard.range().enumerate() {
        let key = item_key(worker, index);
        match engine.put(&key, &item_value(index)) {
            Ok(()) => report.written += 1,
            Err(e) => {
                report.failures += 1;
                warn!(worker, key = %key, error = %e, "write failed");
            }
        }
        table.set(worker, percent_done(done + 1, total));
    }

    table.set(worker, 100);
    report
}
