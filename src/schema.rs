//! Result types written by the harness and read back by `bench-compare`.

use serde::{Deserialize, Serialize};

use crate::config::BenchmarkConfig;

/// Top-level report written to a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    pub metadata: RunMetadata,
    /// Engine the grid was run against (e.g. "strata").
    pub engine: String,
    /// Durability mode label.
    pub durability: String,
    pub runs: Vec<RunResult>,
    pub aggregates: Vec<AggregateResult>,
}

/// Metadata captured at the start of a grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// ISO 8601 timestamp of the grid start.
    pub timestamp: String,
    /// Short git commit hash (empty if not in a git repo).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    /// Whether the working tree had uncommitted changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_dirty: Option<bool>,
    pub harness_version: String,
    pub hardware: HardwareInfo,
}

/// Hardware information for reproducibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub cpu: String,
    /// Number of logical cores.
    pub cores: usize,
    pub ram_gb: u64,
    pub os: String,
    pub arch: String,
}

/// Measurement of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(flatten)]
    pub config: BenchmarkConfig,
    /// Wall clock from worker launch to the last worker joining.
    pub duration_ms: u64,
    /// Largest resident-memory sample seen during the run.
    pub peak_memory_bytes: u64,
    pub keys_written: u64,
    #[serde(default)]
    pub write_failures: u64,
}

/// Mean over the runs of one `(thread_count, data_size)` cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub thread_count: usize,
    pub data_size: usize,
    pub avg_duration_ms: f64,
    pub avg_memory_bytes: f64,
    /// Number of runs averaged. Runs whose storage failed to open are absent.
    pub runs: usize,
}

impl AggregateResult {
    /// Arithmetic mean of `runs`. `None` when there is nothing to average.
    ///
    /// The cell is taken from the first run; callers pass runs of one cell.
    pub fn from_runs(runs: &[RunResult]) -> Option<Self> {
        let first = runs.first()?;
        let n = runs.len() as f64;
        let total_ms: u64 = runs.iter().map(|r| r.duration_ms).sum();
        let total_mem: u128 = runs.iter().map(|r| r.peak_memory_bytes as u128).sum();

        Some(Self {
            thread_count: first.config.thread_count,
            data_size: first.config.data_size,
            avg_duration_ms: total_ms as f64 / n,
            avg_memory_bytes: total_mem as f64 / n,
            runs: runs.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(idx: usize, duration_ms: u64, mem: u64) -> RunResult {
        RunResult {
            config: BenchmarkConfig::new(2, 1000, idx),
            duration_ms,
            peak_memory_bytes: mem,
            keys_written: 1000,
            write_failures: 0,
        }
    }

    #[test]
    fn aggregate_is_arithmetic_mean() {
        let runs = vec![run(0, 100, 10), run(1, 200, 20), run(2, 300, 60)];
        let agg = AggregateResult::from_runs(&runs).unwrap();
        assert!((agg.avg_duration_ms - 200.0).abs() < 1e-9);
        assert!((agg.avg_memory_bytes - 30.0).abs() < 1e-9);
        assert_eq!(agg.runs, 3);
        assert_eq!((agg.thread_count, agg.data_size), (2, 1000));
    }

    #[test]
    fn aggregate_of_nothing_is_none() {
        assert!(AggregateResult::from_runs(&[]).is_none());
    }

    #[test]
    fn run_result_flattens_config() {
        let json = serde_json::to_value(run(4, 12, 34)).unwrap();
        assert_eq!(json["thread_count"], 2);
        assert_eq!(json["run_index"], 4);
        assert_eq!(json["duration_ms"], 12);
    }
}
