//! Grid and engine configuration.
//!
//! Defaults reproduce the reference grid: thread counts `1, 2, 4, 8` against
//! data sizes from 10k to 400k items, ten runs each.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_THREAD_COUNTS: [usize; 4] = [1, 2, 4, 8];
pub const DEFAULT_DATA_SIZES: [usize; 6] = [10_000, 50_000, 100_000, 200_000, 300_000, 400_000];
pub const DEFAULT_RUNS: usize = 10;
pub const DEFAULT_MEMORY_INTERVAL: Duration = Duration::from_millis(10);
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Durability mode handed to the engine at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityConfig {
    Cache,
    Standard,
    Always,
}

impl DurabilityConfig {
    pub const ALL: [DurabilityConfig; 3] = [Self::Cache, Self::Standard, Self::Always];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Standard => "standard",
            Self::Always => "always",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }
}

/// Options passed through to [`crate::engine::StorageEngine::open`].
///
/// The harness never interprets these; each engine maps what it understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Background parallelism hint, set to the run's thread count.
    pub parallelism: usize,
    pub durability: DurabilityConfig,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            parallelism: 1,
            durability: DurabilityConfig::Standard,
        }
    }
}

/// One cell of the grid for one repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub thread_count: usize,
    pub data_size: usize,
    pub run_index: usize,
}

impl BenchmarkConfig {
    pub fn new(thread_count: usize, data_size: usize, run_index: usize) -> Self {
        Self {
            thread_count,
            data_size,
            run_index,
        }
    }
}

/// Everything the orchestrator needs to walk the grid.
#[derive(Debug, Clone)]
pub struct GridConfig {
    pub thread_counts: Vec<usize>,
    pub data_sizes: Vec<usize>,
    pub num_runs: usize,
    /// Parent directory for per-run storage locations.
    pub data_dir: PathBuf,
    pub durability: DurabilityConfig,
    pub memory_interval: Duration,
    pub progress_interval: Duration,
    pub show_progress: bool,
    /// Count written keys through the engine after each run.
    pub verify: bool,
    /// Leave each run's storage on disk after it closes.
    pub keep_data: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            thread_counts: DEFAULT_THREAD_COUNTS.to_vec(),
            data_sizes: DEFAULT_DATA_SIZES.to_vec(),
            num_runs: DEFAULT_RUNS,
            data_dir: PathBuf::from("data"),
            durability: DurabilityConfig::Standard,
            memory_interval: DEFAULT_MEMORY_INTERVAL,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            show_progress: true,
            verify: false,
            keep_data: false,
        }
    }
}

impl GridConfig {
    /// Reject grids that could not produce a single sane measurement.
    pub fn validate(&self) -> Result<()> {
        if self.thread_counts.is_empty() {
            return Err(Error::invalid("no thread counts configured"));
        }
        if self.data_sizes.is_empty() {
            return Err(Error::invalid("no data sizes configured"));
        }
        if self.num_runs == 0 {
            return Err(Error::invalid("number of runs must be at least 1"));
        }
        if self.memory_interval.is_zero() || self.progress_interval.is_zero() {
            return Err(Error::invalid("sampling intervals must be non-zero"));
        }
        for &threads in &self.thread_counts {
            validate_pair(threads, self.data_sizes.iter().copied().min().unwrap_or(0))?;
        }
        Ok(())
    }

    /// Grid cells in execution order: thread count outer, data size inner.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.thread_counts
            .iter()
            .flat_map(move |&t| self.data_sizes.iter().map(move |&d| (t, d)))
    }

    pub fn engine_options(&self, thread_count: usize) -> EngineOptions {
        EngineOptions {
            parallelism: thread_count,
            durability: self.durability,
        }
    }
}

/// A `(thread_count, data_size)` pair is usable when every worker gets at
/// least one item.
pub fn validate_pair(thread_count: usize, data_size: usize) -> Result<()> {
    if thread_count == 0 {
        return Err(Error::invalid("thread count must be at least 1"));
    }
    if data_size < thread_count {
        return Err(Error::invalid(format!(
            "data size {} is smaller than thread count {}",
            data_size, thread_count
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_is_valid() {
        let cfg = GridConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.cells().count(), 24);
    }

    #[test]
    fn cells_iterate_threads_outer() {
        let cfg = GridConfig {
            thread_counts: vec![1, 2],
            data_sizes: vec![10, 20],
            ..Default::default()
        };
        let cells: Vec<_> = cfg.cells().collect();
        assert_eq!(cells, vec![(1, 10), (1, 20), (2, 10), (2, 20)]);
    }

    #[test]
    fn rejects_zero_threads() {
        let cfg = GridConfig {
            thread_counts: vec![0, 2],
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_data_smaller_than_threads() {
        let cfg = GridConfig {
            thread_counts: vec![8],
            data_sizes: vec![100, 4],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_runs_and_intervals() {
        let no_runs = GridConfig {
            num_runs: 0,
            ..Default::default()
        };
        assert!(no_runs.validate().is_err());

        let no_interval = GridConfig {
            memory_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(no_interval.validate().is_err());
    }

    #[test]
    fn durability_labels_round_trip() {
        for mode in DurabilityConfig::ALL {
            assert_eq!(DurabilityConfig::from_label(mode.label()), Some(mode));
        }
        assert_eq!(DurabilityConfig::from_label("sometimes"), None);
    }
}
