//! Walks the `(thread_count, data_size)` grid and measures every run.
//!
//! A run owns all of its state: a freshly reset storage location, a new
//! [`ProgressTable`], and its own sampler and reporter threads. Background
//! threads are stopped and joined before the engine is closed, and the engine
//! is closed before the next run resets its location.

use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, error, info, info_span, warn};

use crate::config::{BenchmarkConfig, GridConfig};
use crate::csv::CsvWriter;
use crate::engine::StorageEngine;
use crate::error::{Error, Result};
use crate::memory::{MemorySampler, ProcessMemoryProbe};
use crate::partition::partition;
use crate::progress::{ProgressReporter, ProgressTable, ReportTarget};
use crate::recorder::{format_bytes, ResultRecorder};
use crate::schema::{AggregateResult, RunResult};
use crate::worker::{write_shard, WorkerReport, KEY_PREFIX};

/// Receives results as soon as they exist. Errors here abort the grid.
pub trait ResultSink {
    fn on_run(&mut self, run: &RunResult) -> Result<()>;
    fn on_aggregate(&mut self, aggregate: &AggregateResult) -> Result<()>;
}

impl ResultSink for ResultRecorder {
    fn on_run(&mut self, run: &RunResult) -> Result<()> {
        self.record_run(run.clone());
        Ok(())
    }

    fn on_aggregate(&mut self, aggregate: &AggregateResult) -> Result<()> {
        self.record_aggregate(aggregate.clone());
        Ok(())
    }
}

impl ResultSink for CsvWriter {
    fn on_run(&mut self, run: &RunResult) -> Result<()> {
        self.write_run(run)
    }

    fn on_aggregate(&mut self, aggregate: &AggregateResult) -> Result<()> {
        self.write_aggregate(aggregate)
    }
}

impl<A: ResultSink, B: ResultSink> ResultSink for (A, B) {
    fn on_run(&mut self, run: &RunResult) -> Result<()> {
        self.0.on_run(run)?;
        self.1.on_run(run)
    }

    fn on_aggregate(&mut self, aggregate: &AggregateResult) -> Result<()> {
        self.0.on_aggregate(aggregate)?;
        self.1.on_aggregate(aggregate)
    }
}

/// Everything a single run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: RunResult,
    /// Progress table as read after the workers joined.
    pub final_progress: Vec<u8>,
    pub workers: Vec<WorkerReport>,
}

#[derive(Debug, Clone, Default)]
pub struct GridSummary {
    pub runs_completed: usize,
    pub runs_skipped: usize,
    pub aggregates: Vec<AggregateResult>,
}

pub struct Orchestrator<E> {
    config: GridConfig,
    _engine: PhantomData<fn() -> E>,
}

impl<E: StorageEngine> Orchestrator<E> {
    /// Validates the grid up front; nothing is launched for a bad grid.
    pub fn new(config: GridConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            _engine: PhantomData,
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// `<data_dir>/<engine>_t<T>_d<D>_r<R>`
    pub fn run_location(&self, cfg: &BenchmarkConfig) -> PathBuf {
        self.config.data_dir.join(format!(
            "{}_t{}_d{}_r{}",
            E::NAME,
            cfg.thread_count,
            cfg.data_size,
            cfg.run_index
        ))
    }

    pub fn run_grid<S: ResultSink>(&self, sink: &mut S) -> Result<GridSummary> {
        let mut summary = GridSummary::default();

        for (thread_count, data_size) in self.config.cells() {
            let mut runs = Vec::with_capacity(self.config.num_runs);

            for run_index in 0..self.config.num_runs {
                let cfg = BenchmarkConfig::new(thread_count, data_size, run_index);
                match self.run_once(cfg) {
                    Ok(report) => {
                        sink.on_run(&report.result)?;
                        runs.push(report.result);
                        summary.runs_completed += 1;
                    }
                    Err(e) => {
                        error!(thread_count, data_size, run_index, error = %e, "run skipped");
                        summary.runs_skipped += 1;
                    }
                }
            }

            match AggregateResult::from_runs(&runs) {
                Some(agg) => {
                    info!(
                        thread_count,
                        data_size,
                        avg_ms = %format_args!("{:.1}", agg.avg_duration_ms),
                        avg_memory = %format_bytes(agg.avg_memory_bytes as u64),
                        runs = agg.runs,
                        "configuration complete"
                    );
                    sink.on_aggregate(&agg)?;
                    summary.aggregates.push(agg);
                }
                None => warn!(thread_count, data_size, "no run completed; no average recorded"),
            }
        }

        Ok(summary)
    }

    /// Execute one run end to end.
    ///
    /// Fails only when the run cannot produce a measurement (the engine did
    /// not open, or the memory probe is unavailable). Failed writes and a
    /// failed location reset are logged and the run continues.
    pub fn run_once(&self, cfg: BenchmarkConfig) -> Result<RunReport> {
        let _span = info_span!(
            "run",
            threads = cfg.thread_count,
            data_size = cfg.data_size,
            run = cfg.run_index
        )
        .entered();

        let shards = partition(cfg.data_size, cfg.thread_count)?;
        let location = self.run_location(&cfg);

        if let Err(e) = prepare_location(&location) {
            warn!(
                path = %location.display(),
                error = %e,
                "could not reset storage location; stale data may skew this run"
            );
        }

        let engine = E::open(&location, &self.config.engine_options(cfg.thread_count))?;
        let probe = ProcessMemoryProbe::new()?;

        let table = Arc::new(ProgressTable::new(cfg.thread_count));
        let sampler = MemorySampler::start(probe, self.config.memory_interval);
        let reporter = ProgressReporter::start(
            Arc::clone(&table),
            cfg.data_size,
            self.config.progress_interval,
            if self.config.show_progress {
                ReportTarget::Stderr
            } else {
                ReportTarget::Hidden
            },
        );

        let start = Instant::now();
        let workers: Vec<WorkerReport> = thread::scope(|s| {
            let handles: Vec<_> = shards
                .iter()
                .enumerate()
                .map(|(worker, &shard)| {
                    let engine = &engine;
                    let table = &*table;
                    s.spawn(move || write_shard(engine, shard, worker, table))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|p| std::panic::resume_unwind(p)))
                .collect()
        });
        let elapsed = start.elapsed();

        let peak_memory_bytes = sampler.stop();
        reporter.stop();
        let final_progress = table.snapshot();

        let keys_written: u64 = workers.iter().map(|w| w.written).sum();
        let write_failures: u64 = workers.iter().map(|w| w.failures).sum();
        if write_failures > 0 {
            warn!(write_failures, "run finished with failed writes");
        }

        if self.config.verify {
            verify_key_count(&engine, cfg.data_size as u64 - write_failures);
        }

        if let Err(e) = engine.close() {
            warn!(path = %location.display(), error = %e, "engine did not close cleanly");
        }

        if !self.config.keep_data {
            if let Err(e) = std::fs::remove_dir_all(&location) {
                debug!(path = %location.display(), error = %e, "could not remove run data");
            }
        }

        let result = RunResult {
            config: cfg,
            duration_ms: elapsed.as_millis() as u64,
            peak_memory_bytes,
            keys_written,
            write_failures,
        };
        info!(
            duration_ms = result.duration_ms,
            peak_memory = %format_bytes(peak_memory_bytes),
            "run complete"
        );

        Ok(RunReport {
            result,
            final_progress,
            workers,
        })
    }
}

/// Remove whatever is at `path`, recreate it as a directory, and check that
/// it is empty.
pub fn prepare_location(path: &Path) -> Result<()> {
    let fs_err = |source: io::Error| Error::Filesystem {
        path: path.to_path_buf(),
        source,
    };

    match std::fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(fs_err(e)),
    }
    std::fs::create_dir_all(path).map_err(fs_err)?;

    if std::fs::read_dir(path).map_err(fs_err)?.next().is_some() {
        return Err(fs_err(io::Error::new(
            io::ErrorKind::Other,
            "directory not empty after reset",
        )));
    }
    Ok(())
}

fn verify_key_count<E: StorageEngine>(engine: &E, expected: u64) {
    match engine.count_prefix(KEY_PREFIX) {
        Ok(found) if found as u64 == expected => debug!(found, "key count verified"),
        Ok(found) => warn!(expected, found, "key count mismatch"),
        Err(e) => warn!(error = %e, "key count verification failed"),
    }
}
