//! Streaming CSV output: one file of per-run rows, one of per-cell averages.
//!
//! Rows are flushed as they are written so a grid cut short still leaves
//! every finished measurement on disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::schema::{AggregateResult, RunResult};

pub const AGGREGATE_FILE: &str = "benchmark_results.csv";
pub const RUNS_FILE: &str = "benchmark_results_runs.csv";

const AGGREGATE_HEADER: &str = "Threads,DataSize,AvgTime(ms),AvgMemory(Bytes)";
const RUNS_HEADER: &str = "Threads,DataSize,Run,Time(ms),Memory(Bytes)";

pub struct CsvWriter {
    aggregates: BufWriter<File>,
    runs: BufWriter<File>,
    dir: PathBuf,
}

impl CsvWriter {
    /// Create (truncating) both files in `dir` and write their headers.
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|source| Error::Filesystem {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut writer = Self {
            aggregates: open(&dir.join(AGGREGATE_FILE))?,
            runs: open(&dir.join(RUNS_FILE))?,
            dir: dir.to_path_buf(),
        };
        writeln!(writer.aggregates, "{}", AGGREGATE_HEADER)?;
        writeln!(writer.runs, "{}", RUNS_HEADER)?;
        writer.aggregates.flush()?;
        writer.runs.flush()?;
        Ok(writer)
    }

    pub fn write_run(&mut self, run: &RunResult) -> Result<()> {
        writeln!(
            self.runs,
            "{},{},{},{},{}",
            run.config.thread_count,
            run.config.data_size,
            run.config.run_index,
            run.duration_ms,
            run.peak_memory_bytes
        )?;
        self.runs.flush()?;
        Ok(())
    }

    pub fn write_aggregate(&mut self, agg: &AggregateResult) -> Result<()> {
        writeln!(
            self.aggregates,
            "{},{},{},{}",
            agg.thread_count, agg.data_size, agg.avg_duration_ms, agg.avg_memory_bytes
        )?;
        self.aggregates.flush()?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn open(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| Error::Filesystem {
            path: path.to_path_buf(),
            source,
        })
}
