//! Result recorder for saving grid results to JSON.
//!
//! Creates `write-<timestamp>-<commit>.json` in the output directory following
//! the schema in [`crate::schema`].

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sysinfo::System;
use tracing::info;

use crate::config::DurabilityConfig;
use crate::error::Result;
use crate::schema::{AggregateResult, BenchmarkReport, HardwareInfo, RunMetadata, RunResult};

pub const SCHEMA_VERSION: u32 = 1;

/// Accumulates run and aggregate results for one grid.
pub struct ResultRecorder {
    engine: String,
    durability: DurabilityConfig,
    metadata: RunMetadata,
    runs: Vec<RunResult>,
    aggregates: Vec<AggregateResult>,
}

impl ResultRecorder {
    /// Captures metadata (hardware, git, timestamp) at construction time.
    pub fn new(engine: &str, durability: DurabilityConfig) -> Self {
        Self {
            engine: engine.to_string(),
            durability,
            metadata: RunMetadata {
                timestamp: iso8601_now(),
                git_commit: git_short_commit(),
                git_branch: git_branch(),
                git_dirty: git_is_dirty(),
                harness_version: env!("CARGO_PKG_VERSION").to_string(),
                hardware: capture_hardware(),
            },
            runs: Vec::new(),
            aggregates: Vec::new(),
        }
    }

    pub fn record_run(&mut self, run: RunResult) {
        self.runs.push(run);
    }

    pub fn record_aggregate(&mut self, aggregate: AggregateResult) {
        self.aggregates.push(aggregate);
    }

    pub fn runs(&self) -> &[RunResult] {
        &self.runs
    }

    pub fn aggregates(&self) -> &[AggregateResult] {
        &self.aggregates
    }

    pub fn report(&self) -> BenchmarkReport {
        BenchmarkReport {
            schema_version: SCHEMA_VERSION,
            metadata: self.metadata.clone(),
            engine: self.engine.clone(),
            durability: self.durability.label().to_string(),
            runs: self.runs.clone(),
            aggregates: self.aggregates.clone(),
        }
    }

    /// Write everything recorded so far into `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let commit = self.metadata.git_commit.as_deref().unwrap_or("unknown");
        // Colons are not portable in file names.
        let ts = self.metadata.timestamp.replace(':', "-");
        let path = dir.join(format!("write-{}-{}.json", ts, commit));

        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(&self.report())?;
        std::fs::write(&path, json)?;

        info!(path = %path.display(), "results saved");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Console formatting
// ---------------------------------------------------------------------------

/// Print all aggregates as a table on stderr.
pub fn print_summary(aggregates: &[AggregateResult]) {
    eprintln!();
    eprintln!(
        "  {:>7}  {:>10}  {:>12}  {:>12}  {:>5}",
        "threads", "items", "avg time", "avg memory", "runs"
    );
    eprintln!("  {}", "-".repeat(54));
    for a in aggregates {
        eprintln!(
            "  {:>7}  {:>10}  {:>10.1}ms  {:>12}  {:>5}",
            a.thread_count,
            format_num(a.data_size as u64),
            a.avg_duration_ms,
            format_bytes(a.avg_memory_bytes as u64),
            a.runs,
        );
    }
    eprintln!();
}

pub fn format_num(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

pub fn format_items(n: usize) -> String {
    if n >= 1_000_000 && n % 1_000_000 == 0 {
        format!("{}M items", n / 1_000_000)
    } else if n >= 1_000 && n % 1_000 == 0 {
        format!("{}K items", n / 1_000)
    } else {
        format!("{} items", n)
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ---------------------------------------------------------------------------
// Metadata capture helpers
// ---------------------------------------------------------------------------

fn iso8601_now() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let (year, month, day) = days_to_ymd(secs / 86400);
    let time_of_day = secs % 86400;

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60
    )
}

/// Civil date from days since the Unix epoch (Howard Hinnant's algorithm).
fn days_to_ymd(days: u64) -> (u64, u64, u64) {
    let days = days + 719468;
    let era = days / 146097;
    let doe = days - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe + era * 400 + u64::from(m <= 2);
    (y, m, d)
}

fn git(args: &[&str]) -> Option<Vec<u8>> {
    std::process::Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| o.stdout)
}

fn git_short_commit() -> Option<String> {
    git(&["rev-parse", "--short", "HEAD"]).map(|out| String::from_utf8_lossy(&out).trim().to_string())
}

fn git_branch() -> Option<String> {
    git(&["rev-parse", "--abbrev-ref", "HEAD"])
        .map(|out| String::from_utf8_lossy(&out).trim().to_string())
}

fn git_is_dirty() -> Option<bool> {
    git(&["status", "--porcelain"]).map(|out| !out.is_empty())
}

fn capture_hardware() -> HardwareInfo {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu();

    HardwareInfo {
        cpu: sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        cores: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(0),
        ram_gb: sys.total_memory() / (1024 * 1024 * 1024),
        os: System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
        arch: std::env::consts::ARCH.to_string(),
    }
}
