//! Concurrent write benchmark over a grid of thread counts and data sizes.
//!
//! Run:    `cargo run --release --bin write-bench`
//! Quick:  `cargo run --release --bin write-bench -- --threads 1,2 --sizes 10000 --runs 2`
//! Smoke:  `cargo run --release --bin write-bench -- --engine memory --no-progress`
//!
//! Writes `benchmark_results.csv`, `benchmark_results_runs.csv` and a JSON
//! report into `--out-dir`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use strata_write_bench::config::{
    DEFAULT_DATA_SIZES, DEFAULT_MEMORY_INTERVAL, DEFAULT_PROGRESS_INTERVAL, DEFAULT_RUNS,
    DEFAULT_THREAD_COUNTS,
};
use strata_write_bench::csv::CsvWriter;
use strata_write_bench::recorder::{format_num, print_summary, ResultRecorder};
use strata_write_bench::{
    DurabilityConfig, GridConfig, MemoryEngine, Orchestrator, Result, StorageEngine, StrataEngine,
};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    Strata,
    Memory,
}

#[derive(Debug, Parser)]
#[command(name = "write-bench", version, about)]
struct Args {
    /// Writer thread counts to test.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_THREAD_COUNTS)]
    threads: Vec<usize>,

    /// Number of items written per run.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_DATA_SIZES)]
    sizes: Vec<usize>,

    /// Repetitions per configuration.
    #[arg(long, default_value_t = DEFAULT_RUNS)]
    runs: usize,

    #[arg(long, value_enum, default_value_t = Engine::Strata)]
    engine: Engine,

    /// cache | standard | always
    #[arg(long, default_value = "standard", value_parser = parse_durability)]
    durability: DurabilityConfig,

    /// Parent directory for per-run storage. Defaults to a temporary
    /// directory removed on exit.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Where CSV and JSON results go.
    #[arg(long, default_value = "results")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_MEMORY_INTERVAL.as_millis() as u64)]
    memory_interval_ms: u64,

    #[arg(long, default_value_t = DEFAULT_PROGRESS_INTERVAL.as_millis() as u64)]
    progress_interval_ms: u64,

    /// Hide the live per-thread progress bars.
    #[arg(long)]
    no_progress: bool,

    /// Count written keys through the engine after each run.
    #[arg(long)]
    verify: bool,

    /// Keep each run's storage directory after it finishes.
    #[arg(long)]
    keep_data: bool,
}

fn parse_durability(s: &str) -> std::result::Result<DurabilityConfig, String> {
    DurabilityConfig::from_label(s)
        .ok_or_else(|| format!("unknown durability '{}' (expected cache, standard or always)", s))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "benchmark aborted");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    // Lives until run() returns so the scratch directory outlives the grid.
    let scratch;
    let data_dir = match &args.data_dir {
        Some(dir) => dir.clone(),
        None => {
            scratch = tempfile::Builder::new().prefix("write-bench-").tempdir()?;
            scratch.path().to_path_buf()
        }
    };

    let grid = GridConfig {
        thread_counts: args.threads.clone(),
        data_sizes: args.sizes.clone(),
        num_runs: args.runs,
        data_dir,
        durability: args.durability,
        memory_interval: Duration::from_millis(args.memory_interval_ms),
        progress_interval: Duration::from_millis(args.progress_interval_ms),
        show_progress: !args.no_progress,
        verify: args.verify,
        keep_data: args.keep_data,
    };

    match args.engine {
        Engine::Strata => run_grid::<StrataEngine>(grid, &args),
        Engine::Memory => run_grid::<MemoryEngine>(grid, &args),
    }
}

fn run_grid<E: StorageEngine>(grid: GridConfig, args: &Args) -> Result<()> {
    let orchestrator = Orchestrator::<E>::new(grid)?;
    let cfg = orchestrator.config();

    eprintln!("=== {} write benchmark ===", E::NAME);
    eprintln!(
        "Threads: {:?}  Sizes: {}  Runs: {}  Durability: {}",
        cfg.thread_counts,
        cfg.data_sizes
            .iter()
            .map(|&d| format_num(d as u64))
            .collect::<Vec<_>>()
            .join(", "),
        cfg.num_runs,
        cfg.durability.label(),
    );
    info!(data_dir = %cfg.data_dir.display(), "storage root");

    let recorder = ResultRecorder::new(E::NAME, cfg.durability);
    let csv = CsvWriter::create(&args.out_dir)?;
    let mut sinks = (recorder, csv);

    let summary = orchestrator.run_grid(&mut sinks)?;
    let (recorder, csv) = sinks;

    print_summary(&summary.aggregates);
    eprintln!(
        "Runs completed: {} | skipped: {}",
        summary.runs_completed, summary.runs_skipped
    );
    recorder.save(&args.out_dir)?;
    eprintln!("Benchmark complete! CSV results saved to {}", csv.dir().display());
    Ok(())
}
