//! Benchmark comparison tool.
//!
//! Compares the averages in two JSON reports and prints time and memory deltas
//! per `(threads, data size)` cell.
//!
//! Usage: `cargo run --bin bench-compare -- <baseline.json> <candidate.json>`

use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;

use strata_write_bench::recorder::{format_bytes, format_num};
use strata_write_bench::schema::{AggregateResult, BenchmarkReport};
use strata_write_bench::Result;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <baseline.json> <candidate.json>", args[0]);
        return ExitCode::FAILURE;
    }

    let (baseline, candidate) = match (load_report(&args[1]), load_report(&args[2])) {
        (Ok(b), Ok(c)) => (b, c),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error loading report: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let base_map: HashMap<(usize, usize), &AggregateResult> = baseline
        .aggregates
        .iter()
        .map(|a| ((a.thread_count, a.data_size), a))
        .collect();
    let cand_keys: Vec<(usize, usize)> = candidate
        .aggregates
        .iter()
        .map(|a| (a.thread_count, a.data_size))
        .collect();

    eprintln!(
        "Baseline: {} ({}, {})",
        args[1], baseline.engine, baseline.metadata.timestamp
    );
    eprintln!(
        "Candidate: {} ({}, {})",
        args[2], candidate.engine, candidate.metadata.timestamp
    );
    eprintln!();

    println!(
        "{:>7} | {:>10} | {:>10} | {:>10} | {:>18} | {:>10} | {:>10} | {:>8}",
        "Threads", "Items", "Base ms", "New ms", "Time delta", "Base mem", "New mem", "Mem"
    );
    println!("{}", "-".repeat(100));

    let mut matched = 0u32;
    let mut only_cand = 0u32;
    for cand in &candidate.aggregates {
        match base_map.get(&(cand.thread_count, cand.data_size)) {
            Some(base) => {
                matched += 1;
                print_comparison(base, cand);
            }
            None => only_cand += 1,
        }
    }
    let only_base = base_map.keys().filter(|k| !cand_keys.contains(k)).count();

    println!("{}", "-".repeat(100));
    println!(
        "Compared: {} | Baseline only: {} | Candidate only: {}",
        matched, only_base, only_cand
    );
    ExitCode::SUCCESS
}

fn load_report(path: &str) -> Result<BenchmarkReport> {
    let contents = std::fs::read_to_string(Path::new(path))?;
    Ok(serde_json::from_str(&contents)?)
}

fn delta_pct(base: f64, cand: f64) -> f64 {
    if base > 0.0 {
        (cand - base) / base * 100.0
    } else {
        0.0
    }
}

fn print_comparison(base: &AggregateResult, cand: &AggregateResult) {
    let time_delta = delta_pct(base.avg_duration_ms, cand.avg_duration_ms);
    let hint = if time_delta < -1.0 {
        "faster"
    } else if time_delta > 1.0 {
        "slower"
    } else {
        "~same"
    };

    println!(
        "{:>7} | {:>10} | {:>10.1} | {:>10.1} | {:>+7.1}% ({:>6}) | {:>10} | {:>10} | {:>+7.1}%",
        cand.thread_count,
        format_num(cand.data_size as u64),
        base.avg_duration_ms,
        cand.avg_duration_ms,
        time_delta,
        hint,
        format_bytes(base.avg_memory_bytes as u64),
        format_bytes(cand.avg_memory_bytes as u64),
        delta_pct(base.avg_memory_bytes, cand.avg_memory_bytes),
    );
}
