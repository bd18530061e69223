//! Per-worker progress slots and the live multi-bar reporter that polls them.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, warn};

use crate::recorder::format_items;

const BAR_TEMPLATE: &str = "{prefix:>4} [{bar:30}] {pos:>3}%";

/// One completion percentage per worker for a single run.
///
/// Each slot has exactly one writer, so plain atomics are enough.
#[derive(Debug)]
pub struct ProgressTable {
    slots: Vec<AtomicU8>,
}

impl ProgressTable {
    pub fn new(workers: usize) -> Self {
        Self {
            slots: (0..workers).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Raise the worker's slot to `percent`. Lower values are ignored so a
    /// slot never goes backwards within a run.
    pub fn set(&self, worker: usize, percent: u8) {
        self.slots[worker].fetch_max(percent.min(100), Ordering::Relaxed);
    }

    pub fn get(&self, worker: usize) -> u8 {
        self.slots[worker].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.slots.iter().map(|s| s.load(Ordering::Relaxed)).collect()
    }

    pub fn all_complete(&self) -> bool {
        self.slots.iter().all(|s| s.load(Ordering::Relaxed) == 100)
    }
}

/// `round(100 * done / total)`. Only a finished shard reads 100; anything
/// short of that is capped at 99.
pub fn percent_done(done: usize, total: usize) -> u8 {
    if done >= total {
        return 100;
    }
    let pct = (done.saturating_mul(100) + total / 2) / total;
    pct.min(99) as u8
}

/// Where the reporter draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTarget {
    Stderr,
    Hidden,
}

/// Background thread redrawing one bar per worker until stopped.
pub struct ProgressReporter {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<Vec<u8>>>,
}

impl ProgressReporter {
    pub fn start(
        table: Arc<ProgressTable>,
        data_size: usize,
        interval: Duration,
        target: ReportTarget,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("progress-reporter".into())
            .spawn(move || {
                let multi = MultiProgress::with_draw_target(match target {
                    ReportTarget::Stderr => ProgressDrawTarget::stderr(),
                    ReportTarget::Hidden => ProgressDrawTarget::hidden(),
                });
                if let Err(e) = multi.println(format!("Data: {}", format_items(data_size))) {
                    debug!(error = %e, "could not draw progress banner");
                }
                let bars = build_bars(&multi, table.len());

                loop {
                    render(&bars, &table.snapshot());
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                // Final pass so the terminal state is what stays on screen.
                let last = table.snapshot();
                render(&bars, &last);
                for bar in &bars {
                    bar.finish();
                }
                last
            });

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(error = %e, "failed to spawn progress reporter");
                None
            }
        };

        Self { stop_tx, handle }
    }

    /// Signal the reporter, wait for its final render and return the
    /// snapshot it drew last.
    pub fn stop(self) -> Vec<u8> {
        let _ = self.stop_tx.send(());
        match self.handle.map(JoinHandle::join) {
            Some(Ok(last)) => last,
            Some(Err(_)) => {
                warn!("progress reporter panicked");
                Vec::new()
            }
            None => Vec::new(),
        }
    }
}

fn build_bars(multi: &MultiProgress, workers: usize) -> Vec<ProgressBar> {
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    (0..workers)
        .map(|t| {
            let bar = multi.add(ProgressBar::new(100));
            bar.set_style(style.clone());
            bar.set_prefix(format!("T{}", t));
            bar
        })
        .collect()
}

fn render(bars: &[ProgressBar], snapshot: &[u8]) {
    for (bar, &pct) in bars.iter().zip(snapshot) {
        bar.set_position(pct as u64);
    }
}
