//! Resident-memory sampling.
//!
//! [`MemorySampler`] polls a [`MemoryProbe`] on its own thread and keeps the
//! largest value seen. The peak is only handed out after the thread has been
//! joined, so the reported number is final.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sysinfo::{Pid, System};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Source of "current resident bytes" samples.
pub trait MemoryProbe: Send {
    fn resident_bytes(&mut self) -> u64;
}

/// Resident set size of the current process, via `sysinfo`.
pub struct ProcessMemoryProbe {
    system: System,
    pid: Pid,
}

impl ProcessMemoryProbe {
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| Error::MemoryProbe(e.to_string()))?;
        Ok(Self {
            system: System::new(),
            pid,
        })
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn resident_bytes(&mut self) -> u64 {
        if !self.system.refresh_process(self.pid) {
            return 0;
        }
        self.system
            .process(self.pid)
            .map(|p| p.memory())
            .unwrap_or(0)
    }
}

/// Running maximum shared between the sampler thread and its owner.
#[derive(Debug, Default)]
pub struct PeakMemory(AtomicU64);

impl PeakMemory {
    pub fn observe(&self, sample: u64) {
        self.0.fetch_max(sample, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct MemorySampler {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<u64>>,
    peak: Arc<PeakMemory>,
}

impl MemorySampler {
    /// Start sampling. The first sample is taken immediately, then one per
    /// `interval` until [`MemorySampler::stop`].
    pub fn start<P>(mut probe: P, interval: Duration) -> Self
    where
        P: MemoryProbe + 'static,
    {
        let peak = Arc::new(PeakMemory::default());
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread_peak = Arc::clone(&peak);
        let handle = thread::Builder::new()
            .name("memory-sampler".into())
            .spawn(move || {
                let mut samples = 0u64;
                loop {
                    thread_peak.observe(probe.resident_bytes());
                    samples += 1;
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(samples, peak = thread_peak.get(), "memory sampler stopped");
                samples
            });

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(error = %e, "failed to spawn memory sampler; peak memory will read 0");
                None
            }
        };

        Self {
            stop_tx,
            handle,
            peak,
        }
    }

    /// Stop the thread, wait for it, and return the final peak in bytes.
    pub fn stop(self) -> u64 {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle {
            if handle.join().is_err() {
                warn!("memory sampler panicked");
            }
        }
        self.peak.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Replays a fixed sequence, then repeats the last value.
    struct ScriptedProbe {
        samples: Vec<u64>,
        next: usize,
        taken: Arc<Mutex<Vec<u64>>>,
    }

    impl MemoryProbe for ScriptedProbe {
        fn resident_bytes(&mut self) -> u64 {
            let idx = self.next.min(self.samples.len() - 1);
            self.next += 1;
            let v = self.samples[idx];
            self.taken.lock().push(v);
            v
        }
    }

    #[test]
    fn peak_is_at_least_every_sample() {
        let taken = Arc::new(Mutex::new(Vec::new()));
        let probe = ScriptedProbe {
            samples: vec![100, 900, 300, 50, 700],
            next: 0,
            taken: Arc::clone(&taken),
        };
        let sampler = MemorySampler::start(probe, Duration::from_millis(1));
        thread::sleep(Duration::from_millis(30));
        let peak = sampler.stop();

        let taken = taken.lock();
        assert!(!taken.is_empty());
        assert!(taken.iter().all(|&s| peak >= s));
        assert_eq!(peak, *taken.iter().max().unwrap());
    }

    #[test]
    fn samples_once_even_when_stopped_immediately() {
        let taken = Arc::new(Mutex::new(Vec::new()));
        let probe = ScriptedProbe {
            samples: vec![4096],
            next: 0,
            taken: Arc::clone(&taken),
        };
        let sampler = MemorySampler::start(probe, Duration::from_secs(60));
        assert_eq!(sampler.stop(), 4096);
        assert_eq!(taken.lock().len(), 1);
    }

    #[test]
    fn no_updates_after_stop() {
        let taken = Arc::new(Mutex::new(Vec::new()));
        let probe = ScriptedProbe {
            samples: vec![1, 2, 3],
            next: 0,
            taken: Arc::clone(&taken),
        };
        let sampler = MemorySampler::start(probe, Duration::from_millis(1));
        thread::sleep(Duration::from_millis(10));
        sampler.stop();
        let count = taken.lock().len();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(taken.lock().len(), count);
    }

    #[test]
    fn process_probe_reports_nonzero_rss() {
        let mut probe = ProcessMemoryProbe::new().unwrap();
        assert!(probe.resident_bytes() > 0);
    }
}
