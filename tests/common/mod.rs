//! Shared test utilities: small grids and engines with scripted behavior.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use strata_write_bench::{EngineOptions, Error, GridConfig, MemoryEngine, Result, StorageEngine};

// =============================================================================
// Grids
// =============================================================================

/// A quiet grid rooted at `data_dir`.
pub fn small_grid(data_dir: &Path, threads: &[usize], sizes: &[usize], runs: usize) -> GridConfig {
    GridConfig {
        thread_counts: threads.to_vec(),
        data_sizes: sizes.to_vec(),
        num_runs: runs,
        data_dir: data_dir.to_path_buf(),
        memory_interval: Duration::from_millis(1),
        progress_interval: Duration::from_millis(5),
        show_progress: false,
        verify: true,
        ..Default::default()
    }
}

fn item_index(key: &str) -> Option<usize> {
    key.rsplit('_').next()?.parse().ok()
}

// =============================================================================
// Engines
// =============================================================================

/// Fails every put whose item index is a multiple of three.
pub struct FlakyEngine {
    inner: MemoryEngine,
    attempts: AtomicU64,
}

impl StorageEngine for FlakyEngine {
    const NAME: &'static str = "flaky";

    fn open(path: &Path, options: &EngineOptions) -> Result<Self> {
        Ok(Self {
            inner: MemoryEngine::open(path, options)?,
            attempts: AtomicU64::new(0),
        })
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        match item_index(key) {
            Some(i) if i % 3 == 0 => Err(Error::Write {
                key: key.to_string(),
                reason: "injected failure".into(),
            }),
            _ => self.inner.put(key, value),
        }
    }

    fn count_prefix(&self, prefix: &str) -> Result<usize> {
        self.inner.count_prefix(prefix)
    }
}

/// Never opens.
pub struct UnopenableEngine;

impl StorageEngine for UnopenableEngine {
    const NAME: &'static str = "unopenable";

    fn open(path: &Path, _options: &EngineOptions) -> Result<Self> {
        Err(Error::StorageOpen {
            path: path.to_path_buf(),
            reason: "refusing to open".into(),
        })
    }

    fn put(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn count_prefix(&self, _prefix: &str) -> Result<usize> {
        Ok(0)
    }
}

/// Entries found in each location at the moment `open` was called.
pub static OPEN_LISTINGS: Mutex<Vec<(PathBuf, usize)>> = Mutex::new(Vec::new());

/// Records the directory listing at open time and leaves a file behind, so
/// the next run over the same location has something to clean up.
pub struct LitteringEngine {
    inner: MemoryEngine,
}

impl StorageEngine for LitteringEngine {
    const NAME: &'static str = "littering";

    fn open(path: &Path, options: &EngineOptions) -> Result<Self> {
        let entries = std::fs::read_dir(path)?.count();
        OPEN_LISTINGS.lock().unwrap().push((path.to_path_buf(), entries));
        std::fs::write(path.join("LOCK"), b"held")?;
        Ok(Self {
            inner: MemoryEngine::open(path, options)?,
        })
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.inner.put(key, value)
    }

    fn count_prefix(&self, prefix: &str) -> Result<usize> {
        self.inner.count_prefix(prefix)
    }
}

/// Keeps everything in memory and never looks at its location, so it opens
/// even where the location could not be prepared.
pub struct DetachedEngine {
    inner: MemoryEngine,
}

impl StorageEngine for DetachedEngine {
    const NAME: &'static str = "detached";

    fn open(_path: &Path, _options: &EngineOptions) -> Result<Self> {
        Ok(Self {
            inner: MemoryEngine::default(),
        })
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.inner.put(key, value)
    }

    fn count_prefix(&self, prefix: &str) -> Result<usize> {
        self.inner.count_prefix(prefix)
    }
}

/// Takes writes normally but fails on close.
pub struct StuckEngine {
    inner: MemoryEngine,
}

impl StorageEngine for StuckEngine {
    const NAME: &'static str = "stuck";

    fn open(path: &Path, options: &EngineOptions) -> Result<Self> {
        Ok(Self {
            inner: MemoryEngine::open(path, options)?,
        })
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.inner.put(key, value)
    }

    fn count_prefix(&self, prefix: &str) -> Result<usize> {
        self.inner.count_prefix(prefix)
    }

    fn close(self) -> Result<()> {
        Err(Error::Storage("flush on close failed".into()))
    }
}
