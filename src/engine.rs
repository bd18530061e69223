//! Storage engines the harness can drive.
//!
//! The harness only needs to open a store at a path, write string pairs into
//! it from many threads at once, and close it. Engine-level tuning arrives as
//! [`EngineOptions`] and is mapped by each implementation as it sees fit.

use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::RwLock;
use stratadb::{Strata, Value};
use tracing::{debug, warn};

use crate::config::EngineOptions;
use crate::error::{Error, Result};

/// A key-value store shared by every writer of a run.
///
/// Implementations must tolerate concurrent `put` calls through `&self`; the
/// harness adds no locking of its own.
pub trait StorageEngine: Send + Sync + Sized {
    /// Short name used in storage directory names and reports.
    const NAME: &'static str;

    fn open(path: &Path, options: &EngineOptions) -> Result<Self>;

    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Number of keys starting with `prefix`.
    fn count_prefix(&self, prefix: &str) -> Result<usize>;

    fn close(self) -> Result<()> {
        drop(self);
        Ok(())
    }
}

// =============================================================================
// StrataDB
// =============================================================================

pub struct StrataEngine {
    db: Strata,
}

impl StorageEngine for StrataEngine {
    const NAME: &'static str = "strata";

    fn open(path: &Path, options: &EngineOptions) -> Result<Self> {
        let db = Strata::open(path).map_err(|e| Error::StorageOpen {
            path: path.to_path_buf(),
            reason: format!("{:?}", e),
        })?;

        // Durability is a runtime setting; a store that refuses it still
        // takes writes, so keep going with its default.
        if let Err(e) = db.config_set("durability", options.durability.label()) {
            warn!(
                durability = options.durability.label(),
                error = ?e,
                "engine rejected durability setting"
            );
        }
        debug!(path = %path.display(), parallelism = options.parallelism, "opened strata");
        Ok(Self { db })
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .kv_put(key, Value::String(value.to_string()))
            .map(|_| ())
            .map_err(|e| Error::Write {
                key: key.to_string(),
                reason: format!("{:?}", e),
            })
    }

    fn count_prefix(&self, prefix: &str) -> Result<usize> {
        self.db
            .kv_list(Some(prefix))
            .map(|keys| keys.len())
            .map_err(|e| Error::Storage(format!("listing '{}' failed: {:?}", prefix, e)))
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Ordered map behind a reader-writer lock. Touches the filesystem only
/// through the location the harness prepares for it.
#[derive(Default)]
pub struct MemoryEngine {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryEngine {
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }
}

impl StorageEngine for MemoryEngine {
    const NAME: &'static str = "memory";

    fn open(path: &Path, _options: &EngineOptions) -> Result<Self> {
        if !path.is_dir() {
            return Err(Error::StorageOpen {
                path: path.to_path_buf(),
                reason: "location is not a directory".into(),
            });
        }
        Ok(Self::default())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn count_prefix(&self, prefix: &str) -> Result<usize> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .count())
    }
}
