//! Concurrent write benchmark for key-value storage engines.
//!
//! For every `(thread_count, data_size)` pair of a grid, and for a number of
//! repetitions, the harness opens a fresh store, splits `data_size` puts
//! across `thread_count` writer threads, and records wall-clock duration and
//! the peak resident memory of the process while the writers run.

pub mod config;
pub mod csv;
pub mod engine;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod partition;
pub mod progress;
pub mod recorder;
pub mod schema;
pub mod worker;

pub use config::{BenchmarkConfig, DurabilityConfig, EngineOptions, GridConfig};
pub use engine::{MemoryEngine, StorageEngine, StrataEngine};
pub use error::{Error, Result};
pub use orchestrator::{GridSummary, Orchestrator, ResultSink, RunReport};
pub use schema::{AggregateResult, RunResult};
