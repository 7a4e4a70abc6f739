//! # Diet API Benchmark Library
//!
//! Load generation and latency analysis for the Diet API, a small CRUD
//! service over a relational store. The service itself is treated as an
//! opaque HTTP endpoint; this crate only measures it.
//!
//! ## Architecture Overview
//!
//! - `collector`: concurrent, duration-bounded sample collection against any
//!   [`Operation`]
//! - `metrics`: the pure aggregation of samples into a [`RunSummary`]
//!   (throughput, mean/min/max, nearest-rank percentiles, error rate)
//! - `run_log`: reading and writing per-request logs in the k6 JSON format
//! - `analysis`: per-run analysis of recorded logs and multi-run comparison
//! - `scenario`: the HTTP endpoints that get benchmarked
//! - `benchmark`: orchestration of a live run
//! - `results`: the JSON report and console tables
//! - `cli`, `logging`, `utils`: command line, log setup and helpers
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use diet_api_bench::{collect, summarize, FnOperation, Operation, RequestError};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let operation: Arc<dyn Operation> = Arc::new(FnOperation::new(|| async {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!         Ok::<(), RequestError>(())
//!     }));
//!
//!     let collection = collect(operation, Duration::from_secs(2), 8).await?;
//!     let summary = summarize("sleep", &collection.samples(), collection.wall_seconds)?;
//!
//!     println!("p99: {:.2}ms at {:.1} req/s", summary.p99_ms, summary.requests_per_second);
//!     Ok(())
//! }
//! ```

/// Live benchmark orchestration
///
/// Runs each selected scenario through the collector, records run logs and
/// produces one summary per scenario.
pub mod benchmark;

/// Command-line interface definitions
pub mod cli;

/// Concurrent sample collection
///
/// Batches of parallel invocations until the configured duration has
/// elapsed; per-task results are merged once per batch.
pub mod collector;

pub mod error;

/// Run log analysis and comparison across runs
pub mod analysis;

pub mod logging;

/// Sample aggregation: counts, throughput, latency statistics and
/// nearest-rank percentiles
pub mod metrics;

/// JSON report and console tables
pub mod results;

/// k6-format run logs
pub mod run_log;

/// Benchmarked HTTP endpoints
pub mod scenario;

pub mod utils;

pub use analysis::{compare, ComparisonEntry, RunComparison};
pub use benchmark::{BenchmarkConfig, BenchmarkRunner};
pub use collector::{
    collect, CancellationToken, Collection, FnOperation, Operation, RequestError,
    RequestOutcome, SampleCollector,
};
pub use error::BenchError;
pub use metrics::{summarize, LatencySample, RunSummary};
pub use results::ResultsManager;

/// The current version of the benchmark tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
///
/// These mirror the settings the Diet API load tests have always used: a
/// local API on port 8000, 30 second runs at 10 connections.
pub mod defaults {
    use std::time::Duration;

    pub const BASE_URL: &str = "http://localhost:8000";

    pub const DURATION: Duration = Duration::from_secs(30);

    pub const CONCURRENCY: usize = 10;

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// JSON report of a live run
    pub const OUTPUT_FILE: &str = "benchmark_results.json";

    /// Root of the per-run log directories
    pub const RESULTS_DIR: &str = "benchmarks/results";
}
