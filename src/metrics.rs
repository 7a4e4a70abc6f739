//! # Latency Statistics
//!
//! Turns a closed set of [`LatencySample`]s into a [`RunSummary`]: request
//! counts, throughput, mean/min/max latency, nearest-rank percentiles and the
//! error rate.
//!
//! ## Latency Policy
//!
//! Only successful samples contribute latency. A failed request counts toward
//! `requests_failed` and `requests_total`, but its elapsed time is never part
//! of the mean, the extremes or any percentile. The live collector and the
//! run log reader both feed this function, so the policy holds for both.
//!
//! ## Percentiles
//!
//! Percentiles use the nearest-rank method on the ascending sort: the value
//! at index `floor(n * p)`, clamped to `n - 1` for every percentile. No
//! interpolation is performed.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};

/// Percentile levels reported in every summary.
pub const P50: f64 = 0.50;
pub const P90: f64 = 0.90;
pub const P95: f64 = 0.95;
pub const P99: f64 = 0.99;

/// One observed timing of a single request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    pub elapsed_ms: f64,
    pub failed: bool,
}

impl LatencySample {
    pub fn success(elapsed_ms: f64) -> Self {
        Self {
            elapsed_ms,
            failed: false,
        }
    }

    pub fn failure(elapsed_ms: f64) -> Self {
        Self {
            elapsed_ms,
            failed: true,
        }
    }
}

/// Aggregate statistics for one operation under one benchmark execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub operation_name: String,
    pub requests_total: u64,
    pub requests_success: u64,
    pub requests_failed: u64,
    pub requests_per_second: f64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    /// Fraction of failed requests. Defined as 1.0 when nothing was recorded
    /// so that an unreachable operation never reads as a clean run.
    pub error_rate: f64,
    /// Collection window the throughput was derived from.
    pub wall_seconds: f64,
}

impl RunSummary {
    /// Summary for an operation that produced no requests at all.
    pub fn empty(operation_name: &str, wall_seconds: f64) -> Self {
        Self {
            operation_name: operation_name.to_string(),
            requests_total: 0,
            requests_success: 0,
            requests_failed: 0,
            requests_per_second: 0.0,
            avg_latency_ms: 0.0,
            min_latency_ms: 0.0,
            max_latency_ms: 0.0,
            p50_ms: 0.0,
            p90_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            error_rate: 1.0,
            wall_seconds,
        }
    }

    /// True when the summary carries no usable latency data.
    pub fn has_no_data(&self) -> bool {
        self.requests_success == 0
    }
}

/// Compute the summary of a closed sample set.
///
/// ## Errors
///
/// Returns [`BenchError::InvalidInput`] when `wall_seconds` is not a positive,
/// finite number. An empty sample set is not an error: it yields
/// [`RunSummary::empty`].
///
/// ## Determinism
///
/// The result depends only on the multiset of samples. Latencies are sorted
/// before any arithmetic, so the floating point sum is taken in the same
/// order regardless of the order in which concurrent workers completed.
pub fn summarize(
    operation_name: &str,
    samples: &[LatencySample],
    wall_seconds: f64,
) -> Result<RunSummary> {
    if !wall_seconds.is_finite() || wall_seconds <= 0.0 {
        return Err(BenchError::invalid(format!(
            "wall_seconds must be positive, got {}",
            wall_seconds
        )));
    }

    if samples.is_empty() {
        return Ok(RunSummary::empty(operation_name, wall_seconds));
    }

    let mut latencies: Vec<f64> = samples
        .iter()
        .filter(|s| !s.failed)
        .map(|s| s.elapsed_ms)
        .collect();
    latencies.sort_by(f64::total_cmp);

    let requests_total = samples.len() as u64;
    let requests_success = latencies.len() as u64;
    let requests_failed = requests_total - requests_success;

    // Throughput counts completed work, so a run without a single success
    // reports none.
    let requests_per_second = if requests_success == 0 {
        0.0
    } else {
        requests_total as f64 / wall_seconds
    };

    let (avg, min, max) = match (latencies.first(), latencies.last()) {
        (Some(&min), Some(&max)) => {
            let sum: f64 = latencies.iter().sum();
            (sum / latencies.len() as f64, min, max)
        }
        _ => (0.0, 0.0, 0.0),
    };

    Ok(RunSummary {
        operation_name: operation_name.to_string(),
        requests_total,
        requests_success,
        requests_failed,
        requests_per_second,
        avg_latency_ms: avg,
        min_latency_ms: min,
        max_latency_ms: max,
        p50_ms: nearest_rank(&latencies, P50),
        p90_ms: nearest_rank(&latencies, P90),
        p95_ms: nearest_rank(&latencies, P95),
        p99_ms: nearest_rank(&latencies, P99),
        error_rate: requests_failed as f64 / requests_total as f64,
        wall_seconds,
    })
}

/// Nearest-rank percentile of an ascending slice.
///
/// Returns 0.0 for an empty slice. `p` is a fraction in `(0, 1]`.
pub fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = (sorted.len() as f64 * p).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}
