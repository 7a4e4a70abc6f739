//! # Sample Collector
//!
//! Generates load against one [`Operation`] and returns every observed
//! request as a [`LatencySample`], together with the wall-clock window the
//! samples were produced in.
//!
//! ## Batching
//!
//! The collector launches batches of `concurrency` invocations and waits for
//! the whole batch before deciding whether to launch the next one. The loop
//! stops once the requested duration has elapsed, so a run may overshoot the
//! duration by at most one batch completion time. A batch is never cut short.
//!
//! ## Parallelism
//!
//! Every invocation is a separate Tokio task. On the multi-threaded runtime
//! the tasks of a batch run in parallel on the worker threads. Each task
//! returns its own result through its `JoinHandle`; the results are merged
//! into the sample set once per batch, so workers share no mutable state.
//!
//! ## Timing
//!
//! Each task starts its monotonic clock right before calling the operation
//! and stops it right after, which keeps task spawn and join overhead out of
//! the measurement.

use crate::error::{BenchError, Result};
use crate::metrics::LatencySample;
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a single request failed.
///
/// Every variant is a transport-level failure from the collector's point of
/// view: it is recorded as a failed sample and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Result of one timed invocation
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success {
        elapsed_ms: f64,
    },
    Failure {
        elapsed_ms: f64,
        reason: RequestError,
    },
}

impl RequestOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RequestOutcome::Failure { .. })
    }
}

impl From<&RequestOutcome> for LatencySample {
    fn from(outcome: &RequestOutcome) -> Self {
        match outcome {
            RequestOutcome::Success { elapsed_ms } => LatencySample::success(*elapsed_ms),
            RequestOutcome::Failure { elapsed_ms, .. } => LatencySample::failure(*elapsed_ms),
        }
    }
}

/// A unit of work the collector can invoke repeatedly.
///
/// Implementations perform exactly one request per call and enforce their
/// own per-request timeout. The collector does the timing.
#[async_trait]
pub trait Operation: Send + Sync {
    async fn execute(&self) -> std::result::Result<(), RequestError>;
}

/// Adapts an async closure into an [`Operation`].
pub struct FnOperation<F> {
    func: F,
}

impl<F> FnOperation<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> Operation for FnOperation<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<(), RequestError>> + Send + 'static,
{
    async fn execute(&self) -> std::result::Result<(), RequestError> {
        (self.func)().await
    }
}

/// Cooperative stop signal for a running collection.
///
/// Once cancelled, the collector launches no further batches but still waits
/// for the batch that is in flight.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A sample together with the moment it completed, relative to the start of
/// the collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSample {
    pub sample: LatencySample,
    pub completed_after: Duration,
}

/// Everything a collection produced
#[derive(Debug, Clone)]
pub struct Collection {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub timed_samples: Vec<TimedSample>,
    pub failures: u64,
    pub wall_seconds: f64,
    pub batches: usize,
    pub cancelled: bool,
}

impl Collection {
    /// The samples in completion order, without timing metadata.
    pub fn samples(&self) -> Vec<LatencySample> {
        self.timed_samples.iter().map(|t| t.sample).collect()
    }

    pub fn requests_total(&self) -> u64 {
        self.timed_samples.len() as u64
    }
}

/// Duration/concurrency driven load generator
#[derive(Debug, Clone)]
pub struct SampleCollector {
    duration: Duration,
    concurrency: usize,
    cancellation: CancellationToken,
}

impl SampleCollector {
    /// Create a collector.
    ///
    /// Fails with [`BenchError::InvalidInput`] for a zero duration or a zero
    /// concurrency level.
    pub fn new(duration: Duration, concurrency: usize) -> Result<Self> {
        if duration.is_zero() {
            return Err(BenchError::invalid("collection duration must be positive"));
        }
        if concurrency == 0 {
            return Err(BenchError::invalid("concurrency must be at least 1"));
        }
        Ok(Self {
            duration,
            concurrency,
            cancellation: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run batches against `operation` until the duration has elapsed.
    pub async fn collect(&self, operation: Arc<dyn Operation>) -> Collection {
        let started_at = chrono::Utc::now();
        let start = Instant::now();

        let mut timed_samples = Vec::new();
        let mut failures = 0u64;
        let mut batches = 0usize;
        let mut cancelled = false;

        info!(
            "Collecting samples for {:?} with {} concurrent requests",
            self.duration, self.concurrency
        );

        while start.elapsed() < self.duration {
            if self.cancellation.is_cancelled() {
                cancelled = true;
                break;
            }

            let batch = self.run_batch(&operation, start).await;
            failures += batch.iter().filter(|t| t.sample.failed).count() as u64;
            timed_samples.extend(batch);
            batches += 1;
        }

        let wall_seconds = start.elapsed().as_secs_f64();
        debug!(
            "Collection finished: {} samples, {} failures, {} batches in {:.3}s",
            timed_samples.len(),
            failures,
            batches,
            wall_seconds
        );

        Collection {
            started_at,
            timed_samples,
            failures,
            wall_seconds,
            batches,
            cancelled,
        }
    }

    /// Launch one batch and wait for all of it.
    async fn run_batch(&self, operation: &Arc<dyn Operation>, origin: Instant) -> Vec<TimedSample> {
        let mut handles = Vec::with_capacity(self.concurrency);
        for _ in 0..self.concurrency {
            let operation = Arc::clone(operation);
            handles.push(tokio::spawn(async move {
                let begin = Instant::now();
                let result = operation.execute().await;
                let end = Instant::now();
                let elapsed_ms = (end - begin).as_secs_f64() * 1000.0;
                let outcome = match result {
                    Ok(()) => RequestOutcome::Success { elapsed_ms },
                    Err(reason) => RequestOutcome::Failure { elapsed_ms, reason },
                };
                (outcome, end)
            }));
        }

        let mut batch = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((outcome, end)) => {
                    if let RequestOutcome::Failure { reason, .. } = &outcome {
                        debug!("Request failed: {}", reason);
                    }
                    batch.push(TimedSample {
                        sample: LatencySample::from(&outcome),
                        completed_after: end.saturating_duration_since(origin),
                    });
                }
                Err(e) => {
                    // A panicking operation is still one failed request.
                    warn!("Request task aborted: {}", e);
                    batch.push(TimedSample {
                        sample: LatencySample::failure(0.0),
                        completed_after: origin.elapsed(),
                    });
                }
            }
        }
        batch
    }
}

/// Collect samples from `operation` for `duration` at `concurrency`.
///
/// Convenience wrapper around [`SampleCollector`] without cancellation.
pub async fn collect(
    operation: Arc<dyn Operation>,
    duration: Duration,
    concurrency: usize,
) -> Result<Collection> {
    let collector = SampleCollector::new(duration, concurrency)?;
    Ok(collector.collect(operation).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::summarize;
    use std::sync::atomic::AtomicUsize;

    fn sleeping_op(ms: u64) -> Arc<dyn Operation> {
        Arc::new(FnOperation::new(move || async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<(), RequestError>(())
        }))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_collects_whole_batches() {
        let collection = collect(sleeping_op(5), Duration::from_millis(60), 4)
            .await
            .unwrap();

        assert!(collection.batches >= 1);
        assert_eq!(collection.timed_samples.len(), collection.batches * 4);
        assert!(collection.wall_seconds >= 0.06);
        assert_eq!(collection.failures, 0);
        assert!(!collection.cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waits_for_last_batch() {
        let collection = collect(sleeping_op(40), Duration::from_millis(1), 3)
            .await
            .unwrap();

        assert_eq!(collection.batches, 1);
        assert_eq!(collection.timed_samples.len(), 3);
        assert!(collection.wall_seconds >= 0.04);
        for timed in &collection.timed_samples {
            assert!(timed.sample.elapsed_ms >= 40.0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_runs_concurrently() {
        let collection = collect(sleeping_op(100), Duration::from_millis(1), 8)
            .await
            .unwrap();

        assert_eq!(collection.timed_samples.len(), 8);
        assert!(collection.wall_seconds < 0.5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failures_counted_and_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let op: Arc<dyn Operation> = Arc::new(FnOperation::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n % 2 == 1 {
                    Err(RequestError::Status(503))
                } else {
                    Ok(())
                }
            }
        }));

        let collection = collect(op, Duration::from_millis(20), 4).await.unwrap();
        let total = collection.requests_total();
        assert_eq!(total as usize, calls.load(Ordering::SeqCst));
        assert_eq!(collection.failures, total / 2);

        let summary = summarize("flaky", &collection.samples(), collection.wall_seconds).unwrap();
        assert_eq!(summary.requests_total, total);
        assert_eq!(summary.requests_failed, collection.failures);
        assert_eq!(summary.requests_success + summary.requests_failed, total);
    }

    struct PanickingOp;

    #[async_trait]
    impl Operation for PanickingOp {
        async fn execute(&self) -> std::result::Result<(), RequestError> {
            panic!("operation blew up");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_operation_is_a_failure() {
        let op: Arc<dyn Operation> = Arc::new(PanickingOp);

        let collection = collect(op, Duration::from_millis(1), 2).await.unwrap();
        assert_eq!(collection.timed_samples.len(), 2);
        assert_eq!(collection.failures, 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let collector = SampleCollector::new(Duration::from_secs(5), 2)
            .unwrap()
            .with_cancellation(token);

        let collection = collector.collect(sleeping_op(1)).await;
        assert!(collection.cancelled);
        assert_eq!(collection.batches, 0);
        assert!(collection.timed_samples.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_stops_new_batches() {
        let token = CancellationToken::new();
        let collector = SampleCollector::new(Duration::from_secs(30), 2)
            .unwrap()
            .with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let collection = collector.collect(sleeping_op(10)).await;
        canceller.await.unwrap();

        assert!(collection.cancelled);
        assert!(collection.wall_seconds < 5.0);
        assert_eq!(collection.timed_samples.len(), collection.batches * 2);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(
            SampleCollector::new(Duration::ZERO, 1),
            Err(BenchError::InvalidInput(_))
        ));
        assert!(matches!(
            SampleCollector::new(Duration::from_secs(1), 0),
            Err(BenchError::InvalidInput(_))
        ));

        let collector = SampleCollector::new(Duration::from_millis(250), 6).unwrap();
        assert_eq!(collector.duration(), Duration::from_millis(250));
        assert_eq!(collector.concurrency(), 6);
    }

    #[test]
    fn test_outcome_to_sample() {
        let ok = RequestOutcome::Success { elapsed_ms: 4.0 };
        let failed = RequestOutcome::Failure {
            elapsed_ms: 9.0,
            reason: RequestError::Timeout,
        };
        assert_eq!(LatencySample::from(&ok), LatencySample::success(4.0));
        assert_eq!(LatencySample::from(&failed), LatencySample::failure(9.0));
        assert!(failed.is_failure());
    }
}
