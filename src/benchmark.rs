//! # Benchmark Engine Module
//!
//! Orchestrates a live benchmark run: for every selected scenario it drives
//! the [`SampleCollector`] against the API, optionally records the samples as
//! a run log, and summarizes them.
//!
//! ## Run Lifecycle
//!
//! 1. **Configuration**: [`BenchmarkConfig::from_args`] validates the CLI
//!    input and fixes the run identifier.
//! 2. **Collection**: each scenario is collected for the configured duration
//!    at the configured concurrency, one scenario after another.
//! 3. **Recording**: samples are written to
//!    `<results_dir>/<run_id>/<scenario>.json` in the k6 point format.
//! 4. **Summary**: a [`RunSummary`] per scenario is handed to the
//!    [`ResultsManager`].
//!
//! ## Failure Handling
//!
//! Request failures never stop a run; they are part of the summary. Only
//! local problems (an unwritable results directory, for example) fail a
//! scenario, and `continue_on_error` decides whether the remaining scenarios
//! still run. A cancelled run stops before the next scenario.

use crate::{
    cli::RunArgs,
    collector::{CancellationToken, Collection, SampleCollector},
    metrics::{summarize, RunSummary},
    results::{ResultsManager, RunConfiguration},
    run_log::RunLogWriter,
    scenario::{build_client, HttpOperation, Scenario},
    utils::{
        format_duration, format_latency_ms, format_request_rate, generate_run_id,
        validate_concurrency, validate_duration,
    },
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Configuration for a live benchmark run
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Base URL of the API under test, without a trailing slash
    pub base_url: String,

    /// Concrete scenarios to run, in order ("all" already expanded)
    pub scenarios: Vec<Scenario>,

    /// Collection window per scenario
    pub duration: Duration,

    /// Requests in flight per batch
    pub concurrency: usize,

    /// Per-request timeout enforced by the HTTP client
    pub timeout: Duration,

    pub results_dir: PathBuf,

    pub run_id: String,

    /// Write per-request run logs under `results_dir/run_id`
    pub record: bool,

    pub continue_on_error: bool,
}

impl BenchmarkConfig {
    /// Build and validate the configuration from parsed CLI arguments
    pub fn from_args(args: &RunArgs) -> Result<Self> {
        validate_concurrency(args.concurrency)?;
        validate_duration("Duration", args.duration)?;
        validate_duration("Timeout", args.timeout)?;
        reqwest::Url::parse(&args.url)
            .with_context(|| format!("Invalid base URL: {}", args.url))?;

        let mut scenarios = Vec::new();
        for scenario in Scenario::expand_all(args.scenarios.clone()) {
            if !scenarios.contains(&scenario) {
                scenarios.push(scenario);
            }
        }

        Ok(Self {
            base_url: args.url.trim_end_matches('/').to_string(),
            scenarios,
            duration: args.duration,
            concurrency: args.concurrency,
            timeout: args.timeout,
            results_dir: args.results_dir.clone(),
            run_id: args.run_id.clone().unwrap_or_else(generate_run_id),
            record: !args.no_record,
            continue_on_error: args.continue_on_error,
        })
    }

    /// Directory receiving the run logs of this run
    pub fn run_dir(&self) -> PathBuf {
        self.results_dir.join(&self.run_id)
    }

    pub fn run_configuration(&self) -> RunConfiguration {
        RunConfiguration {
            base_url: self.base_url.clone(),
            duration_secs: self.duration.as_secs_f64(),
            concurrency: self.concurrency,
            timeout_secs: self.timeout.as_secs_f64(),
            scenarios: self.scenarios.iter().map(|s| s.slug().to_string()).collect(),
        }
    }
}

impl std::fmt::Display for BenchmarkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "-----------------------------------------------------------------"
        )?;
        writeln!(f, "Benchmark Run:      {}", self.run_id)?;
        writeln!(f, "  Target:           {}", self.base_url)?;
        writeln!(f, "  Duration:         {}", format_duration(self.duration))?;
        writeln!(f, "  Concurrency:      {}", self.concurrency)?;
        writeln!(f, "  Request Timeout:  {}", format_duration(self.timeout))?;
        let names: Vec<&str> = self.scenarios.iter().map(|s| s.slug()).collect();
        writeln!(f, "  Scenarios:        {}", names.join(", "))?;
        if self.record {
            writeln!(f, "  Run Logs:         {}", self.run_dir().display())?;
        } else {
            writeln!(f, "  Run Logs:         disabled")?;
        }
        write!(
            f,
            "-----------------------------------------------------------------"
        )
    }
}

/// Executes the scenarios of a [`BenchmarkConfig`]
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    client: reqwest::Client,
    cancellation: CancellationToken,
}

impl BenchmarkRunner {
    pub fn new(config: BenchmarkConfig) -> Result<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            config,
            client,
            cancellation: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Token that stops the run after the batch in flight
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Run every scenario and hand the summaries to `results`
    pub async fn run(&self, results: &mut ResultsManager) -> Result<()> {
        info!("\n{}", self.config);

        for scenario in &self.config.scenarios {
            if self.cancellation.is_cancelled() {
                warn!("Run cancelled, skipping remaining scenarios");
                break;
            }

            match self.run_scenario(*scenario).await {
                Ok(summary) => results.add_summary(summary),
                Err(e) => {
                    error!("Benchmark failed for {}: {:#}", scenario, e);
                    if !self.config.continue_on_error {
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Collect, record and summarize one scenario
    pub async fn run_scenario(&self, scenario: Scenario) -> Result<RunSummary> {
        info!(
            "Running benchmark: {} ({}, {} connections)",
            scenario,
            format_duration(self.config.duration),
            self.config.concurrency
        );

        let operation = Arc::new(HttpOperation::new(
            self.client.clone(),
            &self.config.base_url,
            scenario,
        ));
        let collector = SampleCollector::new(self.config.duration, self.config.concurrency)?
            .with_cancellation(self.cancellation.clone());
        let collection = collector.collect(operation).await;

        if self.config.record {
            let path = self.record(scenario, &collection)?;
            info!("Run log written to: {:?}", path);
        }

        let wall_seconds = if collection.wall_seconds > 0.0 {
            collection.wall_seconds
        } else {
            self.config.duration.as_secs_f64()
        };
        let summary = summarize(scenario.slug(), &collection.samples(), wall_seconds)?;

        info!(
            "  -> {}, avg: {}, p95: {}",
            format_request_rate(summary.requests_per_second),
            format_latency_ms(summary.avg_latency_ms),
            format_latency_ms(summary.p95_ms)
        );
        if summary.has_no_data() {
            warn!(
                "{}: no successful requests ({} failed)",
                scenario, summary.requests_failed
            );
        }
        Ok(summary)
    }

    fn record(&self, scenario: Scenario, collection: &Collection) -> Result<PathBuf> {
        let run_dir = self.config.run_dir();
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("Failed to create run directory {:?}", run_dir))?;

        let path = run_dir.join(format!("{}.json", scenario.slug()));
        let mut writer = RunLogWriter::create(&path)?;
        writer.write_collection(scenario.slug(), collection)?;
        writer.finish()?;
        Ok(path)
    }
}
