use crate::analysis::RunComparison;
use crate::metrics::RunSummary;
use crate::utils::{
    format_latency_ms, format_percent, format_request_rate, generate_report_id, get_cpu_cores,
    table_row, table_separator,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Parameters the run was executed with, recorded for reproducibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub base_url: String,
    pub duration_secs: f64,
    pub concurrency: usize,
    pub timeout_secs: f64,
    pub scenarios: Vec<String>,
}

/// System information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub benchmark_version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: get_cpu_cores(),
            benchmark_version: crate::VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub report_id: String,
    pub version: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub run_id: String,
    pub system_info: SystemInfo,
}

/// The JSON document written at the end of a live run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub metadata: ReportMetadata,
    pub configuration: RunConfiguration,
    pub summaries: Vec<RunSummary>,
}

/// Collects summaries during a run and writes the final report
///
/// ## Usage
///
/// 1. Create it with the output path, the run identifier and the run
///    configuration before the first scenario starts.
/// 2. Hand it each scenario's [`RunSummary`] via [`add_summary`](Self::add_summary).
/// 3. Call [`finalize_run`](Self::finalize_run) once, whether or not the run
///    succeeded.
pub struct ResultsManager {
    output_file: PathBuf,
    run_id: String,
    configuration: RunConfiguration,
    summaries: Vec<RunSummary>,
}

impl ResultsManager {
    pub fn new(output_file: &Path, run_id: &str, configuration: RunConfiguration) -> Self {
        Self {
            output_file: output_file.to_path_buf(),
            run_id: run_id.to_string(),
            configuration,
            summaries: Vec::new(),
        }
    }

    pub fn add_summary(&mut self, summary: RunSummary) {
        info!("Adding results for {}", summary.operation_name);
        self.summaries.push(summary);
    }

    pub fn summaries(&self) -> &[RunSummary] {
        &self.summaries
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn report(&self) -> BenchmarkReport {
        BenchmarkReport {
            metadata: ReportMetadata {
                report_id: generate_report_id(),
                version: crate::VERSION.to_string(),
                generated_at: chrono::Utc::now(),
                run_id: self.run_id.clone(),
                system_info: SystemInfo::default(),
            },
            configuration: self.configuration.clone(),
            summaries: self.summaries.clone(),
        }
    }

    /// Write the report to the output file
    pub fn finalize(&self) -> Result<()> {
        info!("Finalizing benchmark results");
        write_json(&self.output_file, &self.report())?;
        info!("Results written to: {:?}", self.output_file);
        Ok(())
    }

    /// Write the report at the end of a run, then hand back the run's outcome.
    ///
    /// The report is written even when the run failed, so summaries of the
    /// scenarios that did finish are kept.
    ///
    /// ## Returns
    ///
    /// - The run's own error when the run failed. A report write failure in
    ///   that case is only logged.
    /// - The report write error when the run succeeded but the report could
    ///   not be written.
    pub fn finalize_run(&self, outcome: Result<()>) -> Result<()> {
        match (self.finalize(), outcome) {
            (Ok(()), outcome) => outcome,
            (Err(write_error), Ok(())) => Err(write_error),
            (Err(write_error), Err(run_error)) => {
                error!("Failed to write results: {:#}", write_error);
                Err(run_error)
            }
        }
    }
}

/// Pretty-print any serializable value to `path`, creating parent directories.
///
/// Shared by the live report and the `analyze --json` output.
///
/// ## Parameters
/// - `path`: Destination file, truncated if it exists
/// - `value`: Anything `Serialize`, typically a [`BenchmarkReport`], a slice
///   of [`RunSummary`] or a [`RunComparison`]
///
/// ## Errors
/// Directory creation, serialization and write failures, with the path in
/// the error context.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

const SUMMARY_HEADERS: [&str; 8] = [
    "Test", "Requests", "Req/s", "Avg", "P50", "P95", "P99", "Errors",
];

fn summary_cells(summary: &RunSummary) -> Vec<String> {
    vec![
        summary.operation_name.clone(),
        summary.requests_total.to_string(),
        format_request_rate(summary.requests_per_second),
        format_latency_ms(summary.avg_latency_ms),
        format_latency_ms(summary.p50_ms),
        format_latency_ms(summary.p95_ms),
        format_latency_ms(summary.p99_ms),
        format_percent(summary.error_rate),
    ]
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let separator = table_separator(&widths);
    let mut lines = vec![separator.clone(), table_row(headers, &widths), separator.clone()];
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        lines.push(table_row(&cells, &widths));
    }
    lines.push(separator);
    lines.join("\n")
}

/// Table with one row per operation of a single run.
///
/// ## Layout
///
/// ```text
/// +------------+----------+--------+---------+-----+-----+-----+--------+
/// | Test       | Requests | Req/s  | Avg     | P50 | P95 | P99 | Errors |
/// +------------+----------+--------+---------+-----+-----+-----+--------+
/// | categories | 300      | ...                                          |
/// +------------+----------+--------+---------+-----+-----+-----+--------+
/// ```
///
/// Column widths adapt to the widest cell, so every line has the same
/// length.
pub fn render_summary_table(summaries: &[RunSummary]) -> String {
    let rows: Vec<Vec<String>> = summaries.iter().map(summary_cells).collect();
    render_table(&SUMMARY_HEADERS, &rows)
}

/// Table with one row per (run, operation) pair.
pub fn render_comparison_table(comparison: &RunComparison) -> String {
    let mut headers = vec!["Run"];
    headers.extend_from_slice(&SUMMARY_HEADERS);
    let rows: Vec<Vec<String>> = comparison
        .entries()
        .iter()
        .map(|entry| {
            let mut row = vec![entry.run_id.clone()];
            row.extend(summary_cells(&entry.summary));
            row
        })
        .collect();
    render_table(&headers, &rows)
}

pub fn print_summary_table(run_id: &str, summaries: &[RunSummary]) {
    println!();
    println!("Benchmark Results: {}", run_id);
    println!("{}", render_summary_table(summaries));
}

pub fn print_comparison_table(comparison: &RunComparison) {
    println!();
    println!("Comparison of {} runs", comparison.run_ids().len());
    println!("{}", render_comparison_table(comparison));
}
