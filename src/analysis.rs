//! # Run Analysis
//!
//! Offline side of the tool. A results directory holds one subdirectory per
//! run, named by its run identifier, and each run directory holds one run log
//! per operation:
//!
//! ```text
//! benchmarks/results/
//!   20260101_093000/
//!     categories.json
//!     foods-paginated.json
//!   20260102_164318/
//!     categories.json
//! ```
//!
//! [`analyze_run`] turns a run directory into one [`RunSummary`] per log, and
//! [`compare`] flattens the summaries of several runs into a
//! [`RunComparison`] ordered by run identifier.

use crate::error::{BenchError, Result};
use crate::metrics::RunSummary;
use crate::run_log::summarize_run_log;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One summary tagged with the run it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub run_id: String,
    pub summary: RunSummary,
}

/// Summaries of several runs in deterministic order: ascending run
/// identifier, then the operation order supplied for that run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunComparison {
    entries: Vec<ComparisonEntry>,
}

impl RunComparison {
    pub fn entries(&self) -> &[ComparisonEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct run identifiers in comparison order.
    pub fn run_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if ids.last() != Some(&entry.run_id.as_str()) {
                ids.push(&entry.run_id);
            }
        }
        ids
    }

    /// Entries for one operation across all runs, oldest run first.
    pub fn operation_history<'a>(
        &'a self,
        operation_name: &'a str,
    ) -> impl Iterator<Item = &'a ComparisonEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.summary.operation_name == operation_name)
    }
}

/// Flatten per-run summaries into a [`RunComparison`].
///
/// Runs are ordered by identifier. The sort is stable, so runs supplied
/// twice under the same identifier keep their supplied order.
pub fn compare<I, S>(runs: I) -> RunComparison
where
    I: IntoIterator<Item = (S, Vec<RunSummary>)>,
    S: Into<String>,
{
    let mut runs: Vec<(String, Vec<RunSummary>)> =
        runs.into_iter().map(|(id, s)| (id.into(), s)).collect();
    runs.sort_by(|a, b| a.0.cmp(&b.0));

    let entries = runs
        .into_iter()
        .flat_map(|(run_id, summaries)| {
            summaries.into_iter().map(move |summary| ComparisonEntry {
                run_id: run_id.clone(),
                summary,
            })
        })
        .collect();

    RunComparison { entries }
}

/// Run directories under `results_dir`, oldest first.
pub fn list_runs(results_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut runs = Vec::new();
    for entry in std::fs::read_dir(results_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            runs.push(entry.path());
        }
    }
    runs.sort();
    Ok(runs)
}

/// Most recent run directory, if any.
pub fn latest_run(results_dir: &Path) -> Result<Option<PathBuf>> {
    Ok(list_runs(results_dir)?.pop())
}

/// Identifier of a run directory (its final path component).
pub fn run_id_of(run_dir: &Path) -> String {
    run_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One summary per `*.json` run log in `run_dir`, ordered by file name.
pub fn analyze_run(run_dir: &Path) -> Result<Vec<RunSummary>> {
    let mut logs = Vec::new();
    for entry in std::fs::read_dir(run_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
            logs.push(path);
        }
    }
    logs.sort();

    let mut summaries = Vec::with_capacity(logs.len());
    for path in logs {
        let operation_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("Analyzing {:?}", path);
        summaries.push(summarize_run_log(&operation_name, &path)?);
    }
    Ok(summaries)
}

/// Analyze every run under `results_dir` and compare them.
///
/// Fails with [`BenchError::InvalidInput`] when fewer than two runs exist.
pub fn compare_runs(results_dir: &Path) -> Result<RunComparison> {
    let run_dirs = list_runs(results_dir)?;
    if run_dirs.len() < 2 {
        return Err(BenchError::invalid(format!(
            "need at least 2 runs to compare, found {}",
            run_dirs.len()
        )));
    }

    let mut runs = Vec::with_capacity(run_dirs.len());
    for run_dir in &run_dirs {
        let summaries = analyze_run(run_dir)?;
        info!(
            "Run {}: {} operations",
            run_id_of(run_dir),
            summaries.len()
        );
        runs.push((run_id_of(run_dir), summaries));
    }
    Ok(compare(runs))
}
