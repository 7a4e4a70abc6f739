use crate::scenario::Scenario;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Diet API Benchmark - load generator and latency analyzer for the Diet API
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    /// Verbose output (debug level logging)
    #[clap(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Also write logs to this file
    #[clap(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate load against the API and summarize latencies
    Run(RunArgs),

    /// Summarize or compare recorded runs
    Analyze(AnalyzeArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Base URL of the API under test
    #[clap(long, env = "BASE_URL", default_value = crate::defaults::BASE_URL)]
    pub url: String,

    /// Scenarios to run (space-separated, or all)
    #[clap(short = 's', long, value_enum, default_values_t = vec![Scenario::All], num_args = 1..)]
    pub scenarios: Vec<Scenario>,

    /// Duration of each scenario (e.g. "30s", "2m", "500ms")
    #[clap(short = 'd', long, value_parser = parse_duration, default_value = "30s")]
    pub duration: Duration,

    /// Number of simultaneously in-flight requests
    #[clap(short = 'c', long, default_value_t = crate::defaults::CONCURRENCY)]
    pub concurrency: usize,

    /// Per-request timeout
    #[clap(long, value_parser = parse_duration, default_value = "30s")]
    pub timeout: Duration,

    /// Output file for the JSON report
    #[clap(short = 'o', long, default_value = crate::defaults::OUTPUT_FILE)]
    pub output_file: PathBuf,

    /// Directory holding one subdirectory of run logs per run
    #[clap(long, default_value = crate::defaults::RESULTS_DIR)]
    pub results_dir: PathBuf,

    /// Identifier of this run (defaults to the local start time, YYYYMMDD_HHMMSS)
    #[clap(long)]
    pub run_id: Option<String>,

    /// Do not write per-request run logs
    #[clap(long, default_value_t = false)]
    pub no_record: bool,

    /// Continue with the remaining scenarios if one fails
    #[clap(long, default_value_t = false)]
    pub continue_on_error: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Directory holding one subdirectory of run logs per run
    #[clap(long, default_value = crate::defaults::RESULTS_DIR)]
    pub results_dir: PathBuf,

    /// Run to analyze (defaults to the latest run)
    #[clap(long, conflicts_with = "compare")]
    pub run: Option<String>,

    /// Compare all runs
    #[clap(long, default_value_t = false)]
    pub compare: bool,

    /// Skip chart generation
    #[clap(long, default_value_t = false)]
    pub no_charts: bool,

    /// Also write the summaries (or comparison) as JSON to this file
    #[clap(long)]
    pub json: Option<PathBuf>,
}

/// Parse duration from string (e.g., "10s", "5m", "1h", "250ms")
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, multiplier_ms) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, 1.0)
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, 1_000.0)
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, 60_000.0)
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, 3_600_000.0)
    } else {
        (s, 1_000.0)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;
    if !num.is_finite() || num < 0.0 {
        return Err(format!("Duration must be a non-negative number: {}", s));
    }

    Duration::try_from_secs_f64(num * multiplier_ms / 1_000.0)
        .map_err(|_| format!("Duration out of range: {}", s))
}
