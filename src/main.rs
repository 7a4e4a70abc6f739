//! # Diet API Benchmark - Main Entry Point
//!
//! Two subcommands:
//!
//! - `run`: generate load against a live API, record per-request run logs
//!   and write a JSON report with one summary per scenario
//! - `analyze`: summarize a recorded run, or compare all recorded runs
//!
//! Ctrl-C during `run` stops collection after the batch in flight; the
//! scenarios finished so far are still reported.

use anyhow::{Context, Result};
use clap::Parser;
use diet_api_bench::{
    analysis::{analyze_run, compare_runs, latest_run, run_id_of},
    benchmark::{BenchmarkConfig, BenchmarkRunner},
    cli::{AnalyzeArgs, Args, Command, RunArgs},
    logging::init_logging,
    results::{print_comparison_table, print_summary_table, write_json, ResultsManager},
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Dropping the guard flushes the log file.
    let _log_guard = init_logging(args.verbose, args.log_file.as_deref())?;

    info!("Starting Diet API Benchmark v{}", diet_api_bench::VERSION);

    match args.command {
        Command::Run(run_args) => run(run_args).await,
        Command::Analyze(analyze_args) => analyze(analyze_args),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config = BenchmarkConfig::from_args(&args)?;
    let mut results_manager =
        ResultsManager::new(&args.output_file, &config.run_id, config.run_configuration());
    let runner = BenchmarkRunner::new(config)?;

    let token = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current batch");
            token.cancel();
        }
    });

    let outcome = runner.run(&mut results_manager).await;

    let finished = results_manager.finalize_run(outcome);
    print_summary_table(results_manager.run_id(), results_manager.summaries());

    finished?;
    info!("Benchmark suite completed");
    Ok(())
}

fn analyze(args: AnalyzeArgs) -> Result<()> {
    if args.compare {
        let comparison = compare_runs(&args.results_dir)?;
        print_comparison_table(&comparison);
        if let Some(path) = &args.json {
            write_json(path, &comparison)?;
            info!("Comparison written to: {:?}", path);
        }
    } else {
        let run_dir = match &args.run {
            Some(run_id) => args.results_dir.join(run_id),
            None => latest_run(&args.results_dir)?.with_context(|| {
                format!("No benchmark runs found in {:?}", args.results_dir)
            })?,
        };
        anyhow::ensure!(run_dir.is_dir(), "Run directory not found: {:?}", run_dir);

        let run_id = run_id_of(&run_dir);
        info!("Analyzing run {}", run_id);
        let summaries = analyze_run(&run_dir)?;
        if summaries.is_empty() {
            warn!("No run logs found in {:?}", run_dir);
        }
        print_summary_table(&run_id, &summaries);
        if let Some(path) = &args.json {
            write_json(path, &summaries)?;
            info!("Summaries written to: {:?}", path);
        }
    }

    if !args.no_charts {
        info!("Chart rendering is not built in; use --json and plot the output");
    }
    Ok(())
}
