//! lr-soak: seeded simulation soak runs against `RingBuffer`.
//!
//! # Usage
//!
//! ```bash
//! lr-soak --capacity 4 --iterations 5000 --runs 20
//! lr-soak --seed 12345            # reproduce a reported failure
//! ```
//!
//! Outputs a JSON summary to stdout; logs go to stderr. Exits with status 1
//! if any run found a violation.

use std::process;

use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lr_dst::{generate_ops, run_ring_scenario, DeterministicRng, RunnerConfig};
use lr_ring::{RingBuffer, RingConfig};

/// Upper bound on runs in one invocation.
const RUNS_MAX: u64 = 10_000;

/// Soak-test the lap-safe ring buffer and print a JSON report.
#[derive(Parser, Debug)]
#[command(name = "lr-soak")]
#[command(about = "Deterministic soak runs for the lap-safe ring buffer")]
struct Cli {
    /// Ring capacity. Small capacities lap readers more often.
    #[arg(long, default_value_t = 4)]
    capacity: usize,

    /// Operations per run.
    #[arg(long, default_value_t = lr_dst::ITERATIONS_DEFAULT)]
    iterations: u64,

    /// Seed of the first run; run `i` uses `seed + i` (random if not set).
    #[arg(long)]
    seed: Option<u64>,

    /// Number of runs.
    #[arg(long, default_value_t = 1)]
    runs: u64,

    /// Use aggressive fault injection.
    #[arg(long)]
    stress: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let capacity = match RingConfig::with_capacity(cli.capacity).validate() {
        Ok(capacity) => capacity,
        Err(e) => {
            println!("{}", json!({ "passed": false, "error": e.to_string() }));
            process::exit(1);
        }
    };

    let runs = cli.runs.clamp(1, RUNS_MAX);
    let base_seed = cli.seed.unwrap_or_else(rand::random::<u64>);
    let config = if cli.stress {
        RunnerConfig::stress()
    } else {
        RunnerConfig::default()
    };
    info!(capacity = capacity.get(), runs, base_seed, "starting soak");

    let mut stats = Vec::with_capacity(runs as usize);
    let mut failures = Vec::new();
    for run in 0..runs {
        let seed = base_seed.wrapping_add(run);
        let ring = RingBuffer::<u64>::new(capacity);
        let mut rng = DeterministicRng::new(seed);
        let ops = generate_ops(&mut rng, cli.iterations as usize, capacity.get());

        let result = run_ring_scenario(&ring, seed, &ops, config.clone());
        if !result.passed {
            warn!(seed, anomalies = result.anomalies.len(), "soak run failed");
            failures.push(json!({
                "seed": seed,
                "anomalies": result.anomalies.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "report": result.format(),
            }));
        }
        stats.push(result.stats);
    }

    let passed = failures.is_empty();
    let report = json!({
        "passed": passed,
        "capacity": capacity.get(),
        "iterations": cli.iterations,
        "base_seed": base_seed,
        "runs": stats,
        "failures": failures,
    });
    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Failed to render report: {e}");
            process::exit(2);
        }
    }

    if !passed {
        process::exit(1);
    }
}
