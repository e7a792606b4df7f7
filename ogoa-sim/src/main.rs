//! Entry point for `ogoa-sim`.
//!
//! Parses CLI arguments into a [`SimConfig`] and runs one simulated session.
//! All protocol work lives in the library; this file owns only process
//! setup (logging, argument parsing) and the final report.

use clap::Parser;

use ogoa_sim::{run, FaultModel, SimConfig};

/// Simulated OGOA link session: sweep source, display panel, faulty wire.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Simulated run time in milliseconds.
    #[arg(long, default_value_t = 8_000)]
    duration_ms: u32,

    /// Milliseconds between full sweeps (0 disables sweep traffic).
    #[arg(long, default_value_t = 200)]
    sweep_interval_ms: u32,

    /// Milliseconds between status requests.
    #[arg(long, default_value_t = 1_000)]
    status_interval_ms: u32,

    /// Milliseconds for one corridor loop of the range model.
    #[arg(long, default_value_t = 20_000)]
    scenario_ms: u32,

    /// Seed for the wire faults and the range model.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Per-byte probability of a flipped bit in transit.
    #[arg(long, default_value_t = 0.0)]
    corrupt_rate: f64,

    /// Per-byte probability of silent loss in transit.
    #[arg(long, default_value_t = 0.0)]
    drop_rate: f64,
}

fn main() {
    // Set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let report = run(SimConfig {
        duration_ms: cli.duration_ms,
        sweep_interval_ms: cli.sweep_interval_ms,
        status_interval_ms: cli.status_interval_ms,
        scenario_ms: cli.scenario_ms,
        seed: cli.seed,
        faults: FaultModel {
            corrupt_rate: cli.corrupt_rate,
            drop_rate: cli.drop_rate,
        },
    });

    println!("frames sent:       {}", report.frames_sent);
    println!("sweeps delivered:  {}", report.sweeps_delivered);
    println!("status responses:  {}", report.status_responses);
    println!("link errors:       {}", report.link_errors);
    println!("bytes corrupted:   {}", report.bytes_corrupted);
    println!("bytes dropped:     {}", report.bytes_dropped);
    println!("unsent backlog:    {}", report.backlog);
}
