// callqueue: how long do callers wait with c agents on the phones?
// Small M/M/c call-center simulator with an agent-count sweep. The drawing side lives elsewhere,
// this just produces the numbers and the plot data.

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use callqueue::metrics::{analyzer, sweep};
use callqueue::prelude::*;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,
}

/// Flags shared by `run` and `sweep`; anything left out comes from the config file or defaults.
#[derive(Args)]
struct TrafficArgs {
    /// JSON file with a SimConfig, flags override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Arrivals per second (lambda)
    #[arg(short = 'l', long)]
    arrival_rate: Option<f64>,
    /// Services per second per agent (mu)
    #[arg(short = 'm', long)]
    service_rate: Option<f64>,
    #[arg(short, long)]
    clients: Option<u32>,
    /// Waits above this many seconds count as "too long"
    #[arg(short, long)]
    threshold: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Use rand_distr's Exp instead of inverting the CDF by hand
    #[arg(long)]
    direct: bool,
    /// Write CSV/JSON/plot data to the output directory
    #[arg(short, long)]
    export: bool,
    #[arg(short, long, default_value = "results")]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[command(flatten)]
        traffic: TrafficArgs,
        #[arg(short = 'n', long)]
        agents: Option<u32>,
        /// Simulated seconds before the run is cut off
        #[arg(short, long)]
        budget: Option<f64>,
        /// Run until every client has been served
        #[arg(long, conflicts_with = "budget")]
        no_budget: bool,
        #[arg(short, long)]
        stepping: Option<String>,
        #[arg(long)]
        tick: Option<f64>,
    },

    Sweep {
        #[command(flatten)]
        traffic: TrafficArgs,
        #[arg(long, default_value_t = 1)]
        min_agents: u32,
        #[arg(long, default_value_t = 9)]
        max_agents: u32,
        #[arg(short, long, default_value_t = 5)]
        repetitions: u32,
        #[arg(short, long, default_value = "tick")]
        stepping: String,
        #[arg(long, default_value_t = 1.0)]
        tick: f64,
    },

    List,

    /// Print the default configuration as JSON
    Config,
}

fn main() -> Result<()> {
    let program_start = Instant::now();

    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            traffic,
            agents,
            budget,
            no_budget,
            stepping,
            tick,
        } => {
            let mut config = base_config(&traffic)?;
            if let Some(n) = agents {
                config.num_agents = n;
            }
            if let Some(b) = budget {
                config.time_budget = Some(b);
            }
            if no_budget {
                config.time_budget = None;
            }
            if let Some(s) = stepping {
                config.stepping = s;
            }
            if let Some(t) = tick {
                config.tick_size = t;
            }
            run_single_simulation(config, &traffic)?;
        }

        Commands::Sweep {
            traffic,
            min_agents,
            max_agents,
            repetitions,
            stepping,
            tick,
        } => {
            let config = base_config(&traffic)?;
            let mut sweep_config = SweepConfig::default()
                .with_agents(min_agents, max_agents)
                .with_trials(repetitions)
                .with_stepping(stepping)
                .with_progress(true);
            sweep_config.tick_size = tick;
            sweep_config.seed = config.seed;
            run_sweep(config, sweep_config, &traffic)?;
        }

        Commands::List => {
            println!("\nAvailable stepping modes");

            for mode in SteppingRegistry::global().list() {
                println!("  - {}", mode);
            }

            println!("\nUsage: cargo run -- run --stepping <name>");
            println!("Example: cargo run -- run --stepping tick --tick 0.5\n");
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&SimConfig::default())?);
        }
    }

    let total_time = program_start.elapsed();
    info!("Total runtime: {:.2}s", total_time.as_secs_f64());

    Ok(())
}

fn base_config(args: &TrafficArgs) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };

    if let Some(l) = args.arrival_rate {
        config.arrival_rate = l;
    }
    if let Some(m) = args.service_rate {
        config.service_rate = m;
    }
    if let Some(c) = args.clients {
        config.num_clients = c;
    }
    if let Some(t) = args.threshold {
        config.wait_threshold = t;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if args.direct {
        config.sampling = SamplingMethod::Direct;
    }
    Ok(config)
}

/// Runs one simulation. A run that served nobody is reported, not treated as a failure.
fn simulate(config: SimConfig) -> Result<(Simulation, Option<RunSummary>)> {
    let mut sim = Simulation::new(config)?;
    match sim.run() {
        Ok(summary) => Ok((sim, Some(summary))),
        Err(SimError::EmptySample) => Ok((sim, None)),
        Err(e) => Err(e.into()),
    }
}

fn print_outcome(sim: &Simulation, summary: Option<&RunSummary>) {
    match summary {
        Some(summary) => print_summary(summary),
        None => println!(
            "\n--- Results ({}) ---\nNobody was served before t = {:.2} s, no wait statistics\n",
            sim.config().name,
            sim.now()
        ),
    }
}

fn run_single_simulation(config: SimConfig, args: &TrafficArgs) -> Result<()> {
    info!("callqueue: Single Run");

    let (sim, summary) = simulate(config)?;
    print_outcome(&sim, summary.as_ref());

    if let (true, Some(summary)) = (args.export, &summary) {
        analyzer::save_run_results(&sim, summary, &args.output)?;
    }
    Ok(())
}

fn run_sweep(config: SimConfig, sweep_config: SweepConfig, args: &TrafficArgs) -> Result<()> {
    info!("callqueue: Agent Sweep");
    info!("Agents: {}..={}", sweep_config.min_agents, sweep_config.max_agents);
    info!("Repetitions: {}", sweep_config.trials);
    info!("");

    // Default run first so there's a reference point next to the curve
    let (sim, summary) = simulate(config.clone())?;
    print_outcome(&sim, summary.as_ref());

    let report = sweep::run(&config, &sweep_config)?;
    sweep_table(&report);

    if args.export {
        if let Some(summary) = &summary {
            analyzer::save_run_results(&sim, summary, &args.output)?;
        }
        analyzer::save_sweep_results(&report, &args.output)?;
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let stats = &summary.stats;
    println!("\n--- Results ({}) ---", summary.name);
    println!("Agents                 : {}", summary.agents);
    println!("Served                 : {}/{}", summary.finished_clients, summary.total_clients);
    println!("Ended at               : {:.2} s", summary.end_time);
    println!("Average wait           : {:.2} s", stats.mean_wait);
    println!("Longest wait           : {:.2} s", stats.max_wait);
    println!("% waited > {:<4} s      : {:.1}%\n", stats.threshold, stats.percent_exceeding);
}

fn sweep_table(report: &SweepReport) {
    println!("\n╔════════════╦══════════════════╦══════════════════╗");
    println!("║ Agents     ║ Mean wait (s)    ║ Over {:<5} s (%) ║", report.wait_threshold);
    println!("╠════════════╬══════════════════╬══════════════════╣");

    for p in &report.points {
        println!("║ {:>10} ║ {:>16.2} ║ {:>16.1} ║", p.agents, p.mean_wait, p.percent_exceeding);
    }

    println!("╚════════════╩══════════════════╩══════════════════╝\n");

    // First agent count where nobody waits longer than the threshold on average
    if let Some(enough) = report.points.iter().find(|p| p.percent_exceeding == 0.0) {
        println!("No waits over {} s from {} agents on", report.wait_threshold, enough.agents);
    }
    println!("λ = {}, μ = {}, {} clients, seed {}\n",
        report.arrival_rate, report.service_rate, report.clients, report.seed);
}
