//! Agent-count sweep: rerun the same traffic with 1, 2, ... agents and see
//! where the wait curve flattens out.
//!
//! Trial `k` draws its clients from the same derived seed whatever the agent
//! count (common random numbers), so the curve reflects capacity and not
//! which clients happened to show up.

use crate::error::{SimError, SimResult};
use crate::generator::SimRng;
use crate::metrics::WaitStats;
use crate::simulation::{SimConfig, Simulation};
use crate::stepping::SteppingRegistry;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub min_agents: u32,
    pub max_agents: u32,
    pub trials: u32,
    pub stepping: String,
    pub tick_size: f64,
    /// Falls back to the base run's seed, then to a random one.
    pub seed: Option<u64>,
    pub show_progress: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_agents: 1,
            max_agents: 9,
            trials: 5,
            stepping: "tick".to_string(),
            tick_size: 1.0,
            seed: None,
            show_progress: false,
        }
    }
}

impl SweepConfig {
    pub fn with_agents(mut self, min: u32, max: u32) -> Self {
        self.min_agents = min;
        self.max_agents = max;
        self
    }

    pub fn with_trials(mut self, trials: u32) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_stepping(mut self, stepping: impl Into<String>) -> Self {
        self.stepping = stepping.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.min_agents == 0 {
            return Err(SimError::Config("sweep must start at one agent or more".into()));
        }
        if self.max_agents < self.min_agents {
            return Err(SimError::Config(format!(
                "empty agent range {}..={}",
                self.min_agents, self.max_agents
            )));
        }
        if self.trials == 0 {
            return Err(SimError::Config("at least one trial per agent count".into()));
        }
        if !(self.tick_size > 0.0) || !self.tick_size.is_finite() {
            return Err(SimError::Config(format!("tick size must be positive, got {}", self.tick_size)));
        }
        if !SteppingRegistry::global().contains(&self.stepping) {
            return Err(SimError::Config(format!("unknown stepping mode: {}", self.stepping)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub agents: u32,
    /// Average of the per-trial mean waits.
    pub mean_wait: f64,
    pub percent_exceeding: f64,
    pub trials: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub arrival_rate: f64,
    pub service_rate: f64,
    pub clients: u32,
    pub wait_threshold: f64,
    pub seed: u64,
    pub points: Vec<SweepPoint>,
}

impl SweepReport {
    /// `(agents, mean wait)` pairs, ready to plot.
    pub fn pairs(&self) -> Vec<(u32, f64)> {
        self.points.iter().map(|p| (p.agents, p.mean_wait)).collect()
    }
}

/// Runs every trial to completion (no time budget) for each agent count in
/// the range. Trials are independent, so they go through rayon.
pub fn run(base: &SimConfig, sweep: &SweepConfig) -> SimResult<SweepReport> {
    base.validate()?;
    sweep.validate()?;

    let seed = sweep.seed.or(base.seed).unwrap_or_else(rand::random);
    let agent_counts = sweep.max_agents - sweep.min_agents + 1;

    info!("Sweep: agents {}..={}, {} trials each, {} clients per trial",
        sweep.min_agents, sweep.max_agents, sweep.trials, base.num_clients);

    let pb = if sweep.show_progress {
        let pb = ProgressBar::new(agent_counts as u64 * sweep.trials as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.orange/yellow} {pos}/{len} trials {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut points = Vec::with_capacity(agent_counts as usize);
    for agents in sweep.min_agents..=sweep.max_agents {
        pb.set_message(format!("{agents} agents"));

        let trials = (0..sweep.trials)
            .into_par_iter()
            .map(|trial| {
                let stats = run_trial(base, sweep, agents, SimRng::derive_seed(seed, trial as u64));
                pb.inc(1);
                stats
            })
            .collect::<SimResult<Vec<WaitStats>>>()?;

        let n = trials.len() as f64;
        let point = SweepPoint {
            agents,
            mean_wait: trials.iter().map(|s| s.mean_wait).sum::<f64>() / n,
            percent_exceeding: trials.iter().map(|s| s.percent_exceeding).sum::<f64>() / n,
            trials: sweep.trials,
        };
        info!("  {} agents: mean wait {:.2}s, {:.1}% over {}s",
            agents, point.mean_wait, point.percent_exceeding, base.wait_threshold);
        points.push(point);
    }

    pb.finish_with_message("Sweep complete");

    Ok(SweepReport {
        arrival_rate: base.arrival_rate,
        service_rate: base.service_rate,
        clients: base.num_clients,
        wait_threshold: base.wait_threshold,
        seed,
        points,
    })
}

fn run_trial(base: &SimConfig, sweep: &SweepConfig, agents: u32, seed: u64) -> SimResult<WaitStats> {
    let config = base
        .clone()
        .with_agents(agents)
        .with_budget(None)
        .with_stepping(sweep.stepping.clone())
        .with_tick_size(sweep.tick_size)
        .with_seed(seed);

    let mut sim = Simulation::new(config)?;
    let stats = sim.run_to_end()?.stats;
    debug!("trial seed {:#x} with {} agents: mean wait {:.2}s", seed, agents, stats.mean_wait);
    Ok(stats)
}
