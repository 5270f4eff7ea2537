use crate::error::{SimError, SimResult};
use crate::generator::SamplingMethod;
use crate::stepping::SteppingRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub name: String,
    /// Clients per second (λ).
    pub arrival_rate: f64,
    /// Services per second per agent (μ).
    pub service_rate: f64,
    pub num_clients: u32,
    pub num_agents: u32,
    /// Simulated seconds after which the run stops. `None` runs until everyone is served.
    pub time_budget: Option<f64>,
    /// Waits strictly above this count towards the "% exceeded" figure.
    pub wait_threshold: f64,
    pub stepping: String,
    pub tick_size: f64,
    pub sampling: SamplingMethod,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "default_run".to_string(),
            arrival_rate: 1.0 / 5.0, // one client every 5s
            service_rate: 1.0 / 20.0, // 20s per call on average
            num_clients: 10,
            num_agents: 3,
            time_budget: Some(60.0),
            wait_threshold: 5.0,
            stepping: "event".to_string(),
            tick_size: 1.0,
            sampling: SamplingMethod::Inversion,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_rates(mut self, arrival_rate: f64, service_rate: f64) -> Self {
        self.arrival_rate = arrival_rate;
        self.service_rate = service_rate;
        self
    }

    pub fn with_clients(mut self, n: u32) -> Self {
        self.num_clients = n;
        self
    }

    pub fn with_agents(mut self, n: u32) -> Self {
        self.num_agents = n;
        self
    }

    pub fn with_budget(mut self, budget: Option<f64>) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn with_stepping(mut self, stepping: impl Into<String>) -> Self {
        self.stepping = stepping.into();
        self
    }

    pub fn with_tick_size(mut self, size: f64) -> Self {
        self.tick_size = size;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.wait_threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingMethod) -> Self {
        self.sampling = sampling;
        self
    }

    /// Everything that can go wrong with a run goes wrong here, before step one.
    pub fn validate(&self) -> SimResult<()> {
        // `!(x > 0.0)` so NaN is rejected too
        if !(self.arrival_rate > 0.0) || !self.arrival_rate.is_finite() {
            return Err(SimError::Config(format!(
                "arrival rate must be positive, got {}",
                self.arrival_rate
            )));
        }
        if !(self.service_rate > 0.0) || !self.service_rate.is_finite() {
            return Err(SimError::Config(format!(
                "service rate must be positive, got {}",
                self.service_rate
            )));
        }
        if self.num_clients == 0 {
            return Err(SimError::Config("at least one client is required".into()));
        }
        if self.num_agents == 0 {
            return Err(SimError::Config("at least one agent is required".into()));
        }
        if let Some(budget) = self.time_budget {
            if !(budget > 0.0) {
                return Err(SimError::Config(format!(
                    "time budget must be positive, got {budget}"
                )));
            }
        }
        if !(self.wait_threshold >= 0.0) {
            return Err(SimError::Config(format!(
                "wait threshold must be non-negative, got {}",
                self.wait_threshold
            )));
        }
        if !(self.tick_size > 0.0) || !self.tick_size.is_finite() {
            return Err(SimError::Config(format!(
                "tick size must be positive, got {}",
                self.tick_size
            )));
        }
        if !SteppingRegistry::global().contains(&self.stepping) {
            return Err(SimError::Config(format!(
                "unknown stepping mode: {}",
                self.stepping
            )));
        }
        Ok(())
    }
}
