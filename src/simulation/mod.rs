pub mod config;
pub use config::SimConfig;

use crate::agent::{AgentId, AgentPool};
use crate::client::{Client, ClientId, ClientStatus};
use crate::error::{SimError, SimResult};
use crate::generator::{RandomProcessGenerator, SimRng};
use crate::metrics::sweep::{self, SweepConfig, SweepReport};
use crate::metrics::{RunSummary, TracePoint, WaitStats};
use crate::stepping::{Horizon, SteppingRegistry, TimeAdvance};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedClient {
    pub id: ClientId,
    pub arrival_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub busy: bool,
    pub client: Option<ClientId>,
}

/// Read-only view for whoever draws the line and the desks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub now: f64,
    pub queue: Vec<QueuedClient>,
    pub agents: Vec<AgentSnapshot>,
    pub wait_samples: Vec<f64>,
    pub finished: usize,
}

/// M/M/c queue driven one step at a time.
///
/// A step at time `t` admits arrivals up to `t`, hands queued clients to idle
/// agents (lowest index first, queue head first), then frees agents whose
/// client is done by `t`. How `t` moves between steps is up to the
/// [`TimeAdvance`] picked in the config.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    rng: SimRng,
    clock: Box<dyn TimeAdvance>,
    clients: Vec<Client>,
    queue: VecDeque<ClientId>,
    agents: AgentPool,
    wait_samples: Vec<f64>,
    wait_sum: f64,
    trace: Vec<TracePoint>,
    now: f64,
    next_arrival: usize,
    finished: usize,
    steps: u64,
    suspended: bool,
}

impl Simulation {
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let mut rng = SimRng::from_seed(config.seed);
        let clients = generate(&config, &mut rng)?;
        Self::build(config, rng, clients)
    }

    /// Runs a hand-made client list. Ids must be `0..n` in arrival order.
    pub fn with_clients(mut config: SimConfig, clients: Vec<Client>) -> SimResult<Self> {
        config.num_clients = clients.len() as u32;
        config.validate()?;

        for (i, client) in clients.iter().enumerate() {
            if client.id.index() != i {
                return Err(SimError::Config(format!(
                    "client at position {} has id {}",
                    i, client.id
                )));
            }
            if !(client.arrival_time >= 0.0 && client.arrival_time.is_finite())
                || !(client.service_time >= 0.0 && client.service_time.is_finite())
            {
                return Err(SimError::Config(format!(
                    "client {} needs finite, non-negative timings",
                    client.id
                )));
            }
            if client.status() != ClientStatus::Waiting {
                return Err(SimError::Config(format!("client {} was already served", client.id)));
            }
        }
        if clients.windows(2).any(|w| w[1].arrival_time < w[0].arrival_time) {
            return Err(SimError::Config("clients must be sorted by arrival time".into()));
        }

        let rng = SimRng::from_seed(config.seed);
        Self::build(config, rng, clients)
    }

    fn build(config: SimConfig, rng: SimRng, clients: Vec<Client>) -> SimResult<Self> {
        let clock = SteppingRegistry::global()
            .create(&config.stepping, config.tick_size)
            .ok_or_else(|| SimError::Config(format!("unknown stepping mode: {}", config.stepping)))?;

        Ok(Self {
            agents: AgentPool::new(config.num_agents),
            config,
            rng,
            clock,
            clients,
            queue: VecDeque::new(),
            wait_samples: Vec::new(),
            wait_sum: 0.0,
            trace: Vec::new(),
            now: 0.0,
            next_arrival: 0,
            finished: 0,
            steps: 0,
            suspended: false,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn agents(&self) -> &AgentPool {
        &self.agents
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn wait_samples(&self) -> &[f64] {
        &self.wait_samples
    }

    pub fn trace(&self) -> &[TracePoint] {
        &self.trace
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn is_finished(&self) -> bool {
        let everyone_done =
            self.next_arrival == self.clients.len() && self.finished == self.clients.len();
        let out_of_time = self
            .config
            .time_budget
            .is_some_and(|budget| self.now >= budget);
        everyone_done || out_of_time
    }

    /// Wait statistics over the samples recorded so far.
    pub fn stats(&self) -> SimResult<WaitStats> {
        WaitStats::from_samples(&self.wait_samples, self.config.wait_threshold)
    }

    /// One atomic step at the current time. No-op while suspended.
    pub fn step(&mut self) {
        if self.suspended {
            return;
        }

        self.admit_arrivals();
        self.assign_idle_agents();
        self.complete_services();

        if !self.wait_samples.is_empty() {
            self.trace.push(TracePoint {
                time: self.now,
                mean_wait: self.wait_sum / self.wait_samples.len() as f64,
            });
        }
        self.steps += 1;

        #[cfg(debug_assertions)]
        if let Err(e) = self.check_invariants() {
            panic!("{e} (t = {}, step {})", self.now, self.steps);
        }
    }

    fn admit_arrivals(&mut self) {
        while let Some(client) = self.clients.get(self.next_arrival) {
            if client.arrival_time > self.now {
                break;
            }
            self.queue.push_back(client.id);
            self.next_arrival += 1;
        }
    }

    fn assign_idle_agents(&mut self) {
        let now = self.now;
        for agent in self.agents.iter_mut() {
            if agent.is_busy() {
                continue;
            }
            let Some(id) = self.queue.pop_front() else {
                break;
            };
            let client = &mut self.clients[id.index()];
            if let Some(wait) = client.begin_service(now) {
                self.wait_samples.push(wait);
                self.wait_sum += wait;
            }
            agent.take(id);
            debug!("t={:.2} agent {} takes client {} (waited {:.2}s)",
                now, agent.id().0, id, now - client.arrival_time);
        }
    }

    fn complete_services(&mut self) {
        let now = self.now;
        for agent in self.agents.iter_mut() {
            let Some(id) = agent.serving() else {
                continue;
            };
            let client = &mut self.clients[id.index()];
            if client.end_service_time().is_some_and(|end| end <= now) {
                client.finish();
                agent.release();
                self.finished += 1;
                debug!("t={:.2} agent {} done with client {}", now, agent.id().0, id);
            }
        }
    }

    /// Earliest time at which a step would change anything.
    ///
    /// That's `now` when a client is queued next to an idle agent (an agent
    /// freed at the end of the last step), otherwise the next arrival or the
    /// next service end, whichever comes first.
    pub fn next_event_time(&self) -> Option<f64> {
        if !self.queue.is_empty() && self.agents.has_idle() {
            return Some(self.now);
        }
        let arrival = self.clients.get(self.next_arrival).map(|c| c.arrival_time);
        let completion = self
            .agents
            .iter()
            .filter_map(|a| a.serving())
            .filter_map(|id| self.clients[id.index()].end_service_time())
            .min_by(f64::total_cmp);

        match (arrival, completion) {
            (Some(a), Some(c)) => Some(a.min(c)),
            (a, c) => a.or(c),
        }
    }

    /// Moves the clock as the configured stepping mode says, never past the budget.
    pub fn advance(&mut self) {
        let horizon = Horizon {
            now: self.now,
            next_event: self.next_event_time(),
        };
        let mut next = self.clock.next_time(horizon);
        if let Some(budget) = self.config.time_budget {
            next = next.min(budget);
        }
        self.now = next.max(self.now);
    }

    /// Host-driven clock, e.g. wall time elapsed in an animation.
    ///
    /// Every event timestamp up to `target` gets its own step, so the result
    /// is the same as stepping event by event, however coarse the calls are.
    pub fn advance_to(&mut self, target: f64) {
        if self.suspended {
            return;
        }
        let target = match self.config.time_budget {
            Some(budget) => target.min(budget),
            None => target,
        };

        while let Some(t) = self.next_event_time() {
            if t > target || self.is_finished() {
                break;
            }
            self.now = t.max(self.now);
            self.step();
        }
        if target > self.now {
            self.now = target;
            self.step();
        }
    }

    /// Steps until everyone is served or the budget runs out.
    pub fn run(&mut self) -> SimResult<RunSummary> {
        info!("Starting run: {}", self.config.name);
        info!("Agents: {}, Clients: {}, stepping: {}",
            self.agents.len(), self.clients.len(), self.clock.name());

        let summary = self.run_to_end()?;
        info!("Run {} ended at t={:.2}: {}/{} served, mean wait {:.2}s",
            summary.name, summary.end_time, summary.finished_clients,
            summary.total_clients, summary.stats.mean_wait);
        Ok(summary)
    }

    /// Same as [`Simulation::run`] minus the logging, for sweeps.
    pub fn run_to_end(&mut self) -> SimResult<RunSummary> {
        loop {
            self.step();
            if self.is_finished() || self.suspended {
                break;
            }
            if self.next_event_time().is_none() {
                // Can't happen with at least one agent, but don't spin if it does
                warn!("Run {} stalled at t={:.2} with nothing pending", self.config.name, self.now);
                break;
            }
            self.advance();
        }
        self.summary()
    }

    pub fn summary(&self) -> SimResult<RunSummary> {
        Ok(RunSummary {
            name: self.config.name.clone(),
            agents: self.agents.len(),
            end_time: self.now,
            total_clients: self.clients.len(),
            finished_clients: self.finished,
            stats: self.stats()?,
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            now: self.now,
            queue: self
                .queue
                .iter()
                .map(|&id| QueuedClient {
                    id,
                    arrival_time: self.clients[id.index()].arrival_time,
                })
                .collect(),
            agents: self
                .agents
                .iter()
                .map(|a| AgentSnapshot {
                    id: a.id(),
                    busy: a.is_busy(),
                    client: a.serving(),
                })
                .collect(),
            wait_samples: self.wait_samples.clone(),
            finished: self.finished,
        }
    }

    pub fn add_agent(&mut self) -> AgentId {
        let id = self.agents.push();
        info!("Agent added, pool size now {}", self.agents.len());
        id
    }

    /// Drops the highest-index agent. A client it was serving goes back to the
    /// head of the line and keeps the wait sample from its first assignment.
    pub fn remove_agent(&mut self) -> SimResult<Option<ClientId>> {
        if self.agents.len() <= 1 {
            warn!("Refusing to remove the last agent");
            return Err(SimError::Config("at least one agent is required".into()));
        }
        let Some((agent, serving)) = self.agents.pop() else {
            return Err(SimError::Config("agent pool is empty".into()));
        };

        if let Some(id) = serving {
            self.clients[id.index()].send_back();
            self.queue.push_front(id);
            info!("Agent {} removed mid-service, client {} requeued at the head", agent.0, id);
        } else {
            info!("Agent {} removed, pool size now {}", agent.0, self.agents.len());
        }
        Ok(serving)
    }

    /// Fresh clients from the same random stream, back to t = 0. Pool size is kept.
    /// On error the current run is left untouched.
    pub fn restart(&mut self) -> SimResult<()> {
        self.clients = generate(&self.config, &mut self.rng)?;
        self.queue.clear();
        self.agents.release_all();
        self.wait_samples.clear();
        self.wait_sum = 0.0;
        self.trace.clear();
        self.now = 0.0;
        self.next_arrival = 0;
        self.finished = 0;
        self.steps = 0;
        self.suspended = false;
        self.clock.reset();
        info!("Run {} restarted with {} agents", self.config.name, self.agents.len());
        Ok(())
    }

    /// Pauses stepping and runs an agent-count sweep with this run's rates.
    pub fn request_sweep(&mut self, sweep_config: &SweepConfig) -> SimResult<SweepReport> {
        self.suspended = true;
        info!("Stepping suspended for sweep at t={:.2}", self.now);
        sweep::run(&self.config, sweep_config)
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    pub fn check_invariants(&self) -> SimResult<()> {
        let violation = |msg: String| Err(SimError::InvariantViolation(msg));

        let mut in_queue = vec![false; self.clients.len()];
        for &id in &self.queue {
            let Some(client) = self.clients.get(id.index()) else {
                return violation(format!("unknown client {id} in queue"));
            };
            if in_queue[id.index()] {
                return violation(format!("client {id} queued twice"));
            }
            in_queue[id.index()] = true;
            if client.status() != ClientStatus::Waiting {
                return violation(format!("client {id} is queued but {:?}", client.status()));
            }
            if id.index() >= self.next_arrival {
                return violation(format!("client {id} queued before arriving"));
            }
        }

        let mut served = vec![false; self.clients.len()];
        for agent in self.agents.iter() {
            let Some(id) = agent.serving() else { continue };
            if served[id.index()] {
                return violation(format!("client {id} held by two agents"));
            }
            served[id.index()] = true;
            if self.clients[id.index()].status() != ClientStatus::InService {
                return violation(format!("agent {} holds client {id} not in service", agent.id().0));
            }
        }

        let mut finished = 0;
        for client in &self.clients {
            let i = client.id.index();
            match client.status() {
                ClientStatus::InService if !served[i] => {
                    return violation(format!("client {} in service with no agent", client.id));
                }
                ClientStatus::Waiting if i < self.next_arrival && !in_queue[i] => {
                    return violation(format!("client {} admitted but not queued", client.id));
                }
                ClientStatus::Finished => finished += 1,
                _ => {}
            }
            if let Some(start) = client.start_service_time() {
                if start < client.arrival_time {
                    return violation(format!("client {} served before arriving", client.id));
                }
            }
        }
        if finished != self.finished {
            return violation(format!("{} finished clients, counter says {}", finished, self.finished));
        }
        Ok(())
    }
}

/// Rates that pass validation can still be small enough to overflow the
/// gaps, or large enough to round them to zero.
fn generate(config: &SimConfig, rng: &mut SimRng) -> SimResult<Vec<Client>> {
    let clients = RandomProcessGenerator::new(config.arrival_rate, config.service_rate)
        .with_method(config.sampling)
        .generate(config.num_clients as usize, rng.inner());

    if let Some(c) = clients
        .iter()
        .find(|c| !c.arrival_time.is_finite() || !c.service_time.is_finite())
    {
        return Err(SimError::Config(format!(
            "rates λ={} μ={} give non-finite times (client {})",
            config.arrival_rate, config.service_rate, c.id
        )));
    }
    if clients.windows(2).any(|w| w[1].arrival_time <= w[0].arrival_time) {
        return Err(SimError::Config(format!(
            "arrival rate {} is too large for distinct arrival times",
            config.arrival_rate
        )));
    }
    Ok(clients)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clients(times: &[(f64, f64)]) -> Vec<Client> {
        times
            .iter()
            .enumerate()
            .map(|(i, &(a, s))| Client::new(ClientId::new(i as u64), a, s))
            .collect()
    }

    fn config(agents: u32, stepping: &str) -> SimConfig {
        SimConfig::default()
            .with_agents(agents)
            .with_budget(None)
            .with_stepping(stepping)
    }

    #[test]
    fn single_agent_event_mode_waits() {
        // arrivals 0,1,2; each needs 3s => starts 0,3,6
        let cs = clients(&[(0.0, 3.0), (1.0, 3.0), (2.0, 3.0)]);
        let mut sim = Simulation::with_clients(config(1, "event"), cs).unwrap();
        let summary = sim.run().unwrap();
        assert_eq!(sim.wait_samples(), &[0.0, 2.0, 4.0]);
        assert_eq!(summary.stats.mean_wait, 2.0);
        assert_eq!(summary.finished_clients, 3);
        assert_eq!(sim.now(), 9.0);
    }

    #[test]
    fn tick_mode_frees_agent_one_tick_late() {
        // completion happens after assignment inside a step, so the agent
        // freed at t=3 only picks up the next client at t=4
        let cs = clients(&[(0.0, 3.0), (0.5, 1.0)]);
        let mut sim = Simulation::with_clients(config(1, "tick"), cs).unwrap();
        sim.run().unwrap();
        assert_eq!(sim.wait_samples(), &[0.0, 3.5]);
    }

    #[test]
    fn lowest_index_agent_first() {
        let cs = clients(&[(0.0, 10.0)]);
        let mut sim = Simulation::with_clients(config(3, "event"), cs).unwrap();
        sim.step();
        let snap = sim.snapshot();
        assert!(snap.agents[0].busy);
        assert_eq!(snap.agents[0].client, Some(ClientId::new(0)));
        assert!(!snap.agents[1].busy && !snap.agents[2].busy);
    }

    #[test]
    fn snapshot_shows_queue_in_arrival_order() {
        let cs = clients(&[(0.0, 10.0), (0.0, 1.0), (0.0, 1.0)]);
        let mut sim = Simulation::with_clients(config(1, "event"), cs).unwrap();
        sim.step();
        let snap = sim.snapshot();
        let ids: Vec<_> = snap.queue.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![ClientId::new(1), ClientId::new(2)]);
        assert_eq!(sim.next_event_time(), Some(10.0));
    }

    #[test]
    fn budget_stops_the_run() {
        let cs = clients(&[(0.0, 100.0), (1.0, 1.0)]);
        let cfg = config(1, "tick").with_budget(Some(10.0));
        let mut sim = Simulation::with_clients(cfg, cs).unwrap();
        let summary = sim.run().unwrap();
        assert_eq!(summary.end_time, 10.0);
        assert_eq!(summary.finished_clients, 0);
        assert_eq!(summary.stats.count, 1);
    }

    #[test]
    fn stats_before_service_are_empty() {
        let cs = clients(&[(5.0, 1.0)]);
        let sim = Simulation::with_clients(config(1, "event"), cs).unwrap();
        assert_eq!(sim.stats(), Err(SimError::EmptySample));
    }

    #[test]
    fn rejects_unsorted_or_misnumbered_clients() {
        let cs = clients(&[(2.0, 1.0), (1.0, 1.0)]);
        assert!(Simulation::with_clients(config(1, "event"), cs).is_err());

        let mut cs = clients(&[(0.0, 1.0)]);
        cs[0].id = ClientId::new(4);
        assert!(Simulation::with_clients(config(1, "event"), cs).is_err());

        assert!(Simulation::with_clients(config(1, "event"), Vec::new()).is_err());
    }

    #[test]
    fn rejects_infinite_client_timings() {
        let cs = clients(&[(f64::INFINITY, 1.0)]);
        let err = Simulation::with_clients(config(1, "tick"), cs).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));

        let cs = clients(&[(0.0, f64::INFINITY)]);
        assert!(Simulation::with_clients(config(1, "tick"), cs).is_err());
    }

    #[test]
    fn rejects_rates_that_overflow_the_generator() {
        let cfg = SimConfig::default().with_rates(1e-308, 0.05).with_seed(1);
        assert_eq!(cfg.validate(), Ok(()));
        assert!(matches!(Simulation::new(cfg), Err(SimError::Config(_))));

        let cfg = SimConfig::default().with_rates(0.2, 1e-320).with_seed(1);
        assert!(matches!(Simulation::new(cfg), Err(SimError::Config(_))));
    }

    #[test]
    fn remove_busy_agent_requeues_at_head() {
        let cs = clients(&[(0.0, 10.0), (0.0, 10.0), (0.0, 1.0)]);
        let mut sim = Simulation::with_clients(config(2, "event"), cs).unwrap();
        sim.step();
        assert_eq!(sim.queue_len(), 1);

        let requeued = sim.remove_agent().unwrap();
        assert_eq!(requeued, Some(ClientId::new(1)));
        let snap = sim.snapshot();
        assert_eq!(snap.queue[0].id, ClientId::new(1));
        assert_eq!(snap.queue[1].id, ClientId::new(2));
        assert_eq!(sim.clients()[1].status(), ClientStatus::Waiting);
        assert_eq!(sim.check_invariants(), Ok(()));

        sim.run().unwrap();
        assert!(sim.clients().iter().all(|c| c.status() == ClientStatus::Finished));
        // one sample per client, the requeued one keeps its first
        assert_eq!(sim.wait_samples().len(), 3);
        assert_eq!(sim.clients()[1].wait_time(), Some(0.0));
        let mut per_client: Vec<f64> = sim.clients().iter().filter_map(Client::wait_time).collect();
        let mut samples = sim.wait_samples().to_vec();
        per_client.sort_by(f64::total_cmp);
        samples.sort_by(f64::total_cmp);
        assert_eq!(per_client, samples);
    }

    #[test]
    fn cannot_remove_last_agent() {
        let cs = clients(&[(0.0, 1.0)]);
        let mut sim = Simulation::with_clients(config(1, "event"), cs).unwrap();
        assert!(matches!(sim.remove_agent(), Err(SimError::Config(_))));
        assert_eq!(sim.agents().len(), 1);
    }

    #[test]
    fn added_agent_picks_up_queue() {
        let cs = clients(&[(0.0, 10.0), (0.0, 10.0)]);
        let mut sim = Simulation::with_clients(config(1, "event"), cs).unwrap();
        sim.step();
        assert_eq!(sim.queue_len(), 1);
        assert_eq!(sim.add_agent(), AgentId(1));
        sim.step();
        assert_eq!(sim.queue_len(), 0);
        assert_eq!(sim.agents().busy_count(), 2);
    }

    #[test]
    fn restart_resets_state() {
        let cfg = SimConfig::default().with_seed(11).with_agents(2).with_budget(None);
        let mut sim = Simulation::new(cfg).unwrap();
        let first = sim.clients().to_vec();
        sim.run().unwrap();
        sim.add_agent();
        sim.restart().unwrap();
        assert_eq!(sim.now(), 0.0);
        assert!(sim.wait_samples().is_empty());
        assert!(sim.trace().is_empty());
        assert_eq!(sim.agents().len(), 3);
        assert_eq!(sim.agents().busy_count(), 0);
        assert_ne!(sim.clients(), &first[..]);
        assert!(sim.clients().iter().all(|c| c.status() == ClientStatus::Waiting));
    }

    #[test]
    fn suspended_engine_does_not_step() {
        let cs = clients(&[(0.0, 1.0)]);
        let mut sim = Simulation::with_clients(config(1, "event"), cs).unwrap();
        let sweep = SweepConfig::default().with_agents(1, 2).with_trials(1).with_seed(3);
        let report = sim.request_sweep(&sweep).unwrap();
        assert_eq!(report.points.len(), 2);
        assert!(sim.is_suspended());
        sim.step();
        assert_eq!(sim.steps(), 0);
        sim.resume();
        sim.step();
        assert_eq!(sim.steps(), 1);
    }

    #[test]
    fn trace_tracks_running_mean() {
        let cs = clients(&[(0.0, 3.0), (1.0, 3.0), (2.0, 3.0)]);
        let mut sim = Simulation::with_clients(config(1, "event"), cs).unwrap();
        sim.run().unwrap();
        let last = sim.trace().last().unwrap();
        assert_eq!(last.mean_wait, 2.0);
        assert!(sim.trace().windows(2).all(|w| w[0].time <= w[1].time));
    }
}
