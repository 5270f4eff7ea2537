use crate::client::ClientId;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Idle,
    Busy,
}

#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    serving: Option<ClientId>,
}

impl Agent {
    pub fn new(id: AgentId) -> Self {
        Self { id, serving: None }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn status(&self) -> AgentStatus {
        if self.serving.is_some() {
            AgentStatus::Busy
        } else {
            AgentStatus::Idle
        }
    }

    pub fn is_busy(&self) -> bool {
        self.serving.is_some()
    }

    pub fn serving(&self) -> Option<ClientId> {
        self.serving
    }

    pub(crate) fn take(&mut self, client: ClientId) {
        debug_assert!(self.serving.is_none(), "agent {:?} already busy", self.id);
        self.serving = Some(client);
    }

    pub(crate) fn release(&mut self) -> Option<ClientId> {
        self.serving.take()
    }
}

/// Indexable arena of agent slots. Slot `i` always holds `AgentId(i)`.
#[derive(Debug, Clone, Default)]
pub struct AgentPool {
    agents: Vec<Agent>,
}

impl AgentPool {
    pub fn new(size: u32) -> Self {
        Self {
            agents: (0..size).map(|i| Agent::new(AgentId(i))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn busy_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_busy()).count()
    }

    pub fn has_idle(&self) -> bool {
        self.agents.iter().any(|a| !a.is_busy())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.iter_mut()
    }

    pub fn push(&mut self) -> AgentId {
        let id = AgentId(self.agents.len() as u32);
        self.agents.push(Agent::new(id));
        debug!("Agent {} joined the pool", id.0);
        id
    }

    /// Drops the highest-index slot and hands back whoever it was serving.
    pub fn pop(&mut self) -> Option<(AgentId, Option<ClientId>)> {
        self.agents.pop().map(|mut agent| (agent.id, agent.release()))
    }

    pub(crate) fn release_all(&mut self) {
        for agent in &mut self.agents {
            agent.release();
        }
    }
}
