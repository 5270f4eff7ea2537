use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(u64);

impl ClientId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientStatus {
    Waiting,
    InService,
    Finished,
}

impl Default for ClientStatus {
    fn default() -> Self {
        Self::Waiting
    }
}

/// One caller. Times are simulated seconds since the start of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub arrival_time: f64,
    pub service_time: f64,
    start_service_time: Option<f64>,
    status: ClientStatus,
    #[serde(default)]
    recorded_wait: Option<f64>,
}

impl Client {
    pub fn new(id: ClientId, arrival_time: f64, service_time: f64) -> Self {
        Self {
            id,
            arrival_time,
            service_time,
            start_service_time: None,
            status: ClientStatus::Waiting,
            recorded_wait: None,
        }
    }

    pub fn status(&self) -> ClientStatus {
        self.status
    }

    pub fn start_service_time(&self) -> Option<f64> {
        self.start_service_time
    }

    pub fn end_service_time(&self) -> Option<f64> {
        self.start_service_time.map(|start| start + self.service_time)
    }

    /// Time spent in the line before the first agent picked this client up.
    /// A requeued client keeps this value.
    pub fn wait_time(&self) -> Option<f64> {
        self.recorded_wait
    }

    /// Returns the wait to record, only on the client's first trip to an agent.
    pub(crate) fn begin_service(&mut self, now: f64) -> Option<f64> {
        debug_assert_eq!(self.status, ClientStatus::Waiting, "client {} served twice", self.id);
        self.start_service_time = Some(now);
        self.status = ClientStatus::InService;
        if self.recorded_wait.is_some() {
            return None;
        }
        self.recorded_wait = Some(now - self.arrival_time);
        self.recorded_wait
    }

    pub(crate) fn finish(&mut self) {
        debug_assert_eq!(self.status, ClientStatus::InService);
        self.status = ClientStatus::Finished;
    }

    // Only used when an agent is pulled out from under its client
    pub(crate) fn send_back(&mut self) {
        self.start_service_time = None;
        self.status = ClientStatus::Waiting;
    }
}
