pub mod error;
pub mod client;
pub mod agent;
pub mod generator;
pub mod stepping;
pub mod metrics;
pub mod simulation;

pub use agent::{Agent, AgentPool};
pub use client::Client;
pub use error::{SimError, SimResult};
pub use generator::RandomProcessGenerator;
pub use stepping::TimeAdvance;
pub use simulation::{Simulation, SimConfig};

pub mod prelude {
    pub use crate::agent::{AgentId, AgentPool, AgentStatus};
    pub use crate::client::{Client, ClientId, ClientStatus};
    pub use crate::error::{SimError, SimResult};
    pub use crate::generator::{RandomProcessGenerator, SamplingMethod, SimRng};
    pub use crate::metrics::sweep::{SweepConfig, SweepPoint, SweepReport};
    pub use crate::metrics::{RunSummary, TracePoint, WaitStats};
    pub use crate::simulation::{Simulation, SimConfig, Snapshot};
    pub use crate::stepping::{SteppingRegistry, TimeAdvance};
}
