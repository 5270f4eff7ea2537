pub mod tick;
pub mod next_event;

use std::collections::HashMap;
use std::fmt;

/// What the engine knows when it asks for the next instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horizon {
    pub now: f64,
    /// Earliest timestamp at which a step would change something, if any.
    pub next_event: Option<f64>,
}

pub trait TimeAdvance: Send + Sync + fmt::Debug {
    /// Next simulated instant to step at. Must not be earlier than `horizon.now`.
    fn next_time(&mut self, horizon: Horizon) -> f64;
    fn name(&self) -> &str;
    fn reset(&mut self);
    fn clone_box(&self) -> Box<dyn TimeAdvance>;
}

impl Clone for Box<dyn TimeAdvance> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

type Factory = Box<dyn Fn(f64) -> Box<dyn TimeAdvance> + Send + Sync>;

pub struct SteppingRegistry {
    modes: HashMap<String, Factory>,
}

impl SteppingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            modes: HashMap::new(),
        };
        registry.register_builtin();
        registry
    }

    fn register_builtin(&mut self) {
        self.register("tick", |size| Box::new(tick::Tick::new(size)));
        self.register("discrete", |size| Box::new(tick::Tick::new(size)));
        self.register("event", |_| Box::new(next_event::NextEvent::new()));
        self.register("next-event", |_| Box::new(next_event::NextEvent::new()));
        self.register("continuous", |_| Box::new(next_event::NextEvent::new()));
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(f64) -> Box<dyn TimeAdvance> + Send + Sync + 'static,
    {
        self.modes.insert(name.to_lowercase(), Box::new(factory));
    }

    /// `tick_size` is ignored by modes that don't step on a fixed grid.
    pub fn create(&self, name: &str, tick_size: f64) -> Option<Box<dyn TimeAdvance>> {
        self.modes
            .get(&name.to_lowercase())
            .map(|factory| factory(tick_size))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modes.contains_key(&name.to_lowercase())
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn global() -> &'static SteppingRegistry {
        use std::sync::OnceLock;
        static REGISTRY: OnceLock<SteppingRegistry> = OnceLock::new();
        REGISTRY.get_or_init(SteppingRegistry::new)
    }
}

impl Default for SteppingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
