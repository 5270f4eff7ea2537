use super::{Horizon, TimeAdvance};

/// Jumps straight to the next timestamp where something can happen.
///
/// Stepping only at those instants gives the same transitions as a clock
/// running continuously, without the frames in between.
#[derive(Debug, Clone, Default)]
pub struct NextEvent;

impl NextEvent {
    pub fn new() -> Self {
        Self
    }
}

impl TimeAdvance for NextEvent {
    fn next_time(&mut self, horizon: Horizon) -> f64 {
        match horizon.next_event {
            Some(t) => t.max(horizon.now),
            // Nothing pending; only reachable once the run is over
            None => horizon.now,
        }
    }

    fn name(&self) -> &str {
        "next-event"
    }

    fn reset(&mut self) {}

    fn clone_box(&self) -> Box<dyn TimeAdvance> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jumps_to_event() {
        let mut mode = NextEvent::new();
        assert_eq!(mode.next_time(Horizon { now: 1.0, next_event: Some(4.25) }), 4.25);
        assert_eq!(mode.next_time(Horizon { now: 1.0, next_event: Some(1.0) }), 1.0);
    }

    #[test]
    fn never_goes_backwards() {
        let mut mode = NextEvent::new();
        assert_eq!(mode.next_time(Horizon { now: 5.0, next_event: Some(2.0) }), 5.0);
        assert_eq!(mode.next_time(Horizon { now: 5.0, next_event: None }), 5.0);
    }
}
