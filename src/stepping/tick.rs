use super::{Horizon, TimeAdvance};

/// Fixed-size ticks, the batch sweep's clock. Events between ticks are only
/// noticed at the next tick, so waits come out quantised to the tick size.
#[derive(Debug, Clone)]
pub struct Tick {
    size: f64,
    ticks: u64,
}

impl Tick {
    pub fn new(size: f64) -> Self {
        Self { size, ticks: 0 }
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl TimeAdvance for Tick {
    fn next_time(&mut self, horizon: Horizon) -> f64 {
        self.ticks += 1;
        // Multiply instead of accumulating so 0.1-sized ticks don't drift
        let mut next = self.ticks as f64 * self.size;
        if next <= horizon.now {
            // Clock was moved by the host (advance_to), pick the grid up from there
            self.ticks = (horizon.now / self.size).floor() as u64 + 1;
            next = self.ticks as f64 * self.size;
        }
        next
    }

    fn name(&self) -> &str {
        "tick"
    }

    fn reset(&mut self) {
        self.ticks = 0;
    }

    fn clone_box(&self) -> Box<dyn TimeAdvance> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_pending_events() {
        let mut tick = Tick::new(1.0);
        let h = Horizon { now: 0.0, next_event: Some(0.3) };
        assert_eq!(tick.next_time(h), 1.0);
        let h = Horizon { now: 1.0, next_event: Some(7.0) };
        assert_eq!(tick.next_time(h), 2.0);
    }

    #[test]
    fn small_ticks_stay_on_grid() {
        let mut tick = Tick::new(0.1);
        let mut now = 0.0;
        for _ in 0..30 {
            now = tick.next_time(Horizon { now, next_event: None });
        }
        assert!((now - 3.0).abs() < 1e-12);
    }

    #[test]
    fn resyncs_after_host_jump() {
        let mut tick = Tick::new(1.0);
        assert_eq!(tick.next_time(Horizon { now: 7.5, next_event: None }), 8.0);
        assert_eq!(tick.next_time(Horizon { now: 8.0, next_event: None }), 9.0);
    }

    #[test]
    fn reset_restarts_grid() {
        let mut tick = Tick::new(2.0);
        tick.next_time(Horizon { now: 0.0, next_event: None });
        tick.reset();
        assert_eq!(tick.ticks(), 0);
        assert_eq!(tick.next_time(Horizon { now: 0.0, next_event: None }), 2.0);
    }
}
