use web_time::Instant;

/// Source of frame deltas.
pub trait Clock {
    /// Seconds elapsed since the previous call. The first call measures from creation.
    fn delta(&mut self) -> f32;
}

/// Monotonic wall clock.
#[derive(Debug, Clone)]
pub struct SystemClock {
    last: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            last: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        delta
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    pending: f32,
    total: f64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `seconds` for the next [`Clock::delta`] call.
    pub fn advance(&mut self, seconds: f32) {
        self.pending += seconds;
        self.total += f64::from(seconds);
    }

    /// Total time ever advanced.
    pub fn total(&self) -> f64 {
        self.total
    }
}

impl Clock for ManualClock {
    fn delta(&mut self) -> f32 {
        std::mem::take(&mut self.pending)
    }
}
