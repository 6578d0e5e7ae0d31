use std::time::Instant;

/// Monotonic millisecond clock anchored at session start.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds since the clock started, with sub-millisecond precision.
    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}
