use std::time::{Duration, Instant};

/// Frame timer.
///
/// `timestep()` is the wall time of the last frame in seconds and drives the
/// camera. A single step never exceeds `MAX_TICKS_PER_FRAME` ticks.
#[derive(Debug, Clone)]
pub struct TickTimer {
    prev: Instant,
    elapsed: f64,
}

impl TickTimer {
    pub const MAX_TICKS_PER_FRAME: u32 = 144;
    pub const TICK_TIME: f64 = 1.0 / 144.0;
    pub const MAX_TIMESTEP: f64 = Self::TICK_TIME * Self::MAX_TICKS_PER_FRAME as f64;

    pub fn new() -> Self {
        Self {
            prev: Instant::now(),
            elapsed: 0.0,
        }
    }

    /// Samples the clock and advances by the time since the previous update.
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = now - self.prev;
        self.prev = now;
        self.advance(elapsed);
    }

    /// Advances by an explicit duration.
    pub fn advance(&mut self, elapsed: Duration) {
        self.elapsed = elapsed.as_secs_f64().min(Self::MAX_TIMESTEP);
    }

    /// Seconds elapsed during the last update.
    pub fn timestep(&self) -> f32 {
        self.elapsed as f32
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_stall_is_capped() {
        let mut timer = TickTimer::new();
        timer.advance(Duration::from_secs(5));
        assert!((timer.timestep() - TickTimer::MAX_TIMESTEP as f32).abs() < 1e-6);
    }

    #[test]
    fn short_frames_pass_through() {
        let mut timer = TickTimer::new();
        timer.advance(Duration::from_millis(16));
        assert!((timer.timestep() - 0.016).abs() < 1e-6);
        timer.advance(Duration::ZERO);
        assert_eq!(timer.timestep(), 0.0);
    }
}
