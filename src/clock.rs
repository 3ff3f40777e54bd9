// Frame clock for Wirescape

use std::time::{Duration, Instant};

/// Tracks time between ticks and since startup.
pub struct Clock {
    start_time: Instant,
    last_tick: Instant,
    /// Time since last tick
    pub delta: Duration,
    /// Total elapsed time since creation
    pub elapsed: Duration,
    pub frame_count: u64,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            start_time: now,
            last_tick: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    pub fn tick_at(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.last_tick);
        self.elapsed = now.saturating_duration_since(self.start_time);
        self.last_tick = now;
        self.frame_count += 1;
    }

    pub fn dt_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }
}
