// Property tweening for Wirescape

use std::time::Duration;

/// Quadratic ease-out over normalized progress: fast start, gentle stop.
pub fn power1_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Interpolates one scalar from `from` to `to` over `duration` with
/// [`power1_out`] easing.
#[derive(Debug, Clone)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: Duration,
    elapsed: Duration,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    /// Tween by `delta` relative to `current`.
    pub fn by(current: f32, delta: f32, duration: Duration) -> Self {
        Self::new(current, current + delta, duration)
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Current value. Exactly `to` once finished.
    pub fn value(&self) -> f32 {
        if self.is_finished() {
            return self.to;
        }
        let t = self.elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.from + (self.to - self.from) * power1_out(t)
    }

    /// Moves the tween forward and returns the new value.
    pub fn advance(&mut self, dt: Duration) -> f32 {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.value()
    }
}
