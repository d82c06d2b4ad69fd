//! Outbound cadence cap, decoupled from the capture cadence. The caller
//! owns the clock and passes `Instant`s in, which keeps the render loop in
//! charge of time and the limiter trivially testable.

use std::time::{Duration, Instant};

/// Send cap the original tuning settled on.
pub const DEFAULT_TARGET_FPS: u32 = 15;

/// Enforces a minimum interval of `1s / target_fps` between sends.
///
/// Only an actual send ([`RateLimiter::mark_sent`]) advances the window; a
/// tick suppressed for other reasons does not push the next opportunity
/// back.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl RateLimiter {
    pub fn new(target_fps: u32) -> Self {
        RateLimiter {
            interval: Duration::from_secs(1) / target_fps.max(1),
            last_sent: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a send at `now` would respect the cadence. Always true
    /// before the first send.
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_sent {
            None => true,
            Some(at) => now.duration_since(at) >= self.interval,
        }
    }

    pub fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }

    /// Forgets the last send, re-arming to "always ready". Used when the
    /// pipeline restarts after a stop.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter::new(DEFAULT_TARGET_FPS)
    }
}
