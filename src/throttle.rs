use std::time::{Duration, Instant};

/// Leading-edge rate limiter with a single remembered trailing call.
///
/// Callers pass the current instant so the limiter stays deterministic.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_run: Option<Instant>,
    trailing: bool,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
            trailing: false,
        }
    }

    /// Returns `true` when the guarded work should run now.
    pub fn try_run(&mut self, now: Instant) -> bool {
        if self.ready(now) {
            self.last_run = Some(now);
            self.trailing = false;
            true
        } else {
            self.trailing = true;
            false
        }
    }

    /// Returns `true` once the window has elapsed and a call was dropped in it.
    pub fn flush(&mut self, now: Instant) -> bool {
        if self.trailing && self.ready(now) {
            self.last_run = Some(now);
            self.trailing = false;
            return true;
        }
        false
    }

    pub fn has_pending(&self) -> bool {
        self.trailing
    }

    fn ready(&self, now: Instant) -> bool {
        match self.last_run {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }
}
