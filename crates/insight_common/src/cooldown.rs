//! Cooldown gate between accepted reasoning requests.
//!
//! Spacing is measured from issuance, not completion. `allow` is a pure
//! check; the caller records the issuance time separately once it commits.

use std::time::{Duration, Instant};

/// Default minimum spacing between two accepted requests
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct CooldownGate {
    window: Duration,
    last_request_at: Option<Instant>,
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_request_at: None,
        }
    }

    /// True iff no request was ever recorded or the window has fully elapsed.
    pub fn allow(&self, now: Instant) -> bool {
        match self.last_request_at {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.window,
        }
    }

    /// Record an accepted request.
    pub fn record(&mut self, now: Instant) {
        self.last_request_at = Some(now);
    }

    pub fn last_request_at(&self) -> Option<Instant> {
        self.last_request_at
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Time left before the gate opens again, zero when open.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_request_at {
            None => Duration::ZERO,
            Some(last) => self
                .window
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
