//! Thinking progress settings and stepping.
//!
//! Progress is cosmetic: it climbs while a request is outstanding but never
//! reaches 100 on its own. Completion is signalled by the lifecycle.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for any progress value
pub const PROGRESS_MAX: f64 = 100.0;

/// Progress simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Step interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Ceiling while pending
    #[serde(default = "default_cap")]
    pub cap: f64,

    /// Smallest random increment per step
    #[serde(default = "default_min_step")]
    pub min_step: f64,

    /// Largest random increment per step
    #[serde(default = "default_max_step")]
    pub max_step: f64,
}

fn default_interval_ms() -> u64 {
    200
}

fn default_cap() -> f64 {
    98.0
}

fn default_min_step() -> f64 {
    0.5
}

fn default_max_step() -> f64 {
    6.0
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            cap: default_cap(),
            min_step: default_min_step(),
            max_step: default_max_step(),
        }
    }
}

impl ProgressConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Cap clamped into [0, 100]
    pub fn effective_cap(&self) -> f64 {
        self.cap.clamp(0.0, PROGRESS_MAX)
    }

    /// Increment range, ordered and non-negative
    pub fn step_range(&self) -> (f64, f64) {
        let lo = self.min_step.max(0.0);
        let hi = self.max_step.max(lo);
        (lo, hi)
    }
}

/// Advance progress by `increment`, never exceeding `cap` and never going backwards.
pub fn advance(current: f64, increment: f64, cap: f64) -> f64 {
    let next = current + increment.max(0.0);
    next.min(cap).max(current.min(cap))
}
