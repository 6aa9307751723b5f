//! Trend classification for the insight trigger.
//!
//! Maps the current snapshot plus the previous tick's health to two flags:
//! `critical` (absolute thresholds breached) and `degrading` (health is
//! sliding, or decoherence is up while coherence is down).

use crate::telemetry::TelemetrySnapshot;
use serde::{Deserialize, Serialize};

/// Classifier thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendThresholds {
    /// critical when health is below this
    #[serde(default = "default_critical_health")]
    pub critical_health: f64,

    /// critical when lesion count is above this
    #[serde(default = "default_max_lesions")]
    pub max_lesions: u32,

    /// critical when decoherence is above this
    #[serde(default = "default_critical_decoherence")]
    pub critical_decoherence: f64,

    /// degrading when the tick-over-tick health delta is below this
    #[serde(default = "default_degrading_delta")]
    pub degrading_delta: f64,

    /// degrading when decoherence is above this...
    #[serde(default = "default_degrading_decoherence")]
    pub degrading_decoherence: f64,

    /// ...and coherence factor is below this
    #[serde(default = "default_degrading_coherence")]
    pub degrading_coherence: f64,
}

fn default_critical_health() -> f64 {
    0.6
}

fn default_max_lesions() -> u32 {
    1
}

fn default_critical_decoherence() -> f64 {
    0.55
}

fn default_degrading_delta() -> f64 {
    -0.005
}

fn default_degrading_decoherence() -> f64 {
    0.3
}

fn default_degrading_coherence() -> f64 {
    0.8
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            critical_health: default_critical_health(),
            max_lesions: default_max_lesions(),
            critical_decoherence: default_critical_decoherence(),
            degrading_delta: default_degrading_delta(),
            degrading_decoherence: default_degrading_decoherence(),
            degrading_coherence: default_degrading_coherence(),
        }
    }
}

/// Result of classifying one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerVerdict {
    pub critical: bool,
    pub degrading: bool,
}

impl TriggerVerdict {
    /// Whether this tick warrants a reasoning request
    pub fn is_trigger(&self) -> bool {
        self.critical || self.degrading
    }
}

/// Classify a snapshot against the previous tick's health using default thresholds.
pub fn classify(curr: &TelemetrySnapshot, prev_health: f64) -> TriggerVerdict {
    classify_with(curr, prev_health, &TrendThresholds::default())
}

/// Classify a snapshot with explicit thresholds.
pub fn classify_with(
    curr: &TelemetrySnapshot,
    prev_health: f64,
    thresholds: &TrendThresholds,
) -> TriggerVerdict {
    let critical = curr.health < thresholds.critical_health
        || curr.lesion_count > thresholds.max_lesions
        || curr.decoherence > thresholds.critical_decoherence;

    let health_delta = curr.health - prev_health;
    let degrading = health_delta < thresholds.degrading_delta
        || (curr.decoherence > thresholds.degrading_decoherence
            && curr.coherence_factor < thresholds.degrading_coherence);

    TriggerVerdict {
        critical,
        degrading,
    }
}

/// Framing handed to the reasoning backend alongside the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendContext {
    Degrading,
    Critical,
}

impl TrendContext {
    /// Human-readable framing sent with the request
    pub fn message(&self) -> &'static str {
        match self {
            Self::Degrading => {
                "Trend: DEGRADING. Health is sliding tick over tick or coherence is eroding \
                 under rising decoherence. Anticipate the failure before it lands."
            }
            Self::Critical => {
                "Trend: CRITICAL. Absolute thresholds are breached (low health, multiple \
                 lesions or runaway decoherence). Immediate stabilization is required."
            }
        }
    }
}

impl std::fmt::Display for TrendContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Degrading => write!(f, "degrading"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Which framing wins when a tick is both critical and degrading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPriority {
    #[default]
    DegradingFirst,
    CriticalFirst,
}

impl ContextPriority {
    /// Pick the framing for a verdict. `None` when the verdict is not a trigger.
    pub fn context_for(&self, verdict: TriggerVerdict) -> Option<TrendContext> {
        match (verdict.critical, verdict.degrading, *self) {
            (false, false, _) => None,
            (true, true, ContextPriority::CriticalFirst) => Some(TrendContext::Critical),
            (_, true, _) => Some(TrendContext::Degrading),
            (true, false, _) => Some(TrendContext::Critical),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_a_quiet_tick() {
        let snap = TelemetrySnapshot::new(0.9, 0.1, 0, 0.95);
        let verdict = classify(&snap, 0.9);
        assert_eq!(verdict, TriggerVerdict::default());
        assert!(!verdict.is_trigger());
    }

    #[test]
    fn test_scenario_b_low_health_is_critical() {
        let snap = TelemetrySnapshot::new(0.5, 0.2, 0, 0.95);
        let verdict = classify(&snap, 0.9);
        assert!(verdict.critical);
        // 0.5 - 0.9 is also a slide
        assert!(verdict.degrading);
    }

    #[test]
    fn test_scenario_c_degrading_not_critical() {
        let snap = TelemetrySnapshot::new(0.85, 0.35, 0, 0.7);
        let verdict = classify(&snap, 0.90);
        assert!(verdict.degrading);
        assert!(!verdict.critical);
        assert_eq!(
            ContextPriority::default().context_for(verdict),
            Some(TrendContext::Degrading)
        );
    }

    #[test]
    fn test_critical_thresholds_are_strict() {
        // Exactly on the boundary does not trip
        assert!(!classify(&TelemetrySnapshot::new(0.6, 0.55, 1, 1.0), 0.6).critical);
        assert!(classify(&TelemetrySnapshot::new(0.9, 0.1, 2, 1.0), 0.9).critical);
        assert!(classify(&TelemetrySnapshot::new(0.9, 0.56, 0, 1.0), 0.9).critical);
    }

    #[test]
    fn test_small_health_dip_is_not_degrading() {
        let snap = TelemetrySnapshot::new(0.896, 0.1, 0, 1.0);
        assert!(!classify(&snap, 0.9).degrading);
        let snap = TelemetrySnapshot::new(0.89, 0.1, 0, 1.0);
        assert!(classify(&snap, 0.9).degrading);
    }

    #[test]
    fn test_decoherence_needs_low_coherence() {
        assert!(!classify(&TelemetrySnapshot::new(0.9, 0.4, 0, 0.8), 0.9).degrading);
        assert!(classify(&TelemetrySnapshot::new(0.9, 0.4, 0, 0.79), 0.9).degrading);
    }

    #[test]
    fn test_quiet_region_never_triggers() {
        // Sweep the healthy region on a coarse grid
        for h in [0.6, 0.7, 0.85, 1.0] {
            for d in [0.0, 0.2, 0.3, 0.55] {
                for lesions in [0, 1] {
                    for cf in [0.8, 0.9, 1.0] {
                        let snap = TelemetrySnapshot::new(h, d, lesions, cf);
                        for prev in [h, h + 0.004, h - 0.2] {
                            let verdict = classify(&snap, prev);
                            assert!(!verdict.is_trigger(), "{:?} prev={}", snap, prev);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_context_priority_when_both_flags_set() {
        let both = TriggerVerdict {
            critical: true,
            degrading: true,
        };
        assert_eq!(
            ContextPriority::DegradingFirst.context_for(both),
            Some(TrendContext::Degrading)
        );
        assert_eq!(
            ContextPriority::CriticalFirst.context_for(both),
            Some(TrendContext::Critical)
        );
        let critical_only = TriggerVerdict {
            critical: true,
            degrading: false,
        };
        assert_eq!(
            ContextPriority::DegradingFirst.context_for(critical_only),
            Some(TrendContext::Critical)
        );
        assert_eq!(ContextPriority::CriticalFirst.context_for(TriggerVerdict::default()), None);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = TrendThresholds {
            critical_health: 0.8,
            ..TrendThresholds::default()
        };
        let snap = TelemetrySnapshot::new(0.75, 0.1, 0, 1.0);
        assert!(classify_with(&snap, 0.75, &thresholds).critical);
        assert!(!classify(&snap, 0.75).critical);
    }
}
