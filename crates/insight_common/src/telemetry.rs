//! Telemetry snapshot supplied once per refresh tick.
//!
//! The controller only reads four fields. Everything else the producer
//! sends is kept verbatim in `extra` and forwarded to the reasoning backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One tick's worth of system health metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// Overall health in [0, 1]
    pub health: f64,
    /// Decoherence in [0, 1]
    pub decoherence: f64,
    /// Number of active lesions
    #[serde(default)]
    pub lesion_count: u32,
    /// Coherence factor in [0, 1]
    #[serde(default = "default_coherence_factor")]
    pub coherence_factor: f64,
    /// Opaque pass-through metrics
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_coherence_factor() -> f64 {
    1.0
}

impl TelemetrySnapshot {
    pub fn new(health: f64, decoherence: f64, lesion_count: u32, coherence_factor: f64) -> Self {
        Self {
            health,
            decoherence,
            lesion_count,
            coherence_factor,
            extra: BTreeMap::new(),
        }
    }

    /// Attach an opaque metric.
    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Parse one JSON line as produced by the dashboard feed.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }

    /// Serialized form sent to the reasoning backend.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
