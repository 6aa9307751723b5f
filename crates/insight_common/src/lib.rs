//! Shared types for the insight daemon.
//!
//! Telemetry snapshots, the trend classifier, the cooldown gate, insight
//! parsing and the reasoning client boundary.

pub mod cooldown;
pub mod error;
pub mod insight;
pub mod progress;
pub mod prompt;
pub mod reasoning_client;
pub mod status;
pub mod telemetry;
pub mod trend;

pub use cooldown::{CooldownGate, DEFAULT_COOLDOWN};
pub use error::InsightError;
pub use insight::{parse_insight, Insight, PublishedInsight};
pub use progress::ProgressConfig;
pub use reasoning_client::{
    ApiStyle, FakeReasoningClient, HttpReasoningClient, ReasoningClient, ReasoningConfig,
};
pub use status::{ControllerView, ModeFlag, RequestLifecycle};
pub use telemetry::TelemetrySnapshot;
pub use trend::{
    classify, classify_with, ContextPriority, TrendContext, TrendThresholds, TriggerVerdict,
};
