//! Insight daemon library - exposes modules for testing.

pub mod config;
pub mod controller;
pub mod display;
pub mod hooks;
mod progress_sim;
pub mod render;
pub mod source;
pub mod state;

pub use controller::{ControllerSettings, InsightController};
pub use hooks::{AlertHook, BellAlertHook, HookChain, LogAlertHook, RecordingAlertHook};
pub use progress_sim::sample_step;
pub use state::{Settlement, TickOutcome};
