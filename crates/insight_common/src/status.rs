//! Lifecycle and mode signals shared between the controller and renderers.

use crate::insight::PublishedInsight;
use serde::{Deserialize, Serialize};

/// Request lifecycle of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestLifecycle {
    /// No request outstanding; ticks are evaluated
    #[default]
    Idle,
    /// Reasoning call outstanding
    Pending,
    /// Call resolved, cleanup in progress
    Settling,
}

impl RequestLifecycle {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl std::fmt::Display for RequestLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Pending => write!(f, "pending"),
            Self::Settling => write!(f, "settling"),
        }
    }
}

/// Visual mode consumed by the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeFlag {
    #[default]
    Neutral,
    Analyzing,
}

impl std::fmt::Display for ModeFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neutral => write!(f, "neutral"),
            Self::Analyzing => write!(f, "analyzing"),
        }
    }
}

/// Read-only projection of controller state handed to renderers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerView {
    pub lifecycle: RequestLifecycle,
    pub mode: ModeFlag,
    /// Thinking progress in [0, 100]
    pub progress: f64,
    pub insight: Option<PublishedInsight>,
    /// Requests issued since start
    pub requests_issued: u64,
}
