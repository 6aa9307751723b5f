//! Alert hooks fired when a new insight is published.
//!
//! Hooks are fire-and-forget: they run once per successfully parsed insight,
//! after the controller has released its state, and must not block.

use insight_common::Insight;
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::info;

pub trait AlertHook: Send + Sync {
    fn insight_available(&self, insight: &Insight);
}

/// Logs each insight at info level
pub struct LogAlertHook;

impl AlertHook for LogAlertHook {
    fn insight_available(&self, insight: &Insight) {
        info!(
            alert = insight.alert.as_deref().unwrap_or("-"),
            recommendation = insight.recommendation.as_deref().unwrap_or("-"),
            "New insight"
        );
    }
}

/// Rings the terminal bell
pub struct BellAlertHook;

impl AlertHook for BellAlertHook {
    fn insight_available(&self, _insight: &Insight) {
        let mut stderr = io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

/// Fans one notification out to several hooks
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<Box<dyn AlertHook>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: impl AlertHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl AlertHook for HookChain {
    fn insight_available(&self, insight: &Insight) {
        for hook in &self.hooks {
            hook.insight_available(insight);
        }
    }
}

/// Records every notification; used by tests and embedders that poll
#[derive(Default)]
pub struct RecordingAlertHook {
    seen: Mutex<Vec<Insight>>,
}

impl RecordingAlertHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn last(&self) -> Option<Insight> {
        self.seen.lock().ok().and_then(|s| s.last().cloned())
    }
}

impl AlertHook for RecordingAlertHook {
    fn insight_available(&self, insight: &Insight) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(insight.clone());
        }
    }
}
