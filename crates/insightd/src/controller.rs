//! Insight request orchestrator.
//!
//! Flow per tick:
//! 1. Single-flight: ticks arriving while a request is outstanding are skipped
//! 2. Trend classification against the previous tick's health
//! 3. Cooldown gate, measured from the last issuance
//! 4. Issue the reasoning call on a background task and start the thinking
//!    progress simulation
//!
//! Invariants:
//! - At most one request outstanding per controller
//! - Every issued request returns the controller to Idle with a neutral
//!   mode, whatever the call does (success, failure, timeout, panic)
//! - Results arriving after the controller is gone are discarded

use crate::config::Config;
use crate::hooks::AlertHook;
use crate::progress_sim;
use crate::state::{ControllerState, Settlement, TickOutcome};
use insight_common::{
    parse_insight, ContextPriority, ControllerView, Insight, InsightError, ProgressConfig,
    ReasoningClient, TelemetrySnapshot, TrendContext, TrendThresholds,
};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Tunables the controller needs at runtime
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub cooldown: Duration,
    pub request_timeout: Option<Duration>,
    pub priority: ContextPriority,
    pub thresholds: TrendThresholds,
    pub progress: ProgressConfig,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            cooldown: config.controller.cooldown(),
            request_timeout: config.controller.request_timeout(),
            priority: config.controller.context_priority,
            thresholds: config.thresholds.clone(),
            progress: config.progress.clone(),
        }
    }
}

/// State plus its outbound projection. Background tasks only hold a `Weak` to this.
pub(crate) struct Shared {
    state: Mutex<ControllerState>,
    view_tx: watch::Sender<ControllerView>,
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, state: &ControllerState) {
        self.view_tx.send_replace(state.view());
    }
}

pub struct InsightController {
    shared: Arc<Shared>,
    client: Arc<dyn ReasoningClient>,
    hook: Option<Arc<dyn AlertHook>>,
    settings: ControllerSettings,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl InsightController {
    pub fn new(settings: ControllerSettings, client: Arc<dyn ReasoningClient>) -> Self {
        let state = ControllerState::new(settings.cooldown);
        let (view_tx, _) = watch::channel(state.view());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                view_tx,
            }),
            client,
            hook: None,
            settings,
            in_flight: Mutex::new(None),
        }
    }

    pub fn with_alert_hook(mut self, hook: Arc<dyn AlertHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Feed one telemetry tick. Never blocks; must run inside a tokio runtime.
    pub fn on_tick(&self, snapshot: &TelemetrySnapshot, now: Instant) -> TickOutcome {
        let outcome = {
            let mut state = self.shared.lock();
            let outcome = state.observe(
                snapshot,
                now,
                &self.settings.thresholds,
                self.settings.priority,
            );
            if outcome.is_issued() {
                self.shared.publish(&state);
            }
            outcome
        };

        match outcome {
            TickOutcome::Suppressed => trace!("Request outstanding, tick skipped"),
            TickOutcome::Quiet => trace!(health = snapshot.health, "Quiet tick"),
            TickOutcome::CoolingDown { remaining, .. } => {
                debug!(remaining_ms = remaining.as_millis() as u64, "Trigger held by cooldown")
            }
            TickOutcome::Issued {
                request_id,
                context,
                verdict,
            } => {
                info!(
                    %request_id,
                    %context,
                    critical = verdict.critical,
                    degrading = verdict.degrading,
                    health = snapshot.health,
                    "Issuing insight request"
                );
                self.spawn_request(request_id, snapshot.clone(), context);
                progress_sim::spawn(
                    Arc::downgrade(&self.shared),
                    self.settings.progress.clone(),
                    request_id,
                );
            }
        }

        outcome
    }

    fn spawn_request(&self, request_id: Uuid, snapshot: TelemetrySnapshot, context: TrendContext) {
        let guard = SettleGuard::new(Arc::downgrade(&self.shared), request_id);
        let client = self.client.clone();
        let hook = self.hook.clone();
        let timeout = self.settings.request_timeout;

        let handle = tokio::spawn(async move {
            let call = client.request(&snapshot, context);
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .unwrap_or(Err(InsightError::Timeout(limit))),
                None => call.await,
            };
            let parsed = result.and_then(|body| parse_insight(&body));
            guard.settle(parsed, hook.as_deref());
        });

        *self.lock_in_flight() = Some(handle);
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for the outstanding request (if any) to settle.
    pub async fn settled(&self) {
        let handle = self.lock_in_flight().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Insight request task ended abnormally: {}", e);
            }
        }
    }

    /// Like [`settled`](Self::settled), but gives up when `interrupt` fires first.
    /// Returns true when the request settled.
    pub async fn settled_or<F>(&self, interrupt: F) -> bool
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.settled() => true,
            _ = interrupt => false,
        }
    }

    /// Abort the outstanding request, if any. The controller returns to Idle
    /// with the published insight untouched. Returns whether a request was cancelled.
    pub async fn cancel(&self) -> bool {
        let handle = self.lock_in_flight().take();
        let Some(handle) = handle else {
            return false;
        };
        handle.abort();
        match handle.await {
            Err(e) if e.is_cancelled() => {
                info!("Outstanding insight request cancelled");
                true
            }
            Err(e) => {
                warn!("Insight request task ended abnormally: {}", e);
                true
            }
            // Finished before the abort landed
            Ok(()) => false,
        }
    }

    /// Tear the controller down. An outstanding call keeps running and its
    /// result is discarded; the returned handle lets callers wait for it.
    pub fn shutdown(self) -> Option<JoinHandle<()>> {
        let handle = self.lock_in_flight().take();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            info!("Shutting down with a request outstanding; its result will be discarded");
        }
        handle
    }

    pub fn view(&self) -> ControllerView {
        self.shared.lock().view()
    }

    /// Subscribe to state projections for rendering.
    pub fn subscribe(&self) -> watch::Receiver<ControllerView> {
        self.shared.view_tx.subscribe()
    }

    pub fn last_request_at(&self) -> Option<Instant> {
        self.shared.lock().last_request_at()
    }
}

/// Runs the Settling -> Idle cleanup exactly once for one request, even
/// when the task is aborted or panics before reaching `settle`.
struct SettleGuard {
    shared: Weak<Shared>,
    request_id: Uuid,
    done: bool,
}

impl SettleGuard {
    fn new(shared: Weak<Shared>, request_id: Uuid) -> Self {
        Self {
            shared,
            request_id,
            done: false,
        }
    }

    fn settle(mut self, result: Result<Insight, InsightError>, hook: Option<&dyn AlertHook>) {
        self.done = true;
        let request_id = self.request_id;

        let Some(shared) = self.shared.upgrade() else {
            debug!(%request_id, "Controller gone, discarding result");
            return;
        };

        let settlement = {
            let mut state = shared.lock();
            if !state.begin_settling(request_id) {
                debug!(%request_id, "Request no longer outstanding, discarding result");
                return;
            }
            shared.publish(&state);
            let settlement = state.finish_settling(result);
            shared.publish(&state);
            settlement
        };

        match settlement {
            Settlement::Applied(insight) => {
                info!(
                    %request_id,
                    alert = insight.alert.as_deref().unwrap_or("-"),
                    "Insight published"
                );
                if let Some(hook) = hook {
                    hook.insight_available(&insight);
                }
            }
            Settlement::Discarded(e) => {
                warn!(
                    %request_id,
                    kind = e.kind(),
                    error = %e,
                    "Insight request failed, keeping previous insight"
                );
            }
        }
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            let mut state = shared.lock();
            if state.abandon(self.request_id) {
                warn!(request_id = %self.request_id, "Insight request task ended without settling");
                shared.publish(&state);
            }
        }
    }
}
