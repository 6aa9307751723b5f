//! Controller state.
//!
//! One owned record holds everything the orchestrator mutates. Each method
//! is one transition and runs inside a single critical section.

use insight_common::{
    classify_with, CooldownGate, ContextPriority, ControllerView, Insight, InsightError,
    ModeFlag, PublishedInsight, RequestLifecycle, TelemetrySnapshot, TrendContext,
    TrendThresholds, TriggerVerdict,
};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// What happened to one telemetry tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A request is outstanding; the tick was not evaluated
    Suppressed,
    /// Nothing critical or degrading
    Quiet,
    /// Trigger condition met but the cooldown window is still open
    CoolingDown {
        verdict: TriggerVerdict,
        remaining: Duration,
    },
    /// A reasoning request was issued
    Issued {
        request_id: Uuid,
        context: TrendContext,
        verdict: TriggerVerdict,
    },
}

impl TickOutcome {
    pub fn is_issued(&self) -> bool {
        matches!(self, Self::Issued { .. })
    }
}

/// Result of settling a request
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Insight replaced the published one
    Applied(Insight),
    /// Failure; the published insight was kept
    Discarded(InsightError),
}

#[derive(Debug)]
pub struct ControllerState {
    lifecycle: RequestLifecycle,
    mode: ModeFlag,
    cooldown: CooldownGate,
    progress: f64,
    insight: Option<PublishedInsight>,
    prev_health: Option<f64>,
    in_flight: Option<Uuid>,
    requests_issued: u64,
}

impl ControllerState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            lifecycle: RequestLifecycle::Idle,
            mode: ModeFlag::Neutral,
            cooldown: CooldownGate::new(cooldown),
            progress: 0.0,
            insight: None,
            prev_health: None,
            in_flight: None,
            requests_issued: 0,
        }
    }

    /// Evaluate one tick. Accepting a trigger moves the state to Pending.
    ///
    /// `prev_health` is replaced on every tick, including suppressed ones.
    pub fn observe(
        &mut self,
        snapshot: &TelemetrySnapshot,
        now: Instant,
        thresholds: &TrendThresholds,
        priority: ContextPriority,
    ) -> TickOutcome {
        let prev_health = self.prev_health.replace(snapshot.health).unwrap_or(snapshot.health);

        if !self.lifecycle.is_idle() {
            return TickOutcome::Suppressed;
        }

        let verdict = classify_with(snapshot, prev_health, thresholds);
        let Some(context) = priority.context_for(verdict) else {
            return TickOutcome::Quiet;
        };

        if !self.cooldown.allow(now) {
            return TickOutcome::CoolingDown {
                verdict,
                remaining: self.cooldown.remaining(now),
            };
        }

        let request_id = self.begin_request(now);
        TickOutcome::Issued {
            request_id,
            context,
            verdict,
        }
    }

    fn begin_request(&mut self, now: Instant) -> Uuid {
        let request_id = Uuid::new_v4();
        self.cooldown.record(now);
        self.lifecycle = RequestLifecycle::Pending;
        self.mode = ModeFlag::Analyzing;
        self.progress = 0.0;
        self.in_flight = Some(request_id);
        self.requests_issued += 1;
        request_id
    }

    /// Pending -> Settling. False when `request_id` is not the outstanding request.
    pub fn begin_settling(&mut self, request_id: Uuid) -> bool {
        if self.in_flight != Some(request_id) || self.lifecycle != RequestLifecycle::Pending {
            return false;
        }
        self.lifecycle = RequestLifecycle::Settling;
        self.progress = 0.0;
        true
    }

    /// Apply the outcome and return to Idle. Always restores the neutral mode.
    pub fn finish_settling(&mut self, result: Result<Insight, InsightError>) -> Settlement {
        let settlement = match result {
            Ok(insight) => {
                self.insight = Some(PublishedInsight::now(insight.clone()));
                Settlement::Applied(insight)
            }
            Err(e) => Settlement::Discarded(e),
        };
        self.return_to_idle();
        settlement
    }

    /// Cleanup for a request whose task ended without settling. No-op if it already settled.
    pub fn abandon(&mut self, request_id: Uuid) -> bool {
        if self.in_flight != Some(request_id) {
            return false;
        }
        self.return_to_idle();
        true
    }

    fn return_to_idle(&mut self) {
        self.mode = ModeFlag::Neutral;
        self.lifecycle = RequestLifecycle::Idle;
        self.progress = 0.0;
        self.in_flight = None;
    }

    /// Step the thinking progress for `request_id`. False once that request left Pending.
    pub fn advance_progress(&mut self, request_id: Uuid, increment: f64, cap: f64) -> bool {
        if self.in_flight != Some(request_id) || self.lifecycle != RequestLifecycle::Pending {
            return false;
        }
        self.progress = insight_common::progress::advance(self.progress, increment, cap);
        true
    }

    pub fn lifecycle(&self) -> RequestLifecycle {
        self.lifecycle
    }

    pub fn mode(&self) -> ModeFlag {
        self.mode
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn insight(&self) -> Option<&PublishedInsight> {
        self.insight.as_ref()
    }

    pub fn last_request_at(&self) -> Option<Instant> {
        self.cooldown.last_request_at()
    }

    pub fn prev_health(&self) -> Option<f64> {
        self.prev_health
    }

    pub fn view(&self) -> ControllerView {
        ControllerView {
            lifecycle: self.lifecycle,
            mode: self.mode,
            progress: self.progress,
            insight: self.insight.clone(),
            requests_issued: self.requests_issued,
        }
    }
}
