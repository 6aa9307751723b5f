//! Controller Behaviour Tests
//!
//! Drive `InsightController` with a `FakeReasoningClient` and a recording
//! alert hook. No network calls; a gated fake keeps a request outstanding
//! for as long as a test needs.

use async_trait::async_trait;
use insight_common::{
    ContextPriority, FakeReasoningClient, Insight, InsightError, ModeFlag, ProgressConfig,
    ReasoningClient, RequestLifecycle, TelemetrySnapshot, TrendContext,
};
use insightd::{ControllerSettings, InsightController, RecordingAlertHook, TickOutcome};
use std::sync::Arc;
use std::time::{Duration, Instant};

const FLUX_SPIKE: &str = r#"{"alert":"Flux spike","recommendation":"Stabilize"}"#;

// ============================================================================
// Helpers
// ============================================================================

fn settings() -> ControllerSettings {
    ControllerSettings {
        cooldown: Duration::from_secs(20),
        ..ControllerSettings::default()
    }
}

fn build(
    settings: ControllerSettings,
    client: Arc<FakeReasoningClient>,
) -> (InsightController, Arc<RecordingAlertHook>) {
    let hook = Arc::new(RecordingAlertHook::new());
    let controller = InsightController::new(settings, client).with_alert_hook(hook.clone());
    (controller, hook)
}

fn quiet() -> TelemetrySnapshot {
    TelemetrySnapshot::new(0.9, 0.1, 0, 0.95)
}

/// Critical through lesions only, so the health delta stays flat
fn lesions() -> TelemetrySnapshot {
    TelemetrySnapshot::new(0.9, 0.1, 2, 0.95)
}

fn current_insight(controller: &InsightController) -> Option<Insight> {
    controller.view().insight.map(|p| p.insight)
}

fn assert_idle(controller: &InsightController) {
    let view = controller.view();
    assert_eq!(view.lifecycle, RequestLifecycle::Idle);
    assert_eq!(view.mode, ModeFlag::Neutral);
    assert_eq!(view.progress, 0.0);
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_scenario_a_quiet_ticks_issue_nothing() {
    let client = Arc::new(FakeReasoningClient::always(FLUX_SPIKE));
    let (controller, hook) = build(settings(), client.clone());
    let t0 = Instant::now();

    assert_eq!(controller.on_tick(&quiet(), t0), TickOutcome::Quiet);
    assert_eq!(
        controller.on_tick(&quiet(), t0 + Duration::from_millis(100)),
        TickOutcome::Quiet
    );

    controller.settled().await;
    assert_eq!(client.call_count(), 0);
    assert_eq!(hook.count(), 0);
    assert!(controller.last_request_at().is_none());
    assert_idle(&controller);
}

#[tokio::test]
async fn test_scenario_b_low_health_issues_request() {
    let client = Arc::new(FakeReasoningClient::always(FLUX_SPIKE));
    let (controller, _) = build(
        ControllerSettings {
            priority: ContextPriority::CriticalFirst,
            ..settings()
        },
        client.clone(),
    );
    let t0 = Instant::now();

    controller.on_tick(&quiet(), t0);
    let outcome = controller.on_tick(
        &TelemetrySnapshot::new(0.5, 0.2, 0, 0.95),
        t0 + Duration::from_millis(100),
    );

    match outcome {
        TickOutcome::Issued {
            context, verdict, ..
        } => {
            assert!(verdict.critical);
            assert_eq!(context, TrendContext::Critical);
        }
        other => panic!("expected a request, got {:?}", other),
    }

    controller.settled().await;
    assert_eq!(client.contexts(), vec![TrendContext::Critical]);
}

#[tokio::test]
async fn test_scenario_b_default_priority_frames_as_degrading() {
    // health 0.9 -> 0.5 is both critical and a slide; degrading framing wins by default
    let client = Arc::new(FakeReasoningClient::always(FLUX_SPIKE));
    let (controller, _) = build(settings(), client.clone());
    let t0 = Instant::now();

    controller.on_tick(&quiet(), t0);
    controller.on_tick(&TelemetrySnapshot::new(0.5, 0.2, 0, 0.95), t0);
    controller.settled().await;

    assert_eq!(client.contexts(), vec![TrendContext::Degrading]);
}

#[tokio::test]
async fn test_scenario_c_degrading_issues_degrading_context() {
    let client = Arc::new(FakeReasoningClient::always(FLUX_SPIKE));
    let (controller, _) = build(settings(), client.clone());
    let t0 = Instant::now();

    controller.on_tick(&TelemetrySnapshot::new(0.90, 0.1, 0, 0.95), t0);
    let outcome = controller.on_tick(&TelemetrySnapshot::new(0.85, 0.35, 0, 0.7), t0);

    match outcome {
        TickOutcome::Issued {
            context, verdict, ..
        } => {
            assert!(verdict.degrading);
            assert!(!verdict.critical);
            assert_eq!(context, TrendContext::Degrading);
        }
        other => panic!("expected a request, got {:?}", other),
    }
    controller.settled().await;
}

#[tokio::test]
async fn test_scenario_d_success_publishes_and_notifies_once() {
    let client = Arc::new(FakeReasoningClient::always(FLUX_SPIKE));
    let (controller, hook) = build(settings(), client.clone());

    let outcome = controller.on_tick(&lesions(), Instant::now());
    assert!(outcome.is_issued());
    assert_eq!(controller.view().mode, ModeFlag::Analyzing);

    controller.settled().await;

    assert_eq!(
        current_insight(&controller),
        Some(Insight::new("Flux spike", "Stabilize"))
    );
    assert_eq!(hook.count(), 1);
    assert_eq!(hook.last(), Some(Insight::new("Flux spike", "Stabilize")));
    assert_idle(&controller);
}

#[tokio::test]
async fn test_scenario_e_transport_failure_keeps_previous_insight() {
    let client = Arc::new(FakeReasoningClient::new(vec![
        Ok(FLUX_SPIKE.to_string()),
        Err(InsightError::Transport("backend unreachable".to_string())),
    ]));
    let (controller, hook) = build(settings(), client.clone());
    let t0 = Instant::now();

    controller.on_tick(&lesions(), t0);
    controller.settled().await;
    assert_eq!(hook.count(), 1);

    let t1 = t0 + Duration::from_secs(21);
    assert!(controller.on_tick(&lesions(), t1).is_issued());
    controller.settled().await;

    assert_eq!(client.call_count(), 2);
    assert_eq!(
        current_insight(&controller),
        Some(Insight::new("Flux spike", "Stabilize"))
    );
    assert_eq!(hook.count(), 1, "hook must not fire on failure");
    assert_eq!(controller.last_request_at(), Some(t1));
    assert_idle(&controller);
}

// ============================================================================
// Gating
// ============================================================================

#[tokio::test]
async fn test_single_flight_burst_issues_one_call() {
    let (client, gate) = FakeReasoningClient::always(FLUX_SPIKE).gated();
    let client = Arc::new(client);
    let (controller, hook) = build(settings(), client.clone());
    let t0 = Instant::now();

    assert!(controller.on_tick(&lesions(), t0).is_issued());
    for i in 1..=25u64 {
        let outcome = controller.on_tick(&lesions(), t0 + Duration::from_secs(i * 30));
        assert_eq!(outcome, TickOutcome::Suppressed);
    }

    // Let the spawned call start and park on the gate
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(client.call_count(), 1);
    assert_eq!(controller.view().lifecycle, RequestLifecycle::Pending);
    assert_eq!(controller.last_request_at(), Some(t0));

    gate.notify_one();
    controller.settled().await;
    assert_eq!(client.call_count(), 1);
    assert_eq!(hook.count(), 1);
    assert_idle(&controller);
}

#[tokio::test]
async fn test_cooldown_spacing() {
    let client = Arc::new(FakeReasoningClient::always(FLUX_SPIKE));
    let (controller, _) = build(settings(), client.clone());
    let t0 = Instant::now();

    assert!(controller.on_tick(&lesions(), t0).is_issued());
    controller.settled().await;

    match controller.on_tick(&lesions(), t0 + Duration::from_secs(5)) {
        TickOutcome::CoolingDown { remaining, .. } => {
            assert_eq!(remaining, Duration::from_secs(15));
        }
        other => panic!("expected cooldown, got {:?}", other),
    }
    assert_eq!(client.call_count(), 1);
    assert_eq!(controller.last_request_at(), Some(t0));

    let t2 = t0 + Duration::from_secs(21);
    assert!(controller.on_tick(&lesions(), t2).is_issued());
    controller.settled().await;
    assert_eq!(client.call_count(), 2);
    assert_eq!(controller.last_request_at(), Some(t2));
}

#[tokio::test]
async fn test_health_tracked_while_suppressed() {
    let (client, gate) = FakeReasoningClient::always(FLUX_SPIKE).gated();
    let client = Arc::new(client);
    let (controller, _) = build(settings(), client.clone());
    let t0 = Instant::now();

    controller.on_tick(&lesions(), t0);
    // Health drops while busy; this tick is skipped but still becomes the baseline
    assert_eq!(
        controller.on_tick(&TelemetrySnapshot::new(0.8, 0.1, 0, 0.95), t0),
        TickOutcome::Suppressed
    );

    gate.notify_one();
    controller.settled().await;

    // Same health as the suppressed tick: no slide, not critical
    let outcome = controller.on_tick(
        &TelemetrySnapshot::new(0.8, 0.1, 0, 0.95),
        t0 + Duration::from_secs(30),
    );
    assert_eq!(outcome, TickOutcome::Quiet);
    assert_eq!(client.call_count(), 1);
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn test_malformed_response_is_discarded() {
    let client = Arc::new(FakeReasoningClient::new(vec![
        Ok(FLUX_SPIKE.to_string()),
        Ok(r#"{"alert":"Flux spike","severity":9}"#.to_string()),
    ]));
    let (controller, hook) = build(settings(), client.clone());
    let t0 = Instant::now();

    controller.on_tick(&lesions(), t0);
    controller.settled().await;
    let before = controller.view().insight;

    controller.on_tick(&lesions(), t0 + Duration::from_secs(25));
    controller.settled().await;

    assert_eq!(controller.view().insight, before);
    assert_eq!(hook.count(), 1);
    assert_idle(&controller);
}

#[tokio::test]
async fn test_failure_without_prior_insight_leaves_none() {
    let client = Arc::new(FakeReasoningClient::always("definitely not json"));
    let (controller, hook) = build(settings(), client.clone());

    controller.on_tick(&lesions(), Instant::now());
    controller.settled().await;

    assert!(controller.view().insight.is_none());
    assert_eq!(hook.count(), 0);
    assert_idle(&controller);
}

#[tokio::test]
async fn test_timeout_settles_like_failure() {
    // Gate is never released: only the timeout can end the call
    let (client, _gate) = FakeReasoningClient::always(FLUX_SPIKE).gated();
    let client = Arc::new(client);
    let (controller, hook) = build(
        ControllerSettings {
            request_timeout: Some(Duration::from_millis(50)),
            ..settings()
        },
        client.clone(),
    );
    let t0 = Instant::now();

    controller.on_tick(&lesions(), t0);
    controller.settled().await;

    assert_eq!(client.call_count(), 1);
    assert_eq!(hook.count(), 0);
    assert_eq!(controller.last_request_at(), Some(t0));
    assert_idle(&controller);
}

#[tokio::test]
async fn test_view_channel_reports_transitions() {
    let (client, gate) = FakeReasoningClient::always(FLUX_SPIKE).gated();
    let (controller, _) = build(settings(), Arc::new(client));
    let mut views = controller.subscribe();
    assert_eq!(views.borrow_and_update().mode, ModeFlag::Neutral);

    controller.on_tick(&lesions(), Instant::now());
    assert!(views.has_changed().unwrap());
    assert_eq!(views.borrow_and_update().mode, ModeFlag::Analyzing);

    gate.notify_one();
    controller.settled().await;

    let view = views.borrow_and_update().clone();
    assert_eq!(view.mode, ModeFlag::Neutral);
    assert_eq!(view.lifecycle, RequestLifecycle::Idle);
    assert_eq!(view.requests_issued, 1);
    assert!(view.insight.is_some());
}

/// Backend whose call blows up inside the request task
struct PanickingClient;

#[async_trait]
impl ReasoningClient for PanickingClient {
    async fn request(
        &self,
        _snapshot: &TelemetrySnapshot,
        _context: TrendContext,
    ) -> Result<String, InsightError> {
        panic!("backend exploded");
    }
}

#[tokio::test]
async fn test_panicking_request_returns_to_idle() {
    let hook = Arc::new(RecordingAlertHook::new());
    let controller = InsightController::new(settings(), Arc::new(PanickingClient))
        .with_alert_hook(hook.clone());
    let t0 = Instant::now();

    assert!(controller.on_tick(&lesions(), t0).is_issued());
    controller.settled().await;

    assert_idle(&controller);
    assert!(controller.view().insight.is_none());
    assert_eq!(hook.count(), 0);
    assert_eq!(controller.last_request_at(), Some(t0));

    // Cooldown still measured from the failed issuance
    assert!(matches!(
        controller.on_tick(&lesions(), t0 + Duration::from_secs(5)),
        TickOutcome::CoolingDown { .. }
    ));
}

#[tokio::test]
async fn test_cancelled_request_returns_to_idle() {
    let (client, gate) = FakeReasoningClient::new(vec![
        Ok(FLUX_SPIKE.to_string()),
        Ok(r#"{"alert":"late"}"#.to_string()),
    ])
    .gated();
    let client = Arc::new(client);
    let (controller, hook) = build(settings(), client.clone());
    let t0 = Instant::now();

    controller.on_tick(&lesions(), t0);
    gate.notify_one();
    controller.settled().await;
    assert_eq!(hook.count(), 1);

    let t1 = t0 + Duration::from_secs(21);
    assert!(controller.on_tick(&lesions(), t1).is_issued());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(client.call_count(), 2);
    assert_eq!(controller.view().lifecycle, RequestLifecycle::Pending);

    assert!(controller.cancel().await);
    assert_idle(&controller);
    assert_eq!(controller.last_request_at(), Some(t1));
    assert_eq!(
        current_insight(&controller),
        Some(Insight::new("Flux spike", "Stabilize"))
    );

    // Releasing the gate afterwards changes nothing
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_idle(&controller);
    assert_eq!(hook.count(), 1);
    assert!(!controller.cancel().await);
}

#[tokio::test]
async fn test_settle_wait_can_be_interrupted() {
    let (client, _gate) = FakeReasoningClient::always(FLUX_SPIKE).gated();
    let (controller, hook) = build(settings(), Arc::new(client));

    controller.on_tick(&lesions(), Instant::now());
    let settled = tokio::time::timeout(
        Duration::from_secs(1),
        controller.settled_or(tokio::time::sleep(Duration::from_millis(20))),
    )
    .await
    .expect("interrupt should end the wait");

    assert!(!settled);
    assert_eq!(hook.count(), 0);
}

#[tokio::test]
async fn test_settle_wait_completes_without_interrupt() {
    let client = Arc::new(FakeReasoningClient::always(FLUX_SPIKE));
    let (controller, hook) = build(settings(), client);

    controller.on_tick(&lesions(), Instant::now());
    assert!(controller.settled_or(std::future::pending()).await);
    assert_eq!(hook.count(), 1);
    assert_idle(&controller);
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test]
async fn test_result_after_shutdown_is_discarded() {
    let (client, gate) = FakeReasoningClient::always(FLUX_SPIKE).gated();
    let client = Arc::new(client);
    let (controller, hook) = build(settings(), client.clone());
    let views = controller.subscribe();

    controller.on_tick(&lesions(), Instant::now());
    tokio::time::sleep(Duration::from_millis(20)).await;

    let handle = controller.shutdown().expect("request outstanding");
    gate.notify_one();
    handle.await.unwrap();

    assert_eq!(client.call_count(), 1);
    assert_eq!(hook.count(), 0);
    // Last published view is the analyzing one; nothing was applied after teardown
    let last = views.borrow().clone();
    assert_eq!(last.mode, ModeFlag::Analyzing);
    assert!(last.insight.is_none());
}

// ============================================================================
// Thinking progress
// ============================================================================

#[tokio::test]
async fn test_progress_climbs_while_pending_and_resets() {
    let (client, gate) = FakeReasoningClient::always(FLUX_SPIKE).gated();
    let (controller, _) = build(
        ControllerSettings {
            progress: ProgressConfig {
                interval_ms: 5,
                ..ProgressConfig::default()
            },
            ..settings()
        },
        Arc::new(client),
    );

    controller.on_tick(&lesions(), Instant::now());
    assert_eq!(controller.view().progress, 0.0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let progress = controller.view().progress;
    assert!(progress > 0.0, "progress should advance, got {}", progress);
    assert!(progress <= 98.0);

    gate.notify_one();
    controller.settled().await;
    assert_eq!(controller.view().progress, 0.0);
}

#[tokio::test]
async fn test_progress_never_reaches_completion() {
    let (client, gate) = FakeReasoningClient::always(FLUX_SPIKE).gated();
    let (controller, _) = build(
        ControllerSettings {
            progress: ProgressConfig {
                interval_ms: 2,
                min_step: 40.0,
                max_step: 60.0,
                ..ProgressConfig::default()
            },
            ..settings()
        },
        Arc::new(client),
    );

    controller.on_tick(&lesions(), Instant::now());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let view = controller.view();
    assert_eq!(view.progress, 98.0);
    assert_eq!(view.lifecycle, RequestLifecycle::Pending);

    gate.notify_one();
    controller.settled().await;
    assert_idle(&controller);
}
