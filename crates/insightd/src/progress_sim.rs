//! Thinking progress simulation.
//!
//! One task per issued request. It only writes `progress` and stops as soon
//! as its request leaves Pending or the controller is dropped.

use crate::controller::Shared;
use insight_common::ProgressConfig;
use rand::Rng;
use std::sync::Weak;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

pub(crate) fn spawn(shared: Weak<Shared>, config: ProgressConfig, request_id: Uuid) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(shared) = shared.upgrade() else {
                break;
            };
            let increment = sample_step(&config, &mut rand::thread_rng());
            let mut state = shared.lock();
            if !state.advance_progress(request_id, increment, config.effective_cap()) {
                break;
            }
            shared.publish(&state);
        }
    });
}

/// Draw one random increment from the configured range.
pub fn sample_step<R: Rng + ?Sized>(config: &ProgressConfig, rng: &mut R) -> f64 {
    let (lo, hi) = config.step_range();
    if hi <= lo {
        lo
    } else {
        rng.gen_range(lo..hi)
    }
}
