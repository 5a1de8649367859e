use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use vigil::core::alertness::tasks::tick_task;
use vigil::core::alertness::{
    AlertLevel, AlertnessRuntime, AlertnessState, DriveContext, SignalHub, SignalKind,
    SignalOrigin, StatePublisher,
};
use vigil::core::config::FusionConfig;

fn fast_config() -> FusionConfig {
    FusionConfig {
        tick_interval_ms: 10,
        ..Default::default()
    }
}

fn feed(hub: &SignalHub, values: [f64; SignalKind::COUNT]) {
    for kind in SignalKind::ALL {
        hub.submit_signal(kind, values[kind.index()], 0.9, Utc::now(), SignalOrigin::ModelInferred);
    }
}

/// Keep signals fresh for `millis` while the runtime ticks.
fn feed_for(hub: &SignalHub, values: [f64; SignalKind::COUNT], millis: u64) {
    let rounds = millis / 10;
    for _ in 0..rounds {
        feed(hub, values);
        thread::sleep(StdDuration::from_millis(10));
    }
}

#[test]
fn test_runtime_publishes_fused_state() {
    let runtime = AlertnessRuntime::new(fast_config()).unwrap();
    let hub = runtime.hub();
    feed_for(&hub, [0.1, 0.05, 0.02], 300);

    let state = runtime.get_current_state();
    assert!(state.tick > 0);
    assert!((state.raw_score - 93.1).abs() < 1e-9);
    assert_eq!(state.level, AlertLevel::Normal);
    assert!(!state.degraded);

    let stats = runtime.shutdown().unwrap();
    assert!(stats.ticks >= state.tick);
}

#[test]
fn test_runtime_shutdown_publishes_final_snapshot() {
    let runtime = AlertnessRuntime::new(fast_config()).unwrap();
    let rx = runtime.subscribe();
    feed_for(&runtime.hub(), [0.2, 0.2, 0.2], 100);

    let stats = runtime.shutdown().unwrap();
    let last = rx.borrow().clone();
    assert!(last.shutting_down);
    assert!(last.degraded);
    assert_eq!(last.tick, stats.ticks);
}

#[test]
fn test_runtime_rejects_invalid_config_and_keeps_previous() {
    let runtime = AlertnessRuntime::new(fast_config()).unwrap();
    let bad = FusionConfig {
        smoothing_alpha: 1.5,
        ..fast_config()
    };
    let err = runtime.update_config(bad).unwrap_err();
    assert!(err.is_invalid_config());
    assert_eq!(runtime.current_config().smoothing_alpha, 0.3);

    let good = FusionConfig {
        smoothing_alpha: 1.0,
        ..fast_config()
    };
    runtime.update_config(good).unwrap();
    assert_eq!(runtime.current_config().smoothing_alpha, 1.0);

    // with alpha 1 the smoothed score follows the raw score exactly
    feed_for(&runtime.hub(), [0.5, 0.5, 0.5], 200);
    let state = runtime.get_current_state();
    assert!((state.smoothed_score - state.raw_score).abs() < 1e-9);
    runtime.shutdown().unwrap();
}

#[test]
fn test_runtime_rejects_invalid_initial_config() {
    let bad = FusionConfig {
        tick_interval_ms: 0,
        ..Default::default()
    };
    assert!(AlertnessRuntime::new(bad).is_err());
}

#[test]
fn test_runtime_emits_interventions_under_sustained_risk() {
    let runtime = AlertnessRuntime::new(fast_config()).unwrap();
    let mut interventions = runtime.subscribe_interventions();
    let seen = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&seen);
    runtime.on_intervention(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    runtime.submit_context(DriveContext::new(50.0, false, false));
    feed_for(&runtime.hub(), [0.95, 0.95, 0.95], 400);

    assert_eq!(runtime.get_current_state().level, AlertLevel::Severe);
    let event = interventions.try_recv().unwrap();
    assert_eq!(event.channel, vigil::core::alertness::Channel::Voice);

    let stats = runtime.shutdown().unwrap();
    assert!(stats.interventions() >= 1);
    assert_eq!(stats.interventions(), seen.load(Ordering::SeqCst));
}

#[test]
fn test_runtime_goes_degraded_when_producers_stop() {
    let config = FusionConfig {
        tick_interval_ms: 10,
        staleness: vigil::core::config::StalenessConfig {
            drowsiness_interval_ms: 20,
            distraction_interval_ms: 20,
            voice_fatigue_interval_ms: 20,
            factor: 2.0,
        },
        ..Default::default()
    };
    let runtime = AlertnessRuntime::new(config).unwrap();
    feed_for(&runtime.hub(), [0.3, 0.3, 0.3], 100);
    assert!(!runtime.get_current_state().degraded);

    thread::sleep(StdDuration::from_millis(150));
    let state = runtime.get_current_state();
    assert!(state.degraded);
    assert!(state.tick > 0);
    runtime.shutdown().unwrap();
}

#[test]
fn test_runtime_recovers_from_future_dated_signal() {
    let runtime = AlertnessRuntime::new(fast_config()).unwrap();
    let skewed = Utc::now() + chrono::Duration::days(1);
    assert!(runtime.submit_signal(SignalKind::Drowsiness, 0.0, 1.0, skewed, SignalOrigin::ModelInferred));
    thread::sleep(StdDuration::from_millis(600));

    feed_for(&runtime.hub(), [1.0, 1.0, 1.0], 200);
    let state = runtime.get_current_state();
    assert!(state.raw_score.abs() < 1e-9, "raw {}", state.raw_score);
    assert_eq!(state.signal(SignalKind::Drowsiness).unwrap().value, Some(1.0));
    runtime.shutdown().unwrap();
}

#[tokio::test]
async fn test_tick_task_stops_on_shutdown() {
    let hub = SignalHub::new();
    let publisher = Arc::new(StatePublisher::new(AlertnessState::initial(Utc::now())));
    let (_config_tx, config_rx) = watch::channel(Arc::new(fast_config()));
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let mut states = publisher.subscribe();

    let handle = tokio::spawn(tick_task(hub.clone(), Arc::clone(&publisher), config_rx, shutdown_rx));

    feed(&hub, [0.1, 0.1, 0.1]);
    states.changed().await.unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    shutdown_tx.send(()).unwrap();
    let stats = handle.await.unwrap();
    assert!(stats.ticks >= 1);

    let last = publisher.get_current();
    assert!(last.shutting_down);
    assert_eq!(last.tick, stats.ticks);
}
