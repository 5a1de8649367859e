use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::Utc;
use tempfile::TempDir;
use vigil::core::alertness::{AlertLevel, AlertnessRuntime, SignalKind, SignalOrigin};
use vigil::core::config::FusionConfig;
use vigil::core::scenario::{replay_offline, EventPayload, Scenario, ScenarioEvent};

/// Eyes closing after 2 s while the head stays forward and the voice is lively.
fn drowsy_scenario_json() -> String {
    let mut events = Vec::new();
    for i in 0..=80 {
        let at = i * 100;
        let ear = if at < 2000 { 0.32 } else { 0.15 };
        events.push(format!(
            r#"{{"at_ms": {}, "type": "eyes", "ear": {}, "mar": 0.1, "blink_rate": 15.0}}"#,
            at, ear
        ));
        events.push(format!(r#"{{"at_ms": {}, "type": "pose", "yaw": 3.0, "pitch": -2.0}}"#, at));
        if at % 1000 == 0 {
            events.push(format!(
                r#"{{"at_ms": {}, "type": "voice", "energy": 0.08, "spectral_centroid_hz": 2500.0, "spectral_rolloff_hz": 4200.0}}"#,
                at
            ));
        }
    }
    events.push(r#"{"at_ms": 0, "type": "context", "speed_kmh": 70.0, "night": true}"#.to_string());
    format!(
        r#"{{"name": "drowsy night drive", "duration_ms": 8000, "events": [{}]}}"#,
        events.join(",")
    )
}

#[test]
fn test_replay_file_escalates_on_sustained_closure() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("drowsy.json");
    fs::write(&path, drowsy_scenario_json()).unwrap();

    let scenario = Scenario::load(&path).unwrap();
    assert_eq!(scenario.name, "drowsy night drive");

    let report = replay_offline(&scenario, Arc::new(FusionConfig::default()), Utc::now());
    assert_eq!(report.states.len(), 80);

    let early = &report.states[10];
    assert_eq!(early.level, AlertLevel::Normal);
    let eyes = early.signal(SignalKind::Drowsiness).unwrap();
    assert_eq!(eyes.origin, Some(SignalOrigin::RuleBased));

    let last = report.last().unwrap();
    assert!(last.level >= AlertLevel::Mild, "ended at {:?}", last.level);
    assert!(last.smoothed_score < 70.0);
    assert!(!report.interventions.is_empty());
    assert_eq!(report.stats.ticks, 80);
    assert!(report.stats.level_changes >= 1);
}

#[test]
fn test_replay_is_deterministic() {
    let scenario = Scenario::from_json_str(&drowsy_scenario_json()).unwrap();
    let start = Utc::now();
    let config = Arc::new(FusionConfig::default());
    let a = replay_offline(&scenario, Arc::clone(&config), start);
    let b = replay_offline(&scenario, config, start);
    assert_eq!(a.states, b.states);
    assert_eq!(a.interventions, b.interventions);
}

#[test]
fn test_missing_scenario_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = Scenario::load(&temp_dir.path().join("nope.json")).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read scenario file"));
}

#[test]
fn test_realtime_producers_feed_the_runtime() {
    let config = FusionConfig {
        tick_interval_ms: 10,
        ..Default::default()
    };
    let mut runtime = AlertnessRuntime::new(config).unwrap();

    let signal = |at_ms: u64, kind: SignalKind, value: f64| ScenarioEvent {
        at_ms,
        payload: EventPayload::Signal {
            kind,
            value,
            confidence: 1.0,
            origin: SignalOrigin::ModelInferred,
        },
    };
    let scenario = Scenario {
        events: vec![
            signal(0, SignalKind::Drowsiness, 0.2),
            signal(0, SignalKind::Distraction, 0.2),
            signal(0, SignalKind::VoiceFatigue, 0.2),
            signal(50, SignalKind::Drowsiness, 0.4),
        ],
        ..Default::default()
    };

    let (modalities, context) = scenario.split_by_producer();
    runtime.spawn_replay_producer("context", context);
    for (kind, events) in SignalKind::ALL.into_iter().zip(modalities) {
        runtime.spawn_replay_producer(kind.label(), events);
    }

    thread::sleep(StdDuration::from_millis(250));
    assert!(runtime.producers_finished());
    let state = runtime.get_current_state();
    // 0.5*0.4 + 0.3*0.2 + 0.2*0.2
    assert!((state.raw_score - 70.0).abs() < 1e-9);
    assert!(!state.degraded);

    let stats = runtime.shutdown().unwrap();
    assert!(stats.ticks > 0);
}
