use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use vigil::core::alertness::{
    next_level, AlertClassifier, AlertLevel, AlertnessPipeline, DataQuality, DriveContext, Signal,
    SignalKind, TrendDirection, TrendForecaster,
};
use vigil::core::config::{FusionConfig, LevelThresholds};

fn signal(kind: SignalKind, value: f64, at: DateTime<Utc>) -> Signal {
    Signal::model_inferred(kind, value, 0.9, at)
}

#[test]
fn test_scenario_a_all_fresh_is_normal() {
    let mut pipeline = AlertnessPipeline::new(Arc::new(FusionConfig::default()));
    let now = Utc::now();
    pipeline.ingest(signal(SignalKind::Drowsiness, 0.1, now));
    pipeline.ingest(signal(SignalKind::Distraction, 0.05, now));
    pipeline.ingest(signal(SignalKind::VoiceFatigue, 0.02, now));

    let out = pipeline.tick(now, &DriveContext::default());
    // 0.5*0.1 + 0.3*0.05 + 0.2*0.02 = 0.069
    assert!((out.state.raw_score - 93.1).abs() < 1e-9);
    assert_eq!(out.state.level, AlertLevel::Normal);
    assert!(!out.state.degraded);
    assert_eq!(out.state.quality, DataQuality::Full);
    assert!(out.intervention.is_none());
}

#[test]
fn test_scenario_b_stale_drowsiness_renormalizes() {
    let mut pipeline = AlertnessPipeline::new(Arc::new(FusionConfig::default()));
    let t0 = Utc::now();
    pipeline.ingest(signal(SignalKind::Drowsiness, 0.9, t0));

    let mut last = None;
    for i in 1..=15 {
        let now = t0 + Duration::milliseconds(100 * i);
        pipeline.ingest(signal(SignalKind::Distraction, 0.1, now));
        pipeline.ingest(signal(SignalKind::VoiceFatigue, 0.1, now));
        last = Some(pipeline.tick(now, &DriveContext::default()).state);
    }

    // drowsiness expected every 500 ms, stale after 1 s
    let state = last.unwrap();
    assert!((state.raw_score - 90.0).abs() < 1e-9);
    assert!(state.degraded);
    assert_eq!(state.quality, DataQuality::Partial);
    let drowsiness = state.signal(SignalKind::Drowsiness).unwrap();
    assert!(!drowsiness.fresh);
    assert_eq!(drowsiness.effective_weight, 0.0);
    let distraction = state.signal(SignalKind::Distraction).unwrap();
    assert!((distraction.effective_weight - 0.6).abs() < 1e-12);
}

#[test]
fn test_scenario_c_declining_sequence_forecasts_decline() {
    let mut forecaster = TrendForecaster::new(&FusionConfig::default().forecast);
    let t0 = Utc::now();
    let mut trend = None;
    for (i, score) in [80.0, 75.0, 70.0, 65.0, 60.0].iter().enumerate() {
        trend = Some(forecaster.update_and_forecast(t0 + Duration::seconds(15 * i as i64), *score));
    }
    let trend = trend.unwrap();
    assert_eq!(trend.direction, TrendDirection::Declining);
    // 60 - 5 points per 15 s over a 30 s horizon
    assert!((trend.forecast_score - 50.0).abs() < 1e-6);
    assert!((trend.confidence - 1.0).abs() < 1e-9);
    assert!(trend.rate_per_min < 0.0);
}

#[test]
fn test_scenario_d_moderate_holds_inside_margin() {
    let t = LevelThresholds::default();
    let mut classifier = AlertClassifier::new();
    classifier.classify(25.0, false, &t);
    assert_eq!(classifier.level(), AlertLevel::Moderate);

    // just above the Normal lower bound but within the margin
    let score = t.normal + t.hysteresis / 2.0;
    assert_eq!(classifier.classify(score, false, &t), AlertLevel::Moderate);
    assert_eq!(classifier.transitions(), 1);

    assert_eq!(next_level(AlertLevel::Moderate, t.mild + 2.0, false, &t), AlertLevel::Moderate);
}

#[test]
fn test_all_stale_keeps_publishing_degraded() {
    let mut pipeline = AlertnessPipeline::new(Arc::new(FusionConfig::default()));
    let t0 = Utc::now();
    for kind in SignalKind::ALL {
        pipeline.ingest(signal(kind, 0.4, t0));
    }
    let first = pipeline.tick(t0, &DriveContext::default()).state;

    let later = pipeline
        .tick(t0 + Duration::seconds(20), &DriveContext::default())
        .state;
    assert!(later.degraded);
    assert_eq!(later.quality, DataQuality::Held);
    assert_eq!(later.raw_score, first.raw_score);
    assert_eq!(later.tick, 2);
}

#[test]
fn test_degraded_never_relaxes_level() {
    let mut pipeline = AlertnessPipeline::new(Arc::new(FusionConfig::default()));
    let t0 = Utc::now();
    let mut now = t0;
    for i in 0..30 {
        now = t0 + Duration::milliseconds(100 * i);
        for kind in SignalKind::ALL {
            pipeline.ingest(signal(kind, 0.9, now));
        }
        pipeline.tick(now, &DriveContext::default());
    }
    assert_eq!(pipeline.last_state().level, AlertLevel::Severe);

    // camera lost: only a reassuring voice signal keeps arriving
    for i in 1..=100 {
        let at = now + Duration::milliseconds(1000 + 100 * i);
        pipeline.ingest(signal(SignalKind::VoiceFatigue, 0.0, at));
        let state = pipeline.tick(at, &DriveContext::default()).state;
        assert_eq!(state.level, AlertLevel::Severe);
    }
}

#[test]
fn test_future_dated_signal_does_not_freeze_modality() {
    let mut pipeline = AlertnessPipeline::new(Arc::new(FusionConfig::default()));
    let t0 = Utc::now();
    pipeline.ingest(signal(SignalKind::Drowsiness, 0.0, t0 + Duration::days(1)));
    pipeline.ingest(signal(SignalKind::Distraction, 1.0, t0));
    pipeline.ingest(signal(SignalKind::VoiceFatigue, 1.0, t0));
    pipeline.tick(t0, &DriveContext::default());

    let t1 = t0 + Duration::seconds(10);
    for kind in SignalKind::ALL {
        pipeline.ingest(signal(kind, 1.0, t1));
    }
    let state = pipeline.tick(t1, &DriveContext::default()).state;
    assert!(state.raw_score.abs() < 1e-9, "raw {}", state.raw_score);
    assert_eq!(state.signal(SignalKind::Drowsiness).unwrap().value, Some(1.0));
    assert!(!state.degraded);
}

#[test]
fn test_future_dated_signal_still_goes_stale() {
    let mut pipeline = AlertnessPipeline::new(Arc::new(FusionConfig::default()));
    let t0 = Utc::now();
    pipeline.ingest(signal(SignalKind::Drowsiness, 0.3, t0 + Duration::days(1)));
    let first = pipeline.tick(t0, &DriveContext::default()).state;
    assert!(first.signal(SignalKind::Drowsiness).unwrap().fresh);

    let later = pipeline
        .tick(t0 + Duration::seconds(3), &DriveContext::default())
        .state;
    assert!(!later.signal(SignalKind::Drowsiness).unwrap().fresh);
    assert_eq!(later.quality, DataQuality::Held);
}
