use chrono::{Duration, Utc};
use vigil::core::alertness::{
    fuse_modalities, AlertClassifier, AlertLevel, DriveContext, FusionCore, InterventionDispatcher,
    ModalityState, Signal, SignalKind, TemporalSmoother, TrendForecaster,
};
use vigil::core::config::{FusionConfig, ForecastConfig, ModalityWeights};

const GRID: [f64; 6] = [0.0, 0.1, 0.33, 0.5, 0.77, 1.0];

fn fresh(kind: SignalKind, value: f64) -> ModalityState {
    ModalityState {
        latest: Some(Signal::model_inferred(kind, value, 1.0, Utc::now())),
        stale: false,
    }
}

fn stale(kind: SignalKind, value: f64) -> ModalityState {
    ModalityState {
        stale: true,
        ..fresh(kind, value)
    }
}

fn weight_sets() -> Vec<ModalityWeights> {
    let mut sets = Vec::new();
    for a in [0.0, 0.2, 0.5, 1.0] {
        for b in [0.0, 0.3, 0.7] {
            for c in [0.0, 0.2, 0.4] {
                if let Ok(w) = ModalityWeights::normalized(a, b, c) {
                    sets.push(w);
                }
            }
        }
    }
    sets
}

#[test]
fn test_raw_score_always_in_range() {
    let now = Utc::now();
    let contexts = [
        DriveContext::default(),
        DriveContext::new(130.0, true, true),
        DriveContext::new(20.0, true, false).with_accel(9.0),
    ];
    for weights in weight_sets() {
        let config = FusionConfig {
            weights,
            ..Default::default()
        };
        for ctx in &contexts {
            for d in GRID {
                for di in GRID {
                    for v in GRID {
                        let mut core = FusionCore::new();
                        core.ingest(Signal::model_inferred(SignalKind::Drowsiness, d, 1.0, now));
                        core.ingest(Signal::model_inferred(SignalKind::Distraction, di, 1.0, now));
                        core.ingest(Signal::rule_based(SignalKind::VoiceFatigue, v, 1.0, now));
                        let out = core.fuse(now, ctx, &config);
                        assert!(
                            (0.0..=100.0).contains(&out.raw_score),
                            "raw {} out of range",
                            out.raw_score
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_out_of_range_inputs_are_clamped_not_rejected() {
    let now = Utc::now();
    let mut core = FusionCore::new();
    core.ingest(Signal::model_inferred(SignalKind::Drowsiness, 1.3, 1.4, now));
    core.ingest(Signal::model_inferred(SignalKind::Distraction, -0.2, 0.9, now));
    core.ingest(Signal::model_inferred(SignalKind::VoiceFatigue, 0.0, 0.9, now));
    let out = core.fuse(now, &DriveContext::default(), &FusionConfig::default());
    assert!((out.raw_score - 50.0).abs() < 1e-9);
}

#[test]
fn test_stale_modality_equals_excluding_it_from_config() {
    let ctx = DriveContext::default();
    let base = FusionConfig::default();
    for stale_kind in SignalKind::ALL {
        for (d, di, v) in [(0.1, 0.05, 0.02), (0.9, 0.2, 0.6), (0.4, 0.4, 1.0)] {
            let values = [d, di, v];
            let modalities = SignalKind::ALL.map(|k| {
                if k == stale_kind {
                    stale(k, values[k.index()])
                } else {
                    fresh(k, values[k.index()])
                }
            });
            let (renormalized, _) = fuse_modalities(&modalities, &ctx, &base);

            let mut excluded = base.clone();
            let mut raw = SignalKind::ALL.map(|k| base.weights.get(k));
            raw[stale_kind.index()] = 0.0;
            excluded.weights = ModalityWeights::normalized(raw[0], raw[1], raw[2]).unwrap();
            let all_fresh = SignalKind::ALL.map(|k| fresh(k, values[k.index()]));
            let (reference, _) = fuse_modalities(&all_fresh, &ctx, &excluded);

            let (a, b) = (renormalized.unwrap(), reference.unwrap());
            assert!((a - b).abs() < 1e-12, "{:?}: {} != {}", stale_kind, a, b);
        }
    }
}

#[test]
fn test_smoother_converges_within_inverse_alpha_ticks() {
    for alpha in [0.1, 0.3, 0.5, 0.9] {
        let mut s = TemporalSmoother::new(alpha);
        s.smooth(100.0);
        let ticks = (10.0 / alpha).ceil() as usize;
        let mut v = 100.0;
        for _ in 0..ticks {
            v = s.smooth(25.0);
        }
        assert!((v - 25.0).abs() < 0.1, "alpha {} ended at {}", alpha, v);
    }
}

#[test]
fn test_classifier_sinusoid_within_band_does_not_flap() {
    let config = FusionConfig::default();
    let t = &config.levels;
    for boundary in [t.normal, t.mild, t.moderate] {
        let mut c = AlertClassifier::new();
        c.classify(boundary + 0.1, false, t);
        let start = c.transitions();
        for i in 0..1000 {
            let score = boundary + (t.hysteresis / 2.0) * (i as f64 * 0.1).sin();
            c.classify(score, false, t);
        }
        assert!(c.transitions() - start <= 1, "flapped at boundary {}", boundary);
    }
}

#[test]
fn test_dispatcher_cooldown_and_escalation() {
    let config = FusionConfig::default().intervention;
    let ctx = DriveContext::new(60.0, false, false);
    let mut d = InterventionDispatcher::new();
    let t0 = Utc::now();

    let a = d.dispatch(AlertLevel::Moderate, &ctx, t0, &config);
    let b = d.dispatch(AlertLevel::Moderate, &ctx, t0 + Duration::seconds(1), &config);
    assert!(a.is_some());
    assert!(b.is_none());

    let c = d.dispatch(AlertLevel::Severe, &ctx, t0 + Duration::seconds(2), &config);
    assert!(c.is_some());
}

#[test]
fn test_forecaster_reproduces_linear_sequence() {
    let config = ForecastConfig {
        lookback_secs: 30.0,
        horizon_secs: 15.0,
        ..Default::default()
    };
    let mut f = TrendForecaster::new(&config);
    let t0 = Utc::now();
    let mut trend = None;
    for i in 0..=60 {
        let t = i as f64 * 0.5;
        trend = Some(f.update_and_forecast(t0 + Duration::milliseconds(500 * i), 90.0 - 0.8 * t));
    }
    let trend = trend.unwrap();
    // line at t = 30 + 15
    assert!((trend.forecast_score - (90.0 - 0.8 * 45.0)).abs() < 1e-6);
    assert!((trend.confidence - 1.0).abs() < 1e-9);
}
