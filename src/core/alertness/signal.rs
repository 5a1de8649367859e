use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One input channel feeding the fusion core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Drowsiness,
    Distraction,
    VoiceFatigue,
}

impl SignalKind {
    pub const COUNT: usize = 3;
    pub const ALL: [SignalKind; SignalKind::COUNT] = [
        SignalKind::Drowsiness,
        SignalKind::Distraction,
        SignalKind::VoiceFatigue,
    ];

    /// Slot index used by every per-modality array.
    pub fn index(self) -> usize {
        match self {
            SignalKind::Drowsiness => 0,
            SignalKind::Distraction => 1,
            SignalKind::VoiceFatigue => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SignalKind::Drowsiness => "drowsiness",
            SignalKind::Distraction => "distraction",
            SignalKind::VoiceFatigue => "voice_fatigue",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a producer derived its estimate. The core treats both the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOrigin {
    ModelInferred,
    RuleBased,
}

/// A timestamped, confidence-scored risk estimate from one modality.
///
/// `value` is a risk in [0,1] (0 = fine, 1 = maximal risk). Values are
/// clamped on construction so producers can hand over slightly
/// out-of-range floats without being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub value: f64,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub origin: SignalOrigin,
}

impl Signal {
    pub fn new(
        kind: SignalKind,
        value: f64,
        confidence: f64,
        timestamp: DateTime<Utc>,
        origin: SignalOrigin,
    ) -> Self {
        Self {
            kind,
            value: clamp_unit(value),
            confidence: clamp_unit(confidence),
            timestamp,
            origin,
        }
    }

    /// Signal produced by a trained model (probability of the risk class).
    pub fn model_inferred(
        kind: SignalKind,
        probability: f64,
        confidence: f64,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(kind, probability, confidence, at, SignalOrigin::ModelInferred)
    }

    /// Signal produced by a threshold/heuristic fallback.
    pub fn rule_based(kind: SignalKind, value: f64, confidence: f64, at: DateTime<Utc>) -> Self {
        Self::new(kind, value, confidence, at, SignalOrigin::RuleBased)
    }

    /// Pull a timestamp that runs more than `MAX_CLOCK_SKEW_MS` ahead of
    /// `now` back to that limit. Returns whether it had to be clamped.
    pub fn bound_to_clock(&mut self, now: DateTime<Utc>) -> bool {
        let limit = now + Duration::milliseconds(MAX_CLOCK_SKEW_MS);
        if self.timestamp > limit {
            self.timestamp = limit;
            true
        } else {
            false
        }
    }

    /// Age of the signal relative to `now`. Future timestamps count as age zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        let age = now - self.timestamp;
        if age < Duration::zero() {
            Duration::zero()
        } else {
            age
        }
    }
}

/// How far a producer clock may run ahead of the consumer clock.
pub const MAX_CLOCK_SKEW_MS: i64 = 500;

/// Clamp into [0,1]; non-finite input collapses to 0.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Auxiliary environment flags. Not a weighted modality: these bias
/// modality values before fusion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveContext {
    pub speed_kmh: f64,
    pub night: bool,
    pub vibration: bool,
    /// Raw IMU acceleration magnitude (m/s²), when the host has one.
    pub accel_magnitude: Option<f64>,
}

impl DriveContext {
    pub fn new(speed_kmh: f64, night: bool, vibration: bool) -> Self {
        Self {
            speed_kmh: if speed_kmh.is_finite() { speed_kmh.max(0.0) } else { 0.0 },
            night,
            vibration,
            accel_magnitude: None,
        }
    }

    pub fn with_accel(mut self, magnitude: f64) -> Self {
        self.accel_magnitude = magnitude.is_finite().then_some(magnitude.abs());
        self
    }

    /// Vibration is either flagged explicitly or inferred from the IMU.
    pub fn vibration_detected(&self, accel_threshold: f64) -> bool {
        self.vibration || self.accel_magnitude.is_some_and(|a| a > accel_threshold)
    }
}
