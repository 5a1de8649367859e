//! Rule-based signal sources.
//!
//! These are the fallbacks producers use when no trained model is loaded.
//! Each adapter turns one raw feature observation into a `Signal` tagged
//! `RuleBased`; model-backed producers build their signals with
//! `Signal::model_inferred` instead.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::signal::{clamp_unit, Signal, SignalKind};

/// Converts one modality's raw observations into signals.
pub trait SignalAdapter: Send {
    type Observation;

    fn kind(&self) -> SignalKind;

    fn adapt(&mut self, observation: &Self::Observation, at: DateTime<Utc>) -> Signal;

    /// Forget any temporal state (e.g. after the face was lost).
    fn reset(&mut self) {}
}

/// Eye/mouth landmark features for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeObservation {
    /// Eye aspect ratio.
    pub ear: Option<f64>,
    /// Mouth aspect ratio.
    pub mar: Option<f64>,
    /// Blinks per minute.
    pub blink_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeRuleParams {
    pub ear_open: f64,
    pub ear_closed: f64,
    pub mar_yawn: f64,
    pub blink_rate_normal: f64,
    pub sustained_closure: Duration,
    pub sustained_value: f64,
}

impl Default for EyeRuleParams {
    fn default() -> Self {
        Self {
            ear_open: 0.25,
            ear_closed: 0.2,
            mar_yawn: 0.6,
            blink_rate_normal: 15.0,
            sustained_closure: Duration::seconds(3),
            sustained_value: 0.9,
        }
    }
}

/// Drowsiness from eye closure, yawning and blink rate.
#[derive(Debug, Clone, Default)]
pub struct EyeStateAdapter {
    params: EyeRuleParams,
    closed_since: Option<DateTime<Utc>>,
}

impl EyeStateAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: EyeRuleParams) -> Self {
        Self {
            params,
            closed_since: None,
        }
    }

    fn closure_held(&mut self, ear: Option<f64>, at: DateTime<Utc>) -> bool {
        match ear {
            Some(e) if e.is_finite() && e < self.params.ear_closed => {
                let since = *self.closed_since.get_or_insert(at);
                at - since >= self.params.sustained_closure
            }
            _ => {
                self.closed_since = None;
                false
            }
        }
    }
}

impl SignalAdapter for EyeStateAdapter {
    type Observation = EyeObservation;

    fn kind(&self) -> SignalKind {
        SignalKind::Drowsiness
    }

    fn adapt(&mut self, obs: &EyeObservation, at: DateTime<Utc>) -> Signal {
        let p = self.params;
        let components = [
            (0.5, obs.ear.map(|e| (1.0 - e / p.ear_open).max(0.0))),
            (0.3, obs.mar.map(|m| (m / p.mar_yawn).min(1.0))),
            (0.2, obs.blink_rate.map(|b| (1.0 - b / p.blink_rate_normal).max(0.0))),
        ];

        let mut weight = 0.0;
        let mut score = 0.0;
        for (w, value) in components {
            if let Some(v) = value.filter(|v| v.is_finite()) {
                weight += w;
                score += w * v;
            }
        }
        let mut value = if weight > 0.0 { score / weight } else { 0.0 };

        if self.closure_held(obs.ear, at) {
            value = value.max(p.sustained_value);
        }

        Signal::rule_based(SignalKind::Drowsiness, value, weight, at)
    }

    fn reset(&mut self) {
        self.closed_since = None;
    }
}

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPose {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseRuleParams {
    pub forward_yaw: f64,
    pub forward_pitch: f64,
    pub yaw_threshold: f64,
    pub pitch_down_threshold: f64,
    pub saturation_deg: f64,
}

impl Default for PoseRuleParams {
    fn default() -> Self {
        Self {
            forward_yaw: 20.0,
            forward_pitch: 15.0,
            yaw_threshold: 30.0,
            pitch_down_threshold: 20.0,
            saturation_deg: 45.0,
        }
    }
}

/// Distraction from head pose.
#[derive(Debug, Clone, Default)]
pub struct HeadPoseAdapter {
    params: PoseRuleParams,
}

impl HeadPoseAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: PoseRuleParams) -> Self {
        Self { params }
    }
}

impl SignalAdapter for HeadPoseAdapter {
    type Observation = HeadPose;

    fn kind(&self) -> SignalKind {
        SignalKind::Distraction
    }

    fn adapt(&mut self, pose: &HeadPose, at: DateTime<Utc>) -> Signal {
        let p = self.params;
        if !(pose.yaw.is_finite() && pose.pitch.is_finite()) {
            return Signal::rule_based(SignalKind::Distraction, 0.0, 0.0, at);
        }
        let yaw = pose.yaw.abs();

        let (value, confidence) = if yaw < p.forward_yaw && pose.pitch.abs() < p.forward_pitch {
            let off_axis = (yaw / p.forward_yaw + pose.pitch.abs() / p.forward_pitch) / 2.0;
            (0.0, 1.0 - off_axis)
        } else if yaw > p.yaw_threshold {
            let v = (yaw / p.saturation_deg).min(1.0);
            (v, v)
        } else if pose.pitch > p.pitch_down_threshold {
            let v = (pose.pitch / p.saturation_deg).min(1.0);
            (v, v)
        } else {
            // between forward and distracted: assume forward, low confidence
            (0.0, 0.5)
        };

        Signal::rule_based(SignalKind::Distraction, value, confidence, at)
    }
}

/// Audio features for one analysis frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceFeatures {
    pub yawn_confidence: f64,
    /// RMS energy.
    pub energy: f64,
    pub spectral_centroid_hz: f64,
    pub spectral_rolloff_hz: Option<f64>,
    /// Longest pause in the frame, seconds.
    pub pause_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceRuleParams {
    pub energy_reference: f64,
    pub centroid_reference_hz: f64,
    pub rolloff_threshold_hz: f64,
    pub pause_reference_secs: f64,
    pub yawn_threshold: f64,
    pub fatigue_threshold: f64,
}

impl Default for VoiceRuleParams {
    fn default() -> Self {
        Self {
            energy_reference: 0.05,
            centroid_reference_hz: 2000.0,
            rolloff_threshold_hz: 2000.0,
            pause_reference_secs: 3.0,
            yawn_threshold: 0.6,
            fatigue_threshold: 0.5,
        }
    }
}

/// Voice fatigue from prosody and yawning.
#[derive(Debug, Clone, Default)]
pub struct VoiceCueAdapter {
    params: VoiceRuleParams,
}

impl VoiceCueAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: VoiceRuleParams) -> Self {
        Self { params }
    }

    /// Fatigue component alone, without the yawn override.
    pub fn fatigue_score(&self, f: &VoiceFeatures) -> f64 {
        let p = self.params;
        let energy = (1.0 - f.energy / p.energy_reference).max(0.0);
        let centroid = (1.0 - f.spectral_centroid_hz / p.centroid_reference_hz).max(0.0);
        let pause = (f.pause_secs / p.pause_reference_secs).min(1.0);
        let mut fatigue = clamp_unit(0.3 * energy + 0.3 * centroid + 0.4 * pause);

        // a dull spectrum alone is enough to call the voice fatigued
        if f.spectral_rolloff_hz.is_some_and(|r| r < p.rolloff_threshold_hz) {
            fatigue = fatigue.max(p.fatigue_threshold);
        }
        fatigue
    }
}

impl SignalAdapter for VoiceCueAdapter {
    type Observation = VoiceFeatures;

    fn kind(&self) -> SignalKind {
        SignalKind::VoiceFatigue
    }

    fn adapt(&mut self, f: &VoiceFeatures, at: DateTime<Utc>) -> Signal {
        let p = self.params;
        let yawn = clamp_unit(f.yawn_confidence);
        let fatigue = self.fatigue_score(f);

        let (value, confidence) = if yawn > p.yawn_threshold {
            (yawn.max(fatigue), yawn)
        } else if fatigue > p.fatigue_threshold {
            (fatigue, fatigue)
        } else {
            (fatigue, 1.0 - yawn.max(fatigue))
        };

        Signal::rule_based(SignalKind::VoiceFatigue, value, confidence, at)
    }
}
