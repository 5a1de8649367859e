//! Weighted fusion of the latest per-modality signals into one raw score.
//!
//! Stale, missing or low-confidence modalities are dropped and the
//! remaining weights are rescaled to sum to one, so a lost modality never
//! drags the score toward zero risk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::{clamp_unit, DriveContext, Signal, SignalKind};
use crate::core::config::FusionConfig;

/// Score reported before any modality has ever produced a signal.
pub const INITIAL_RAW_SCORE: f64 = 100.0;

/// Latest signal of one modality plus its staleness flag.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModalityState {
    pub latest: Option<Signal>,
    pub stale: bool,
}

impl ModalityState {
    pub fn is_fresh(&self) -> bool {
        self.latest.is_some() && !self.stale
    }
}

/// How much of the enabled input the fused score is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    /// Every enabled modality is fresh.
    Full,
    /// Some enabled modalities are stale; weights were renormalized.
    Partial,
    /// Nothing fresh; the previous raw score is held.
    Held,
}

/// What one modality contributed to a fusion pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub kind: SignalKind,
    pub fresh: bool,
    /// Signal value after environment modifiers.
    pub adjusted_value: Option<f64>,
    /// Weight after renormalization; 0 when excluded.
    pub effective_weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusionOutput {
    pub raw_score: f64,
    /// Fused risk in [0,1]; `None` when the score was held.
    pub risk: Option<f64>,
    pub quality: DataQuality,
    pub contributions: [Contribution; SignalKind::COUNT],
}

impl FusionOutput {
    pub fn degraded(&self) -> bool {
        self.quality != DataQuality::Full
    }
}

/// Apply environment modifiers to one modality value.
pub fn apply_context(kind: SignalKind, value: f64, ctx: &DriveContext, config: &FusionConfig) -> f64 {
    let c = &config.context;
    let mut v = value;
    match kind {
        SignalKind::Drowsiness => {
            if ctx.night {
                v *= c.night_drowsiness_gain;
            }
        }
        SignalKind::Distraction => {
            if ctx.speed_kmh > config.intervention.speed_threshold_high {
                v *= c.highway_distraction_gain;
            }
            if ctx.vibration_detected(c.vibration_accel_threshold) {
                v += c.vibration_distraction_offset;
            }
        }
        SignalKind::VoiceFatigue => {}
    }
    clamp_unit(v)
}

/// Weighted risk over the fresh, enabled modalities.
///
/// Returns `None` when nothing usable is left. Weights of the surviving
/// modalities are divided by their sum, which is exactly the risk obtained
/// by configuring only those modalities in the first place.
pub fn fuse_modalities(
    modalities: &[ModalityState; SignalKind::COUNT],
    ctx: &DriveContext,
    config: &FusionConfig,
) -> (Option<f64>, [Contribution; SignalKind::COUNT]) {
    let mut contributions = SignalKind::ALL.map(|kind| Contribution {
        kind,
        fresh: false,
        adjusted_value: None,
        effective_weight: 0.0,
    });

    let mut weight_sum = 0.0;
    for kind in SignalKind::ALL {
        let state = &modalities[kind.index()];
        let weight = config.weights.get(kind);
        let slot = &mut contributions[kind.index()];
        slot.fresh = state.is_fresh();
        if let Some(signal) = state.latest {
            slot.adjusted_value = Some(apply_context(kind, signal.value, ctx, config));
        }
        if slot.fresh && weight > 0.0 {
            weight_sum += weight;
        }
    }

    if weight_sum <= 0.0 {
        return (None, contributions);
    }

    let mut risk = 0.0;
    for slot in contributions.iter_mut() {
        let weight = config.weights.get(slot.kind);
        if !slot.fresh || weight <= 0.0 {
            continue;
        }
        if let Some(value) = slot.adjusted_value {
            slot.effective_weight = weight / weight_sum;
            risk += slot.effective_weight * value;
        }
    }

    (Some(clamp_unit(risk)), contributions)
}

/// Convert a risk in [0,1] into a 0-100 alertness score.
pub fn risk_to_score(risk: f64) -> f64 {
    ((1.0 - clamp_unit(risk)) * 100.0).clamp(0.0, 100.0)
}

/// Owner of the per-modality state. Only the tick executor touches it.
#[derive(Debug, Clone)]
pub struct FusionCore {
    modalities: [ModalityState; SignalKind::COUNT],
    last_raw: f64,
}

impl FusionCore {
    pub fn new() -> Self {
        Self {
            modalities: [ModalityState::default(); SignalKind::COUNT],
            last_raw: INITIAL_RAW_SCORE,
        }
    }

    /// Latest-wins update. A signal older than the one held is ignored.
    pub fn ingest(&mut self, signal: Signal) {
        let state = &mut self.modalities[signal.kind.index()];
        match state.latest {
            Some(current) if current.timestamp > signal.timestamp => {
                log::debug!(
                    "Ignoring out-of-order {} signal ({} < {})",
                    signal.kind,
                    signal.timestamp,
                    current.timestamp
                );
            }
            _ => {
                state.latest = Some(signal);
                state.stale = false;
            }
        }
    }

    /// Mark modalities stale when their signal outlived its deadline or
    /// carries less confidence than the configured minimum.
    ///
    /// A held signal dated further ahead than the allowed clock skew is
    /// pulled back to `now + skew` first, so it ages out like any other.
    pub fn sweep(&mut self, now: DateTime<Utc>, config: &FusionConfig) {
        for kind in SignalKind::ALL {
            let state = &mut self.modalities[kind.index()];
            let Some(signal) = state.latest.as_mut() else {
                state.stale = true;
                continue;
            };
            if signal.bound_to_clock(now) {
                log::warn!("{} signal is dated ahead of the tick clock; clamped to {}", kind, signal.timestamp);
            }
            let expired = signal.age_at(now) > config.staleness.deadline(kind);
            let unsure = signal.confidence < config.min_confidence;
            if (expired || unsure) && !state.stale {
                log::debug!("{} signal went stale (expired={}, low_confidence={})", kind, expired, unsure);
            }
            state.stale = expired || unsure;
        }
    }

    /// Run one fusion pass at `now`.
    pub fn fuse(&mut self, now: DateTime<Utc>, ctx: &DriveContext, config: &FusionConfig) -> FusionOutput {
        self.sweep(now, config);

        let (risk, contributions) = fuse_modalities(&self.modalities, ctx, config);

        let enabled = SignalKind::ALL
            .iter()
            .filter(|k| config.weights.is_enabled(**k))
            .count();
        let fresh_enabled = contributions
            .iter()
            .filter(|c| c.fresh && config.weights.is_enabled(c.kind))
            .count();

        match risk {
            Some(risk) => {
                let raw_score = risk_to_score(risk);
                self.last_raw = raw_score;
                let quality = if fresh_enabled == enabled {
                    DataQuality::Full
                } else {
                    DataQuality::Partial
                };
                FusionOutput {
                    raw_score,
                    risk: Some(risk),
                    quality,
                    contributions,
                }
            }
            None => FusionOutput {
                raw_score: self.last_raw,
                risk: None,
                quality: DataQuality::Held,
                contributions,
            },
        }
    }

    pub fn modality(&self, kind: SignalKind) -> &ModalityState {
        &self.modalities[kind.index()]
    }

    pub fn modalities(&self) -> &[ModalityState; SignalKind::COUNT] {
        &self.modalities
    }

    pub fn last_raw(&self) -> f64 {
        self.last_raw
    }
}

impl Default for FusionCore {
    fn default() -> Self {
        Self::new()
    }
}
