use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::AlertLevel;
use super::fusion::{DataQuality, FusionOutput, ModalityState, INITIAL_RAW_SCORE};
use super::history::Trend;
use super::signal::{DriveContext, SignalKind, SignalOrigin};

/// Per-modality view inside a published snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub kind: SignalKind,
    pub value: Option<f64>,
    /// Value after environment modifiers.
    pub adjusted_value: Option<f64>,
    pub confidence: Option<f64>,
    pub origin: Option<SignalOrigin>,
    pub age_ms: Option<i64>,
    pub fresh: bool,
    pub effective_weight: f64,
}

impl SignalSnapshot {
    fn empty(kind: SignalKind) -> Self {
        Self {
            kind,
            value: None,
            adjusted_value: None,
            confidence: None,
            origin: None,
            age_ms: None,
            fresh: false,
            effective_weight: 0.0,
        }
    }
}

/// Immutable snapshot published once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertnessState {
    pub tick: u64,
    pub raw_score: f64,
    pub smoothed_score: f64,
    pub level: AlertLevel,
    pub trend: Trend,
    pub degraded: bool,
    pub quality: DataQuality,
    pub signals: Vec<SignalSnapshot>,
    pub context: DriveContext,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub shutting_down: bool,
}

impl AlertnessState {
    /// What subscribers see before the first tick ran.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            tick: 0,
            raw_score: INITIAL_RAW_SCORE,
            smoothed_score: INITIAL_RAW_SCORE,
            level: AlertLevel::Normal,
            trend: Trend::neutral(INITIAL_RAW_SCORE),
            degraded: true,
            quality: DataQuality::Held,
            signals: SignalKind::ALL.iter().map(|k| SignalSnapshot::empty(*k)).collect(),
            context: DriveContext::default(),
            generated_at: now,
            shutting_down: false,
        }
    }

    pub fn signal(&self, kind: SignalKind) -> Option<&SignalSnapshot> {
        self.signals.iter().find(|s| s.kind == kind)
    }

    pub fn intervention_needed(&self) -> bool {
        self.level >= AlertLevel::Moderate
    }

    /// Final snapshot emitted on shutdown: same scores, flagged degraded.
    pub fn into_shutdown(mut self, now: DateTime<Utc>) -> Self {
        self.degraded = true;
        self.shutting_down = true;
        self.generated_at = now;
        self
    }
}

impl Default for AlertnessState {
    fn default() -> Self {
        Self::initial(Utc::now())
    }
}

pub(crate) fn signal_snapshots(
    modalities: &[ModalityState; SignalKind::COUNT],
    fusion: &FusionOutput,
    now: DateTime<Utc>,
) -> Vec<SignalSnapshot> {
    fusion
        .contributions
        .iter()
        .map(|c| {
            let mut snap = SignalSnapshot::empty(c.kind);
            snap.fresh = c.fresh;
            snap.adjusted_value = c.adjusted_value;
            snap.effective_weight = c.effective_weight;
            if let Some(signal) = modalities[c.kind.index()].latest {
                snap.value = Some(signal.value);
                snap.confidence = Some(signal.confidence);
                snap.origin = Some(signal.origin);
                snap.age_ms = Some(signal.age_at(now).num_milliseconds());
            }
            snap
        })
        .collect()
}
