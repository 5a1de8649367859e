//! Recorded drive scenarios.
//!
//! A scenario is a JSON list of timed events: ready-made signals, raw
//! observations for the rule-based adapters, and context changes. It can
//! be replayed offline on a synthetic clock (deterministic, used by tests
//! and `vigil replay`) or in real time through the async runtime.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::alertness::{
    AlertnessPipeline, AlertnessState, DriveContext, EyeObservation, EyeStateAdapter, HeadPose,
    HeadPoseAdapter, InterventionEvent, SessionStats, Signal, SignalAdapter, SignalKind,
    SignalOrigin, VoiceCueAdapter, VoiceFeatures,
};
use crate::core::config::FusionConfig;

/// Longest replayable scenario (one day).
pub const MAX_SCENARIO_MS: u64 = 86_400_000;
const MAX_REPLAY_TICKS: u64 = 1_000_000;

fn full_confidence() -> f64 {
    1.0
}

fn model_origin() -> SignalOrigin {
    SignalOrigin::ModelInferred
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Signal {
        kind: SignalKind,
        value: f64,
        #[serde(default = "full_confidence")]
        confidence: f64,
        #[serde(default = "model_origin")]
        origin: SignalOrigin,
    },
    Eyes(EyeObservation),
    Pose(HeadPose),
    Voice(VoiceFeatures),
    Context(DriveContext),
}

impl EventPayload {
    /// Modality the event feeds; `None` for context changes.
    pub fn modality(&self) -> Option<SignalKind> {
        match self {
            EventPayload::Signal { kind, .. } => Some(*kind),
            EventPayload::Eyes(_) => Some(SignalKind::Drowsiness),
            EventPayload::Pose(_) => Some(SignalKind::Distraction),
            EventPayload::Voice(_) => Some(SignalKind::VoiceFatigue),
            EventPayload::Context(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    /// Offset from scenario start.
    pub at_ms: u64,
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Overrides the stored configuration for this replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<FusionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub events: Vec<ScenarioEvent>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {:?}", path))?;
        Self::from_json_str(&data).with_context(|| format!("Invalid scenario file: {:?}", path))
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        let mut scenario: Scenario = serde_json::from_str(data)?;
        if let Some(config) = &scenario.config {
            config.validate()?;
        }
        if let Some(duration) = scenario.duration_ms.filter(|d| *d > MAX_SCENARIO_MS) {
            anyhow::bail!("duration_ms {} exceeds the {} ms limit", duration, MAX_SCENARIO_MS);
        }
        if let Some(event) = scenario.events.iter().find(|e| e.at_ms > MAX_SCENARIO_MS) {
            anyhow::bail!("event at_ms {} exceeds the {} ms limit", event.at_ms, MAX_SCENARIO_MS);
        }
        // stable, so same-instant events keep file order
        scenario.events.sort_by_key(|e| e.at_ms);
        Ok(scenario)
    }

    /// Replay length: `duration_ms` or the last event offset, capped at
    /// `MAX_SCENARIO_MS`.
    pub fn end_ms(&self) -> u64 {
        self.duration_ms
            .unwrap_or_else(|| self.events.iter().map(|e| e.at_ms).max().unwrap_or(0))
            .min(MAX_SCENARIO_MS)
    }

    /// Events grouped per producer: one list per modality plus context.
    pub fn split_by_producer(&self) -> ([Vec<ScenarioEvent>; SignalKind::COUNT], Vec<ScenarioEvent>) {
        let mut modalities: [Vec<ScenarioEvent>; SignalKind::COUNT] = Default::default();
        let mut context = Vec::new();
        for event in &self.events {
            match event.payload.modality() {
                Some(kind) => modalities[kind.index()].push(event.clone()),
                None => context.push(event.clone()),
            }
        }
        (modalities, context)
    }
}

/// One adapter per modality, each keeping its own temporal state.
#[derive(Debug, Clone, Default)]
pub struct ObservationAdapters {
    pub eyes: EyeStateAdapter,
    pub pose: HeadPoseAdapter,
    pub voice: VoiceCueAdapter,
}

impl ObservationAdapters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a signal-bearing payload into a `Signal` stamped `at`.
    pub fn to_signal(&mut self, payload: &EventPayload, at: DateTime<Utc>) -> Option<Signal> {
        match payload {
            EventPayload::Signal {
                kind,
                value,
                confidence,
                origin,
            } => Some(Signal::new(*kind, *value, *confidence, at, *origin)),
            EventPayload::Eyes(obs) => Some(self.eyes.adapt(obs, at)),
            EventPayload::Pose(pose) => Some(self.pose.adapt(pose, at)),
            EventPayload::Voice(features) => Some(self.voice.adapt(features, at)),
            EventPayload::Context(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    pub states: Vec<AlertnessState>,
    pub interventions: Vec<InterventionEvent>,
    pub stats: SessionStats,
}

impl ReplayReport {
    pub fn last(&self) -> Option<&AlertnessState> {
        self.states.last()
    }
}

/// Deterministic replay on a synthetic clock starting at `start`.
///
/// Ticks run every `tick_interval_ms` up to and including `end_ms`. Events
/// due at or before a tick are applied before it, stamped with their own
/// offset.
pub fn replay_offline(scenario: &Scenario, config: Arc<FusionConfig>, start: DateTime<Utc>) -> ReplayReport {
    let step = config.tick_interval_ms.max(1);
    let mut end = scenario.end_ms();
    if end / step > MAX_REPLAY_TICKS {
        log::warn!("Replay truncated to {} ticks", MAX_REPLAY_TICKS);
        end = step * MAX_REPLAY_TICKS;
    }
    let mut pipeline = AlertnessPipeline::new(config);
    let mut adapters = ObservationAdapters::new();
    let mut context = DriveContext::default();
    let mut report = ReplayReport::default();
    let mut pending = scenario.events.iter().peekable();

    let mut t = step;
    while t <= end {
        while let Some(event) = pending.next_if(|e| e.at_ms <= t) {
            let at = start + Duration::milliseconds(event.at_ms as i64);
            match &event.payload {
                EventPayload::Context(ctx) => context = *ctx,
                payload => {
                    if let Some(signal) = adapters.to_signal(payload, at) {
                        pipeline.ingest(signal);
                    }
                }
            }
        }

        let outcome = pipeline.tick(start + Duration::milliseconds(t as i64), &context);
        report.states.push(outcome.state);
        report.interventions.extend(outcome.intervention);
        t += step;
    }

    report.stats = pipeline.into_stats();
    report
}
