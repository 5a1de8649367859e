//! Session-level aggregates over every published tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::AlertLevel;
use super::dispatcher::{Channel, InterventionEvent};
use super::state::AlertnessState;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub started_at: Option<DateTime<Utc>>,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub ticks: u64,
    pub mean_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    /// Running sum of squared deviations (Welford).
    m2: f64,
    /// Ticks spent in each level, indexed by `AlertLevel::index`.
    pub level_ticks: [u64; 4],
    pub degraded_ticks: u64,
    pub level_changes: u64,
    pub visual_interventions: u64,
    pub voice_interventions: u64,
    #[serde(skip)]
    last_level: Option<AlertLevel>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, state: &AlertnessState) {
        let score = state.smoothed_score;
        if self.ticks == 0 {
            self.started_at = Some(state.generated_at);
            self.min_score = score;
            self.max_score = score;
        } else {
            self.min_score = self.min_score.min(score);
            self.max_score = self.max_score.max(score);
        }
        self.ticks += 1;
        self.last_tick_at = Some(state.generated_at);

        let delta = score - self.mean_score;
        self.mean_score += delta / self.ticks as f64;
        self.m2 += delta * (score - self.mean_score);

        self.level_ticks[state.level.index()] += 1;
        if state.degraded {
            self.degraded_ticks += 1;
        }
        if self.last_level.is_some_and(|l| l != state.level) {
            self.level_changes += 1;
        }
        self.last_level = Some(state.level);
    }

    pub fn record_intervention(&mut self, event: &InterventionEvent) {
        match event.channel {
            Channel::Visual => self.visual_interventions += 1,
            Channel::Voice => self.voice_interventions += 1,
        }
    }

    /// Population standard deviation of the smoothed score.
    pub fn std_dev(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            (self.m2 / self.ticks as f64).sqrt()
        }
    }

    pub fn interventions(&self) -> u64 {
        self.visual_interventions + self.voice_interventions
    }

    pub fn level_percentage(&self, level: AlertLevel) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.level_ticks[level.index()] as f64 * 100.0 / self.ticks as f64
        }
    }

    pub fn degraded_percentage(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.degraded_ticks as f64 * 100.0 / self.ticks as f64
        }
    }
}
