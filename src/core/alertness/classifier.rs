//! Hysteretic alert level classification.
//!
//! Maps the smoothed score onto four bands. Every boundary carries a dead
//! band of `hysteresis` points so a score hovering at a threshold cannot
//! flap between levels.

use serde::{Deserialize, Serialize};

use crate::core::config::LevelThresholds;

/// Alert bands, ordered by severity (`Normal < Severe`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Normal,
    Mild,
    Moderate,
    Severe,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 4] = [
        AlertLevel::Normal,
        AlertLevel::Mild,
        AlertLevel::Moderate,
        AlertLevel::Severe,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Mild => "mild",
            AlertLevel::Moderate => "moderate",
            AlertLevel::Severe => "severe",
        }
    }

    /// Lowest score that still belongs to this band.
    pub fn lower_bound(self, t: &LevelThresholds) -> f64 {
        match self {
            AlertLevel::Normal => t.normal,
            AlertLevel::Mild => t.mild,
            AlertLevel::Moderate => t.moderate,
            AlertLevel::Severe => 0.0,
        }
    }

    /// Score at which the next less severe band starts.
    pub fn upper_bound(self, t: &LevelThresholds) -> f64 {
        match self {
            AlertLevel::Normal => 100.0,
            AlertLevel::Mild => t.normal,
            AlertLevel::Moderate => t.mild,
            AlertLevel::Severe => t.moderate,
        }
    }

    /// Plain band lookup without hysteresis.
    pub fn from_score(score: f64, t: &LevelThresholds) -> AlertLevel {
        if score >= t.normal {
            AlertLevel::Normal
        } else if score >= t.mild {
            AlertLevel::Mild
        } else if score >= t.moderate {
            AlertLevel::Moderate
        } else {
            AlertLevel::Severe
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Next level given the current one.
///
/// Escalating into band L requires `score < upper(L) - margin`; among the
/// bands that qualify the most severe one wins. Relaxation only ever moves
/// to the band the score sits in, and only once it clears that band's
/// `lower + margin`; otherwise the current level holds. While `degraded`,
/// relaxation is blocked entirely.
pub fn next_level(current: AlertLevel, score: f64, degraded: bool, t: &LevelThresholds) -> AlertLevel {
    if !score.is_finite() {
        return current;
    }
    let margin = t.hysteresis;
    let target = AlertLevel::from_score(score, t);

    if target > current {
        AlertLevel::ALL
            .iter()
            .rev()
            .copied()
            .filter(|l| *l > current)
            .find(|l| score < l.upper_bound(t) - margin)
            .unwrap_or(current)
    } else if target < current {
        if degraded || score < target.lower_bound(t) + margin {
            return current;
        }
        target
    } else {
        current
    }
}

/// Stateful classifier. Starts at `Normal` and runs indefinitely.
#[derive(Debug, Clone)]
pub struct AlertClassifier {
    level: AlertLevel,
    transitions: u64,
}

impl AlertClassifier {
    pub fn new() -> Self {
        Self {
            level: AlertLevel::Normal,
            transitions: 0,
        }
    }

    pub fn level(&self) -> AlertLevel {
        self.level
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn classify(&mut self, score: f64, degraded: bool, thresholds: &LevelThresholds) -> AlertLevel {
        let next = next_level(self.level, score, degraded, thresholds);
        if next != self.level {
            log::info!(
                "Alert level {} -> {} (score {:.1}{})",
                self.level,
                next,
                score,
                if degraded { ", degraded" } else { "" }
            );
            self.level = next;
            self.transitions += 1;
        }
        self.level
    }
}

impl Default for AlertClassifier {
    fn default() -> Self {
        Self::new()
    }
}
