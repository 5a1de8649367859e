use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::alertness::SignalKind;
use crate::error::VigilError;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
/// Ceiling for every window, horizon and cooldown, in seconds (one day).
pub const MAX_WINDOW_SECS: f64 = 86_400.0;
/// Ceiling for the tick and producer intervals (one hour).
pub const MAX_INTERVAL_MS: u64 = 3_600_000;
const MAX_STALENESS_FACTOR: f64 = 100.0;

/// Per-modality fusion weights. A weight of 0 disables the modality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalityWeights {
    pub drowsiness: f64,
    pub distraction: f64,
    pub voice_fatigue: f64,
}

impl Default for ModalityWeights {
    fn default() -> Self {
        Self {
            drowsiness: 0.5,
            distraction: 0.3,
            voice_fatigue: 0.2,
        }
    }
}

impl ModalityWeights {
    pub fn get(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Drowsiness => self.drowsiness,
            SignalKind::Distraction => self.distraction,
            SignalKind::VoiceFatigue => self.voice_fatigue,
        }
    }

    pub fn set(&mut self, kind: SignalKind, weight: f64) {
        match kind {
            SignalKind::Drowsiness => self.drowsiness = weight,
            SignalKind::Distraction => self.distraction = weight,
            SignalKind::VoiceFatigue => self.voice_fatigue = weight,
        }
    }

    pub fn is_enabled(&self, kind: SignalKind) -> bool {
        self.get(kind) > 0.0
    }

    pub fn sum(&self) -> f64 {
        SignalKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    /// Scale arbitrary non-negative weights so they sum to 1.
    pub fn normalized(drowsiness: f64, distraction: f64, voice_fatigue: f64) -> crate::Result<Self> {
        let raw = Self {
            drowsiness,
            distraction,
            voice_fatigue,
        };
        if SignalKind::ALL
            .iter()
            .any(|k| !raw.get(*k).is_finite() || raw.get(*k) < 0.0)
        {
            return Err(VigilError::invalid_config(
                "weights must be finite and non-negative",
            ));
        }
        let total = raw.sum();
        if total <= 0.0 {
            return Err(VigilError::invalid_config(
                "at least one modality weight must be positive",
            ));
        }
        Ok(Self {
            drowsiness: drowsiness / total,
            distraction: distraction / total,
            voice_fatigue: voice_fatigue / total,
        })
    }
}

/// Expected producer cadence per modality. A signal goes stale once it is
/// older than `factor` times its expected interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessConfig {
    pub drowsiness_interval_ms: u64,
    pub distraction_interval_ms: u64,
    pub voice_fatigue_interval_ms: u64,
    pub factor: f64,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            drowsiness_interval_ms: 500,
            distraction_interval_ms: 500,
            voice_fatigue_interval_ms: 2000,
            factor: 2.0,
        }
    }
}

impl StalenessConfig {
    pub fn expected_interval_ms(&self, kind: SignalKind) -> u64 {
        match kind {
            SignalKind::Drowsiness => self.drowsiness_interval_ms,
            SignalKind::Distraction => self.distraction_interval_ms,
            SignalKind::VoiceFatigue => self.voice_fatigue_interval_ms,
        }
    }

    pub fn deadline(&self, kind: SignalKind) -> Duration {
        let ms = self.expected_interval_ms(kind) as f64 * self.factor;
        Duration::milliseconds(ms.round() as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Width of the regression window.
    pub lookback_secs: f64,
    /// How far ahead the forecast is projected.
    pub horizon_secs: f64,
    /// Dead-band around the current score before a direction is reported.
    pub epsilon: f64,
    /// Hard cap on retained points, independent of the time window.
    pub max_points: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lookback_secs: 60.0,
            horizon_secs: 30.0,
            epsilon: 1.0,
            max_points: 600,
        }
    }
}

/// Lower score bounds of each band (0-100 alertness, higher is better).
/// Anything below `moderate` is Severe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub normal: f64,
    pub mild: f64,
    pub moderate: f64,
    pub hysteresis: f64,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            normal: 70.0,
            mild: 40.0,
            moderate: 20.0,
            hysteresis: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionConfig {
    pub visual_cooldown_secs: f64,
    pub voice_cooldown_secs: f64,
    /// Above this speed (km/h) interventions go to the visual channel.
    pub speed_threshold_high: f64,
    pub enable_visual: bool,
    pub enable_voice: bool,
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            visual_cooldown_secs: 6.0,
            voice_cooldown_secs: 12.0,
            speed_threshold_high: 90.0,
            enable_visual: true,
            enable_voice: true,
        }
    }
}

/// Environment modifiers applied to modality values ahead of fusion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub night_drowsiness_gain: f64,
    pub vibration_distraction_offset: f64,
    pub highway_distraction_gain: f64,
    /// IMU magnitude (m/s²) above which vibration is assumed.
    pub vibration_accel_threshold: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            night_drowsiness_gain: 1.2,
            vibration_distraction_offset: 0.05,
            highway_distraction_gain: 1.1,
            vibration_accel_threshold: 6.0,
        }
    }
}

/// Complete tuning of the fusion pipeline.
///
/// Swapped atomically at runtime; a config only ever reaches the pipeline
/// after `validate` accepted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub weights: ModalityWeights,
    pub smoothing_alpha: f64,
    /// Signals below this confidence are treated as missing.
    pub min_confidence: f64,
    pub tick_interval_ms: u64,
    pub staleness: StalenessConfig,
    pub forecast: ForecastConfig,
    pub levels: LevelThresholds,
    pub intervention: InterventionConfig,
    pub context: ContextConfig,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: ModalityWeights::default(),
            smoothing_alpha: 0.3,
            min_confidence: 0.0,
            tick_interval_ms: 100,
            staleness: StalenessConfig::default(),
            forecast: ForecastConfig::default(),
            levels: LevelThresholds::default(),
            intervention: InterventionConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

impl FusionConfig {
    pub fn from_json_str(data: &str) -> crate::Result<Self> {
        let config: FusionConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Smoothing factor forced into (0,1].
    pub fn effective_alpha(&self) -> f64 {
        if self.smoothing_alpha.is_finite() {
            self.smoothing_alpha.clamp(f64::EPSILON, 1.0)
        } else {
            1.0
        }
    }

    /// Reject anything that could leave the pipeline in an undefined state.
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |msg: String| -> crate::Result<()> { Err(VigilError::invalid_config(msg)) };

        for kind in SignalKind::ALL {
            let w = self.weights.get(kind);
            if !w.is_finite() || w < 0.0 {
                return invalid(format!("weight for {} must be finite and >= 0 (got {})", kind, w));
            }
        }
        let sum = self.weights.sum();
        if sum <= 0.0 {
            return invalid("at least one modality must be enabled".to_string());
        }
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return invalid(format!("weights must sum to 1.0 (got {:.6})", sum));
        }

        if !(self.smoothing_alpha.is_finite() && self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return invalid(format!(
                "smoothing_alpha must be in (0, 1] (got {})",
                self.smoothing_alpha
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return invalid(format!(
                "min_confidence must be in [0, 1] (got {})",
                self.min_confidence
            ));
        }
        if self.tick_interval_ms == 0 || self.tick_interval_ms > MAX_INTERVAL_MS {
            return invalid(format!(
                "tick_interval_ms must be in 1..={} (got {})",
                MAX_INTERVAL_MS, self.tick_interval_ms
            ));
        }

        let factor = self.staleness.factor;
        if !(factor.is_finite() && (1.0..=MAX_STALENESS_FACTOR).contains(&factor)) {
            return invalid(format!(
                "staleness factor must be in [1, {}] (got {})",
                MAX_STALENESS_FACTOR, factor
            ));
        }
        for kind in SignalKind::ALL {
            let interval = self.staleness.expected_interval_ms(kind);
            if interval == 0 || interval > MAX_INTERVAL_MS {
                return invalid(format!(
                    "expected interval for {} must be in 1..={} ms (got {})",
                    kind, MAX_INTERVAL_MS, interval
                ));
            }
        }

        let f = &self.forecast;
        for (name, v) in [("lookback_secs", f.lookback_secs), ("horizon_secs", f.horizon_secs)] {
            if !(v.is_finite() && v > 0.0 && v <= MAX_WINDOW_SECS) {
                return invalid(format!(
                    "forecast {} must be in (0, {}] (got {})",
                    name, MAX_WINDOW_SECS, v
                ));
            }
        }
        if !(f.epsilon.is_finite() && f.epsilon >= 0.0) {
            return invalid("forecast epsilon must be >= 0".to_string());
        }
        if f.max_points < 2 {
            return invalid("forecast max_points must be at least 2".to_string());
        }

        let l = &self.levels;
        let bounds = [100.0, l.normal, l.mild, l.moderate, 0.0];
        if bounds.iter().any(|b| !b.is_finite()) {
            return invalid("level thresholds must be finite".to_string());
        }
        if !bounds.windows(2).all(|w| w[0] > w[1]) {
            return invalid(format!(
                "level thresholds must satisfy 100 > normal > mild > moderate > 0 (got {} / {} / {})",
                l.normal, l.mild, l.moderate
            ));
        }
        let narrowest = bounds
            .windows(2)
            .map(|w| w[0] - w[1])
            .fold(f64::INFINITY, f64::min);
        if !(l.hysteresis.is_finite() && l.hysteresis >= 0.0 && l.hysteresis < narrowest / 2.0) {
            return invalid(format!(
                "hysteresis must be >= 0 and below half the narrowest band ({:.1}), got {}",
                narrowest / 2.0,
                l.hysteresis
            ));
        }

        let i = &self.intervention;
        for (name, v) in [
            ("visual_cooldown_secs", i.visual_cooldown_secs),
            ("voice_cooldown_secs", i.voice_cooldown_secs),
        ] {
            if !(v.is_finite() && (0.0..=MAX_WINDOW_SECS).contains(&v)) {
                return invalid(format!("{} must be in [0, {}] (got {})", name, MAX_WINDOW_SECS, v));
            }
        }
        if !(i.speed_threshold_high.is_finite() && i.speed_threshold_high >= 0.0) {
            return invalid(format!(
                "speed_threshold_high must be finite and >= 0 (got {})",
                i.speed_threshold_high
            ));
        }

        let c = &self.context;
        for (name, v) in [
            ("night_drowsiness_gain", c.night_drowsiness_gain),
            ("highway_distraction_gain", c.highway_distraction_gain),
            ("vibration_accel_threshold", c.vibration_accel_threshold),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return invalid(format!("{} must be finite and >= 0 (got {})", name, v));
            }
        }
        if !(c.vibration_distraction_offset.is_finite() && c.vibration_distraction_offset.abs() <= 1.0) {
            return invalid("vibration_distraction_offset must be within [-1, 1]".to_string());
        }

        Ok(())
    }
}

/// JSON persistence of `FusionConfig` for the CLI.
pub struct ConfigStore;

impl ConfigStore {
    /// Load from the user config directory; a missing file yields defaults.
    pub fn load() -> Result<FusionConfig> {
        let path = Self::get_config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<FusionConfig> {
        if !path.exists() {
            return Ok(FusionConfig::default());
        }

        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if data.trim().is_empty() {
            return Ok(FusionConfig::default());
        }

        let config = FusionConfig::from_json_str(&data)
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        Ok(config)
    }

    pub fn save(config: &FusionConfig) -> Result<PathBuf> {
        let path = Self::get_config_path()?;
        Self::save_to(config, &path)?;
        Ok(path)
    }

    pub fn save_to(config: &FusionConfig, path: &Path) -> Result<()> {
        config
            .validate()
            .with_context(|| "Refusing to save an invalid config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = config
            .to_json_pretty()
            .with_context(|| "Failed to serialize config")?;

        fs::write(path, data).with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("vigil").join("config.json"))
    }
}
