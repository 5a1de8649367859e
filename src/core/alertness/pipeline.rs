//! Single-writer tick executor.
//!
//! One `tick` runs the full chain: fuse, smooth, forecast, classify,
//! dispatch. Every stage reads the same configuration snapshot; a new
//! config is applied between ticks only.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::classifier::AlertClassifier;
use super::dispatcher::{InterventionDispatcher, InterventionEvent};
use super::fusion::FusionCore;
use super::history::TrendForecaster;
use super::signal::{DriveContext, Signal};
use super::smoother::TemporalSmoother;
use super::state::{signal_snapshots, AlertnessState};
use super::stats::SessionStats;
use crate::core::config::FusionConfig;

#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub state: AlertnessState,
    pub intervention: Option<InterventionEvent>,
}

pub struct AlertnessPipeline {
    config: Arc<FusionConfig>,
    fusion: FusionCore,
    smoother: TemporalSmoother,
    forecaster: TrendForecaster,
    classifier: AlertClassifier,
    dispatcher: InterventionDispatcher,
    stats: SessionStats,
    last_state: AlertnessState,
    tick: u64,
}

impl AlertnessPipeline {
    /// `config` is expected to be validated already.
    pub fn new(config: Arc<FusionConfig>) -> Self {
        Self {
            fusion: FusionCore::new(),
            smoother: TemporalSmoother::new(config.effective_alpha()),
            forecaster: TrendForecaster::new(&config.forecast),
            classifier: AlertClassifier::new(),
            dispatcher: InterventionDispatcher::new(),
            stats: SessionStats::new(),
            last_state: AlertnessState::initial(Utc::now()),
            tick: 0,
            config,
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Swap in a new configuration. Smoothing memory, history and the
    /// current level survive the swap.
    pub fn apply_config(&mut self, config: Arc<FusionConfig>) {
        self.smoother.set_alpha(config.effective_alpha());
        self.forecaster.reconfigure(&config.forecast);
        self.config = config;
        log::info!("Applied new fusion configuration");
    }

    pub fn ingest(&mut self, signal: Signal) {
        self.fusion.ingest(signal);
    }

    pub fn tick(&mut self, now: DateTime<Utc>, ctx: &DriveContext) -> TickOutcome {
        let config = Arc::clone(&self.config);
        self.tick += 1;

        let fused = self.fusion.fuse(now, ctx, &config);
        let degraded = fused.degraded();
        let smoothed = self.smoother.smooth(fused.raw_score);
        let trend = self.forecaster.update_and_forecast(now, smoothed);
        let level = self.classifier.classify(smoothed, degraded, &config.levels);
        let intervention = self.dispatcher.dispatch(level, ctx, now, &config.intervention);

        let state = AlertnessState {
            tick: self.tick,
            raw_score: fused.raw_score,
            smoothed_score: smoothed,
            level,
            trend,
            degraded,
            quality: fused.quality,
            signals: signal_snapshots(self.fusion.modalities(), &fused, now),
            context: *ctx,
            generated_at: now,
            shutting_down: false,
        };

        log::trace!(
            "tick {} raw={:.1} smoothed={:.1} level={} quality={:?}",
            state.tick,
            state.raw_score,
            state.smoothed_score,
            state.level,
            state.quality
        );

        self.stats.record(&state);
        if let Some(event) = &intervention {
            self.stats.record_intervention(event);
        }
        self.last_state = state.clone();

        TickOutcome { state, intervention }
    }

    pub fn last_state(&self) -> &AlertnessState {
        &self.last_state
    }

    /// Snapshot to publish once the executor stops.
    pub fn shutdown_state(&self, now: DateTime<Utc>) -> AlertnessState {
        self.last_state.clone().into_shutdown(now)
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn into_stats(self) -> SessionStats {
        self.stats
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }
}
