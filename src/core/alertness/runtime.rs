//! Tokio runtime hosting the tick executor and producer tasks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::dispatcher::InterventionEvent;
use super::hub::SignalHub;
use super::publisher::StatePublisher;
use super::signal::{DriveContext, SignalKind, SignalOrigin};
use super::state::AlertnessState;
use super::stats::SessionStats;
use super::tasks::{replay_producer_task, tick_task};
use crate::core::config::FusionConfig;
use crate::core::scenario::ScenarioEvent;
use crate::error::VigilError;

/// Owns the runtime, the shared input hub and the output channels.
///
/// Must be created and shut down from synchronous code: `shutdown` blocks
/// on the tick executor.
pub struct AlertnessRuntime {
    hub: SignalHub,
    publisher: Arc<StatePublisher>,
    config_tx: watch::Sender<Arc<FusionConfig>>,
    shutdown_tx: broadcast::Sender<()>,
    tick_handle: Option<JoinHandle<SessionStats>>,
    producers: Vec<JoinHandle<()>>,
    runtime: tokio::runtime::Runtime,
}

impl AlertnessRuntime {
    pub fn new(config: FusionConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("vigil-worker")
            .build()?;

        let hub = SignalHub::new();
        let publisher = Arc::new(StatePublisher::new(AlertnessState::initial(Utc::now())));
        let (config_tx, config_rx) = watch::channel(Arc::new(config));
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let tick_handle = runtime.spawn(tick_task(
            hub.clone(),
            Arc::clone(&publisher),
            config_rx,
            shutdown_tx.subscribe(),
        ));

        log::info!("Alertness runtime started");

        Ok(Self {
            hub,
            publisher,
            config_tx,
            shutdown_tx,
            tick_handle: Some(tick_handle),
            producers: Vec::new(),
            runtime,
        })
    }

    /// Input handle for producers running outside the runtime.
    pub fn hub(&self) -> SignalHub {
        self.hub.clone()
    }

    pub fn submit_signal(
        &self,
        kind: SignalKind,
        value: f64,
        confidence: f64,
        timestamp: DateTime<Utc>,
        origin: SignalOrigin,
    ) -> bool {
        self.hub.submit_signal(kind, value, confidence, timestamp, origin)
    }

    pub fn submit_context(&self, context: DriveContext) {
        self.hub.submit_context(context);
    }

    /// Validate and swap the configuration. Takes effect on the next tick;
    /// an invalid config leaves the running one untouched.
    pub fn update_config(&self, config: FusionConfig) -> crate::Result<()> {
        if let Err(e) = config.validate() {
            log::warn!("Rejected configuration update: {}", e);
            return Err(e);
        }
        self.config_tx.send_replace(Arc::new(config));
        Ok(())
    }

    pub fn current_config(&self) -> Arc<FusionConfig> {
        Arc::clone(&self.config_tx.borrow())
    }

    pub fn get_current_state(&self) -> Arc<AlertnessState> {
        self.publisher.get_current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AlertnessState>> {
        self.publisher.subscribe()
    }

    pub fn subscribe_interventions(&self) -> broadcast::Receiver<InterventionEvent> {
        self.publisher.subscribe_interventions()
    }

    pub fn on_state<F>(&self, callback: F)
    where
        F: Fn(&AlertnessState) + Send + Sync + 'static,
    {
        self.publisher.on_state(callback);
    }

    pub fn on_intervention<F>(&self, callback: F)
    where
        F: Fn(&InterventionEvent) + Send + Sync + 'static,
    {
        self.publisher.on_intervention(callback);
    }

    /// Spawn a producer replaying `events` from now on.
    pub fn spawn_replay_producer(&mut self, name: impl Into<String>, events: Vec<ScenarioEvent>) {
        let started = tokio::time::Instant::now();
        let handle = self.runtime.spawn(replay_producer_task(
            name.into(),
            events,
            self.hub.clone(),
            started,
            self.shutdown_tx.subscribe(),
        ));
        self.producers.push(handle);
    }

    /// True once every spawned producer ran out of events.
    pub fn producers_finished(&self) -> bool {
        self.producers.iter().all(|h| h.is_finished())
    }

    /// Stop all tasks, publish the final snapshot and return the session
    /// statistics.
    pub fn shutdown(mut self) -> crate::Result<SessionStats> {
        log::info!("Shutting down alertness runtime");
        // only fails when every task already exited
        let _ = self.shutdown_tx.send(());

        let handle = self
            .tick_handle
            .take()
            .ok_or_else(|| VigilError::runtime("tick executor already stopped"))?;

        let stats = self
            .runtime
            .block_on(handle)
            .map_err(|e| VigilError::runtime(format!("tick executor failed: {}", e)))?;

        for producer in self.producers.drain(..) {
            let _ = self.runtime.block_on(producer);
        }

        Ok(stats)
    }
}
