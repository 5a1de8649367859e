//! Fan-out of snapshots and interventions to readers.
//!
//! Snapshots go through a `watch` channel: readers always get the newest
//! complete state and never block the tick executor. Interventions are
//! discrete events, so they use a `broadcast` channel instead.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use super::dispatcher::InterventionEvent;
use super::state::AlertnessState;

const INTERVENTION_BUFFER: usize = 32;

pub type StateCallback = Box<dyn Fn(&AlertnessState) + Send + Sync>;
pub type InterventionCallback = Box<dyn Fn(&InterventionEvent) + Send + Sync>;

pub struct StatePublisher {
    state_tx: watch::Sender<Arc<AlertnessState>>,
    intervention_tx: broadcast::Sender<InterventionEvent>,
    state_callbacks: Mutex<Vec<StateCallback>>,
    intervention_callbacks: Mutex<Vec<InterventionCallback>>,
}

impl StatePublisher {
    pub fn new(initial: AlertnessState) -> Self {
        let (state_tx, _) = watch::channel(Arc::new(initial));
        let (intervention_tx, _) = broadcast::channel(INTERVENTION_BUFFER);
        Self {
            state_tx,
            intervention_tx,
            state_callbacks: Mutex::new(Vec::new()),
            intervention_callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Replace the current snapshot and notify callbacks.
    ///
    /// Callbacks run on the tick executor; they must not register further
    /// callbacks from inside the call.
    pub fn publish(&self, state: AlertnessState) -> Arc<AlertnessState> {
        let state = Arc::new(state);
        // send_replace stores the value even with no receivers attached
        self.state_tx.send_replace(Arc::clone(&state));
        for callback in self.state_callbacks.lock().iter() {
            callback(&state);
        }
        state
    }

    pub fn publish_intervention(&self, event: InterventionEvent) {
        for callback in self.intervention_callbacks.lock().iter() {
            callback(&event);
        }
        // only fails when nobody is listening
        let _ = self.intervention_tx.send(event);
    }

    pub fn get_current(&self) -> Arc<AlertnessState> {
        Arc::clone(&self.state_tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AlertnessState>> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_interventions(&self) -> broadcast::Receiver<InterventionEvent> {
        self.intervention_tx.subscribe()
    }

    pub fn on_state<F>(&self, callback: F)
    where
        F: Fn(&AlertnessState) + Send + Sync + 'static,
    {
        self.state_callbacks.lock().push(Box::new(callback));
    }

    pub fn on_intervention<F>(&self, callback: F)
    where
        F: Fn(&InterventionEvent) + Send + Sync + 'static,
    {
        self.intervention_callbacks.lock().push(Box::new(callback));
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new(AlertnessState::default())
    }
}
