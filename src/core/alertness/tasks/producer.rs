use tokio::sync::broadcast;
use tokio::time::{sleep_until, Duration, Instant};

use crate::core::alertness::hub::SignalHub;
use crate::core::scenario::{EventPayload, ObservationAdapters, ScenarioEvent, MAX_SCENARIO_MS};

/// Replays timed events into the hub relative to `started`.
///
/// Signals are stamped with the wall clock at submission, the way a live
/// sensor would stamp them. Returns early on shutdown.
pub async fn replay_producer_task(
    name: String,
    events: Vec<ScenarioEvent>,
    hub: SignalHub,
    started: Instant,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut adapters = ObservationAdapters::new();
    log::debug!("Producer {} started with {} events", name, events.len());

    for event in events {
        if event.at_ms > MAX_SCENARIO_MS {
            log::warn!("Producer {} skipping event at {} ms (past the scenario limit)", name, event.at_ms);
            continue;
        }
        let due = started + Duration::from_millis(event.at_ms);
        tokio::select! {
            _ = sleep_until(due) => {}
            _ = shutdown.recv() => {
                log::debug!("Producer {} shutting down", name);
                return;
            }
        }

        match &event.payload {
            EventPayload::Context(ctx) => hub.submit_context(*ctx),
            payload => {
                if let Some(signal) = adapters.to_signal(payload, chrono::Utc::now()) {
                    hub.submit(signal);
                }
            }
        }
    }

    log::debug!("Producer {} finished", name);
}
