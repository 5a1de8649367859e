use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};

use crate::core::alertness::hub::SignalHub;
use crate::core::alertness::pipeline::AlertnessPipeline;
use crate::core::alertness::publisher::StatePublisher;
use crate::core::alertness::stats::SessionStats;
use crate::core::config::FusionConfig;

fn ticker_for(config: &FusionConfig) -> Interval {
    let mut ticker = interval(Duration::from_millis(config.tick_interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Fixed-rate tick executor.
///
/// A pending config is picked up at the start of a tick, never halfway
/// through one. On shutdown the last state is republished flagged
/// `shutting_down` and the session statistics are returned.
pub async fn tick_task(
    hub: SignalHub,
    publisher: Arc<StatePublisher>,
    mut config_rx: watch::Receiver<Arc<FusionConfig>>,
    mut shutdown: broadcast::Receiver<()>,
) -> SessionStats {
    let mut config = Arc::clone(&config_rx.borrow_and_update());
    let mut pipeline = AlertnessPipeline::new(Arc::clone(&config));
    let mut ticker = ticker_for(&config);

    log::info!("Tick executor started ({} ms)", config.tick_interval_ms);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if config_rx.has_changed().unwrap_or(false) {
                    let next = Arc::clone(&config_rx.borrow_and_update());
                    if next.tick_interval_ms != config.tick_interval_ms {
                        ticker = ticker_for(&next);
                    }
                    pipeline.apply_config(Arc::clone(&next));
                    config = next;
                }

                let (signals, ctx) = hub.snapshot();
                for signal in signals.into_iter().flatten() {
                    pipeline.ingest(signal);
                }

                let outcome = pipeline.tick(Utc::now(), &ctx);
                publisher.publish(outcome.state);
                if let Some(event) = outcome.intervention {
                    publisher.publish_intervention(event);
                }
            }
            _ = shutdown.recv() => {
                publisher.publish(pipeline.shutdown_state(Utc::now()));
                log::info!("Tick executor stopped after {} ticks", pipeline.ticks());
                break;
            }
        }
    }

    pipeline.into_stats()
}
