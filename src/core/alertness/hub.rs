//! Producer-facing input slots.
//!
//! Producers never touch the pipeline. They overwrite one slot per
//! modality (latest wins) and the tick executor copies the slots out at
//! the start of each tick, so a slow producer can never stall a tick.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::signal::{DriveContext, Signal, SignalKind, SignalOrigin};

#[derive(Debug, Default)]
struct Slots {
    signals: [Option<Signal>; SignalKind::COUNT],
    context: DriveContext,
    accepted: u64,
    rejected: u64,
}

/// Cheaply cloneable handle shared by all producers.
#[derive(Debug, Clone, Default)]
pub struct SignalHub {
    inner: Arc<Mutex<Slots>>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a raw reading. A non-finite value is rejected and logged;
    /// out-of-range values are clamped.
    pub fn submit_signal(
        &self,
        kind: SignalKind,
        value: f64,
        confidence: f64,
        timestamp: DateTime<Utc>,
        origin: SignalOrigin,
    ) -> bool {
        if !value.is_finite() || !confidence.is_finite() {
            log::warn!("Rejected non-finite {} signal (value={}, confidence={})", kind, value, confidence);
            self.inner.lock().rejected += 1;
            return false;
        }
        self.submit(Signal::new(kind, value, confidence, timestamp, origin))
    }

    /// Store an already built signal. Returns false when a newer signal of
    /// the same modality is already waiting.
    ///
    /// Timestamps ahead of the wall clock are bounded first, so a producer
    /// with a runaway clock cannot lock later readings out of its slot.
    pub fn submit(&self, signal: Signal) -> bool {
        self.submit_at(signal, Utc::now())
    }

    /// `submit` against an explicit clock.
    pub fn submit_at(&self, mut signal: Signal, now: DateTime<Utc>) -> bool {
        if signal.bound_to_clock(now) {
            log::warn!("{} signal timestamp is ahead of the clock; clamped to {}", signal.kind, signal.timestamp);
        }
        let mut slots = self.inner.lock();
        let slot = &mut slots.signals[signal.kind.index()];
        if slot.is_some_and(|held| held.timestamp > signal.timestamp) {
            slots.rejected += 1;
            return false;
        }
        *slot = Some(signal);
        slots.accepted += 1;
        true
    }

    pub fn submit_context(&self, context: DriveContext) {
        self.inner.lock().context = context;
    }

    /// Copy of the current slots and context.
    pub fn snapshot(&self) -> ([Option<Signal>; SignalKind::COUNT], DriveContext) {
        let slots = self.inner.lock();
        (slots.signals, slots.context)
    }

    pub fn latest(&self, kind: SignalKind) -> Option<Signal> {
        self.inner.lock().signals[kind.index()]
    }

    pub fn context(&self) -> DriveContext {
        self.inner.lock().context
    }

    /// (accepted, rejected) submission counters.
    pub fn counters(&self) -> (u64, u64) {
        let slots = self.inner.lock();
        (slots.accepted, slots.rejected)
    }
}
