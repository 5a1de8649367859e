//! Async tasks driving the alertness core.
//!
//! The tick task is the only writer of pipeline state. Producer tasks
//! only write into the `SignalHub`.

mod producer;
mod tick;

pub use producer::replay_producer_task;
pub use tick::tick_task;
