//! Driver alertness fusion core.
//!
//! Producers push per-modality `Signal`s into a `SignalHub`. A single
//! tick executor fuses them, smooths and forecasts the score, classifies
//! it into an `AlertLevel` and dispatches rate-limited interventions.
//! Every tick publishes an immutable `AlertnessState`.

pub mod adapters;
pub mod classifier;
pub mod dispatcher;
pub mod fusion;
pub mod history;
pub mod hub;
pub mod pipeline;
pub mod publisher;
pub mod runtime;
pub mod signal;
pub mod smoother;
pub mod state;
pub mod stats;
pub mod tasks;

pub use adapters::{
    EyeObservation, EyeStateAdapter, HeadPose, HeadPoseAdapter, SignalAdapter, VoiceCueAdapter,
    VoiceFeatures,
};
pub use classifier::{next_level, AlertClassifier, AlertLevel};
pub use dispatcher::{select_channel, Channel, InterventionAction, InterventionDispatcher, InterventionEvent};
pub use fusion::{fuse_modalities, risk_to_score, DataQuality, FusionCore, FusionOutput, ModalityState};
pub use history::{fit_line, ScoreHistory, Trend, TrendDirection, TrendForecaster};
pub use hub::SignalHub;
pub use pipeline::{AlertnessPipeline, TickOutcome};
pub use publisher::StatePublisher;
pub use runtime::AlertnessRuntime;
pub use signal::{DriveContext, Signal, SignalKind, SignalOrigin, MAX_CLOCK_SKEW_MS};
pub use smoother::TemporalSmoother;
pub use state::{AlertnessState, SignalSnapshot};
pub use stats::SessionStats;
