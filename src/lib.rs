// Vigil Library - Public API

// Re-export error types
pub mod error;
pub use error::{Result, VigilError};

// Module declarations
pub mod commands;
pub mod core;
pub mod ui;

// Re-export commonly used types
pub use crate::core::alertness::{AlertLevel, AlertnessRuntime, AlertnessState, Signal, SignalKind};
pub use crate::core::config::FusionConfig;

// Initialize logging
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
