// Core business logic module

pub mod alertness;
pub mod config;
pub mod scenario;

// Re-export commonly used items
pub use config::{ConfigStore, FusionConfig};
pub use scenario::{replay_offline, ReplayReport, Scenario};
