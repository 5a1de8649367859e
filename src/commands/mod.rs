// Command handlers module
pub mod config;
pub mod replay;
pub mod version;

// Re-exports for cleaner imports
pub use config::handle_config;
pub use replay::handle_replay;
pub use version::execute as version;
