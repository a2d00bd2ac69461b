// wpacrack - multi-strategy WPA handshake cracking orchestrator
//
// This is the library crate: command assembly, process supervision, the strategy pipeline,
// and the job scheduler. The binary crate (main.rs) provides the command-line entry point.

pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod store;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{AttackRequest, Settings, TaskRecord};
pub use scheduler::{HashcatWorker, JobId};
pub use state::{ProgressChange, ProgressHandle, ProgressState};
pub use store::{TaskStore, YamlTaskStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
