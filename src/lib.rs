//! Reaper library
//!
//! Drives the notify, decommission and destroy lifecycle of fleet resources
//! and serves the renewal endpoint owners click to keep them alive.

pub mod actions;
pub mod config;
pub mod email;
pub mod hooks;
pub mod lifecycle;
pub mod renewal;
pub mod reporting;
pub mod scheduler;
pub mod search;
pub mod server;
pub mod users;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use config::{AppConfig, ConfigError, FileConfig};
pub use lifecycle::{Collaborators, LifecycleEvaluator};
pub use scheduler::BatchScheduler;
pub use server::{bind_listener, make_app, run_server, RequestsLoggingLevel};
