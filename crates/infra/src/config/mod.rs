//! Configuration loading and management
//!
//! This module provides utilities for loading application configuration
//! from environment variables and files, and a runtime provider the engine
//! reads on every cycle.

pub mod loader;
pub mod provider;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths, validate};
pub use provider::RuntimeConfigProvider;
