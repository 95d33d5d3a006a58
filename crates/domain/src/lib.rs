//! # Outpost Domain
//!
//! Domain types shared by every Outpost crate.
//!
//! This crate contains:
//! - Queue, health and ingest wire types
//! - The error taxonomy (`OutpostError`, `CollectionError`) and `Result`
//! - Configuration structures with serde defaults
//! - Tuning constants
//!
//! ## Architecture
//! - No dependencies on other Outpost crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
