//! # Outpost Agent
//!
//! Process layer of the collection-and-sync engine.
//!
//! This crate contains:
//! - Application context (dependency injection and worker lifecycle)
//! - Capture sources that ship with the agent
//! - Tracing setup for the binary
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires the hexagonal architecture; holds no business logic

pub mod context;
pub mod sources;
pub mod utils;

pub use context::AppContext;
