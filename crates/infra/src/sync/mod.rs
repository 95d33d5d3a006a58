//! Upload transport
//!
//! - [`IngestClient`]: reqwest-backed [`IngestTransport`](outpost_core::IngestTransport)
//! - [`SyncError`]: classified request failures

mod errors;
pub mod ingest_client;

pub use errors::SyncError;
pub use ingest_client::{IngestClient, IngestClientConfig};
