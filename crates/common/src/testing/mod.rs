//! Test helpers for crates building on the storage tier.

pub mod database;

pub use database::{SqlCipherTestDatabase, TEST_ENCRYPTION_KEY};
