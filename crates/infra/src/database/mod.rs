//! Database implementations

pub mod manager;
pub mod queue_repository;
pub mod sqlcipher_pool;

pub use manager::DbManager;
pub use queue_repository::SqlCipherQueueRepository;
pub use sqlcipher_pool::create_sqlcipher_pool;
