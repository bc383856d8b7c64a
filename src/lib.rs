//! Rowcache - an in-process cache of relational tables
//!
//! Loads configured tables from a SQL store into memory, serves reads from
//! a primary-key index plus an optional ordered structure, and writes back
//! either synchronously or through a journaled write-behind queue.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod queue;
pub mod sort;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheEngine, Registry};
pub use config::{CacheKind, Config, TableConfig};
pub use error::CacheError;
pub use store::{SqliteStore, Store};
pub use tasks::spawn_compaction_task;
