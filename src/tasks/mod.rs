//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Tombstone compaction: rebuilds tombstoned ordered structures inside a
//!   configured window of local hours

mod compaction;

pub use compaction::spawn_compaction_task;
