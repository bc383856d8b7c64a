//! Cache Module
//!
//! Per-table caches: a primary index, an optional ordered structure for
//! ranges and pages, predicate scans and the write path to the store.

mod condition;
mod engine;
mod entry;
mod linked;
mod ordered;
mod registry;
mod sorted_slice;
mod stats;
mod tombstone;

pub mod sql;


// Re-export public types
pub use condition::{parse_assignments, Combinator, Comparison, Operator, Predicate};
pub use engine::CacheEngine;
pub use entry::{share, snapshot, OrderedEntry, Row, SharedRow, NULL_SENTINEL};
pub use linked::LinkedList;
pub use ordered::{new_ordered_store, OrderLayout, OrderedStore};
pub use registry::Registry;
pub use sorted_slice::SortedSlice;
pub use stats::CacheStats;
pub use tombstone::TombstoneSlice;
