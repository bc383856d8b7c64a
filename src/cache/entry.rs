//! Cache Entry Module
//!
//! Row representation shared by the primary index and the ordered structures.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::sort::{Keyed, SortMode};

/// Column name to value. Database NULL is stored as [`NULL_SENTINEL`].
pub type Row = HashMap<String, String>;

/// A row owned by the primary index and referenced by ordered entries.
pub type SharedRow = Arc<RwLock<Row>>;

/// Text standing in for a database NULL.
///
/// A column whose real value is the text `NULL` reads back the same way; the
/// two are not told apart.
pub const NULL_SENTINEL: &str = "NULL";

/// Wraps a row for sharing.
pub fn share(row: Row) -> SharedRow {
    Arc::new(RwLock::new(row))
}

/// Copies the current contents of a shared row.
pub fn snapshot(row: &SharedRow) -> Row {
    row.read().clone()
}

// == Ordered Entry ==
/// One row's position record inside an ordered structure.
#[derive(Debug, Clone)]
pub struct OrderedEntry {
    pub pkey: String,
    /// Value of the sort column when the entry was placed
    pub sort_key: String,
    pub mode: SortMode,
    pub row: SharedRow,
}

impl OrderedEntry {
    pub fn new(pkey: impl Into<String>, sort_key: impl Into<String>, mode: SortMode, row: SharedRow) -> Self {
        Self {
            pkey: pkey.into(),
            sort_key: sort_key.into(),
            mode,
            row,
        }
    }
}

impl Keyed for OrderedEntry {
    fn sort_key(&self) -> &str {
        &self.sort_key
    }
}
