//! Ordered Store Module
//!
//! The secondary structure that keeps a table's rows in sort order for range
//! reads and pagination.

use crate::config::CacheKind;
use crate::sort::{Collation, SortMode, SortOrder};

use super::entry::{OrderedEntry, SharedRow};
use super::linked::LinkedList;
use super::sorted_slice::SortedSlice;
use super::tombstone::TombstoneSlice;

/// How a table's ordered structure is arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderLayout {
    /// Direction from the ORDER BY clause; `None` when the table has none
    pub mode: Option<SortMode>,
    /// True when the sort column is the primary key, so lookups can binary search
    pub keyed_by_pkey: bool,
    /// Numeric for sort columns the store declares numeric
    pub collation: Collation,
}

impl OrderLayout {
    /// The configured order, if the table has one.
    pub fn order(&self) -> Option<SortOrder> {
        self.mode.map(|mode| SortOrder::new(mode, self.collation))
    }

    /// The configured order, ascending when the table has none.
    pub fn order_or_default(&self) -> SortOrder {
        SortOrder::new(self.mode.unwrap_or_default(), self.collation)
    }
}

// == Ordered Store Trait ==
/// A sequence of entries kept in sort order.
///
/// Positions are zero-based over live entries unless a variant says otherwise.
pub trait OrderedStore: Send + Sync {
    fn kind(&self) -> CacheKind;

    /// Places an entry according to the store's ordering rule.
    fn insert(&mut self, entry: OrderedEntry);

    /// Removes the entry for `pkey`. Returns false when absent.
    fn delete(&mut self, pkey: &str) -> bool;

    /// Position of the live entry for `pkey`.
    fn locate(&self, pkey: &str) -> Option<usize>;

    /// Rows at positions `[start, end)`, clamped to the live length.
    fn range_between(&self, start: usize, end: usize) -> Vec<SharedRow>;

    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots including tombstones.
    fn raw_len(&self) -> usize {
        self.len()
    }

    fn tombstones(&self) -> usize {
        0
    }

    /// Replaces the contents with `entries` and sorts them. Also used to
    /// compact away tombstones.
    fn load(&mut self, entries: Vec<OrderedEntry>);
}

/// Builds an empty ordered store of the given kind.
pub fn new_ordered_store(kind: CacheKind, layout: OrderLayout) -> Box<dyn OrderedStore> {
    match kind {
        CacheKind::SortedSlice => Box::new(SortedSlice::new(layout)),
        CacheKind::TombstoneSlice => Box::new(TombstoneSlice::new(layout)),
        CacheKind::LinkedList => Box::new(LinkedList::new(layout)),
    }
}

/// Clamps `[start, end)` into `[0, len]` with `start <= end`.
pub(crate) fn clamp_range(start: usize, end: usize, len: usize) -> (usize, usize) {
    let end = end.min(len);
    (start.min(end), end)
}
