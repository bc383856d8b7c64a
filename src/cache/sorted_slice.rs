//! Contiguous ordered store kept sorted on every insert.

use std::sync::Arc;

use crate::config::CacheKind;
use crate::sort::{binary_search, insert_position, merge_sort, SortOrder};

use super::entry::{OrderedEntry, SharedRow};
use super::ordered::{clamp_range, OrderLayout, OrderedStore};

/// Sorted `Vec` of entries. Deletes shift the tail left.
pub struct SortedSlice {
    entries: Vec<OrderedEntry>,
    order: SortOrder,
    keyed_by_pkey: bool,
}

impl SortedSlice {
    pub fn new(layout: OrderLayout) -> Self {
        Self {
            entries: Vec::new(),
            order: layout.order_or_default(),
            keyed_by_pkey: layout.keyed_by_pkey,
        }
    }
}

impl OrderedStore for SortedSlice {
    fn kind(&self) -> CacheKind {
        CacheKind::SortedSlice
    }

    fn insert(&mut self, entry: OrderedEntry) {
        let position = insert_position(&self.entries, &entry.sort_key, self.order);
        self.entries.insert(position, entry);
    }

    fn delete(&mut self, pkey: &str) -> bool {
        match self.locate(pkey) {
            Some(position) => {
                self.entries.remove(position);
                true
            }
            None => false,
        }
    }

    fn locate(&self, pkey: &str) -> Option<usize> {
        if self.keyed_by_pkey {
            binary_search(&self.entries, pkey, self.order).filter(|&i| self.entries[i].pkey == pkey)
        } else {
            self.entries.iter().position(|e| e.pkey == pkey)
        }
    }

    fn range_between(&self, start: usize, end: usize) -> Vec<SharedRow> {
        let (start, end) = clamp_range(start, end, self.entries.len());
        self.entries[start..end]
            .iter()
            .map(|e| Arc::clone(&e.row))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn load(&mut self, entries: Vec<OrderedEntry>) {
        self.entries = merge_sort(entries, self.order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::{share, Row};
    use crate::sort::{is_sorted, SortMode};

    fn entry(pkey: &str, key: &str) -> OrderedEntry {
        let row = share(Row::from([("id".to_string(), pkey.to_string())]));
        OrderedEntry::new(pkey, key, SortMode::Asc, row)
    }

    fn pkeys(slice: &SortedSlice) -> Vec<&str> {
        slice.entries.iter().map(|e| e.pkey.as_str()).collect()
    }

    #[test]
    fn test_insert_keeps_order_and_tie_arrival() {
        let mut slice = SortedSlice::new(OrderLayout {
            mode: Some(SortMode::Asc),
            keyed_by_pkey: false,
            ..Default::default()
        });
        slice.insert(entry("a", "20"));
        slice.insert(entry("b", "10"));
        slice.insert(entry("c", "20"));
        slice.insert(entry("d", "15"));

        assert_eq!(pkeys(&slice), vec!["b", "d", "a", "c"]);
        assert!(is_sorted(&slice.entries, SortMode::Asc.into()));
    }

    #[test]
    fn test_keyed_locate_uses_pkey_order() {
        let mut slice = SortedSlice::new(OrderLayout {
            mode: None,
            keyed_by_pkey: true,
            ..Default::default()
        });
        slice.load(vec![entry("3", "3"), entry("1", "1"), entry("2", "2")]);

        assert_eq!(slice.locate("1"), Some(0));
        assert_eq!(slice.locate("3"), Some(2));
        assert_eq!(slice.locate("4"), None);
    }

    #[test]
    fn test_unkeyed_locate_scans() {
        let mut slice = SortedSlice::new(OrderLayout {
            mode: Some(SortMode::Desc),
            keyed_by_pkey: false,
            ..Default::default()
        });
        slice.load(vec![entry("x", "1"), entry("y", "9")]);
        assert_eq!(slice.locate("x"), Some(1));
        assert_eq!(slice.locate("y"), Some(0));
    }

    #[test]
    fn test_delete_then_reinsert() {
        let mut slice = SortedSlice::new(OrderLayout {
            mode: Some(SortMode::Asc),
            keyed_by_pkey: false,
            ..Default::default()
        });
        slice.load(vec![entry("a", "1"), entry("b", "2"), entry("c", "3")]);
        assert!(slice.delete("a"));
        slice.insert(entry("a", "9"));
        assert_eq!(pkeys(&slice), vec!["b", "c", "a"]);
    }
}
