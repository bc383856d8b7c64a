//! Ordered store that marks deletes instead of shifting entries.
//!
//! Deleted slots stay in place until the next compaction. Inserts append, so
//! only the prefix produced by the last load is guaranteed sorted.

use std::sync::Arc;

use crate::config::CacheKind;
use crate::sort::{binary_search, quick_sort, Keyed, SortOrder};

use super::entry::{OrderedEntry, SharedRow};
use super::ordered::{clamp_range, OrderLayout, OrderedStore};

struct Slot {
    entry: OrderedEntry,
    deleted: bool,
}

impl Keyed for Slot {
    fn sort_key(&self) -> &str {
        &self.entry.sort_key
    }
}

/// Append-only slots with delete markers.
///
/// `locate` returns a slot index; range positions count live entries only.
pub struct TombstoneSlice {
    slots: Vec<Slot>,
    /// Length of the prefix sorted by the last load
    sorted_len: usize,
    tombstones: usize,
    order: SortOrder,
    keyed_by_pkey: bool,
}

impl TombstoneSlice {
    pub fn new(layout: OrderLayout) -> Self {
        Self {
            slots: Vec::new(),
            sorted_len: 0,
            tombstones: 0,
            order: layout.order_or_default(),
            keyed_by_pkey: layout.keyed_by_pkey,
        }
    }

    fn is_live(&self, index: usize, pkey: &str) -> bool {
        let slot = &self.slots[index];
        !slot.deleted && slot.entry.pkey == pkey
    }

    fn live(&self) -> impl Iterator<Item = &OrderedEntry> + '_ {
        self.slots.iter().filter(|s| !s.deleted).map(|s| &s.entry)
    }
}

impl OrderedStore for TombstoneSlice {
    fn kind(&self) -> CacheKind {
        CacheKind::TombstoneSlice
    }

    fn insert(&mut self, entry: OrderedEntry) {
        self.slots.push(Slot {
            entry,
            deleted: false,
        });
    }

    fn delete(&mut self, pkey: &str) -> bool {
        match self.locate(pkey) {
            Some(index) => {
                self.slots[index].deleted = true;
                self.tombstones += 1;
                true
            }
            None => false,
        }
    }

    fn locate(&self, pkey: &str) -> Option<usize> {
        if self.keyed_by_pkey {
            let sorted = &self.slots[..self.sorted_len];
            if let Some(index) = binary_search(sorted, pkey, self.order) {
                if self.is_live(index, pkey) {
                    return Some(index);
                }
            }
            (self.sorted_len..self.slots.len()).find(|&i| self.is_live(i, pkey))
        } else {
            (0..self.slots.len()).find(|&i| self.is_live(i, pkey))
        }
    }

    fn range_between(&self, start: usize, end: usize) -> Vec<SharedRow> {
        let (start, end) = clamp_range(start, end, self.len());
        self.live()
            .skip(start)
            .take(end - start)
            .map(|e| Arc::clone(&e.row))
            .collect()
    }

    fn len(&self) -> usize {
        self.slots.len() - self.tombstones
    }

    fn raw_len(&self) -> usize {
        self.slots.len()
    }

    fn tombstones(&self) -> usize {
        self.tombstones
    }

    fn load(&mut self, entries: Vec<OrderedEntry>) {
        self.slots = entries
            .into_iter()
            .map(|entry| Slot {
                entry,
                deleted: false,
            })
            .collect();
        quick_sort(&mut self.slots, self.order);
        self.sorted_len = self.slots.len();
        self.tombstones = 0;
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

    fn keyed() -> TombstoneSlice {
        TombstoneSlice::new(OrderLayout {
            mode: Some(SortMode::Asc),
            keyed_by_pkey: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_delete_marks_slot() {
        let mut slice = keyed();
        slice.load(vec![entry("1", "1"), entry("2", "2"), entry("3", "3")]);

        assert!(slice.delete("2"));
        assert_eq!(slice.len(), 2);
        assert_eq!(slice.raw_len(), 3);
        assert_eq!(slice.tombstones(), 1);
        assert_eq!(slice.locate("2"), None);
        assert!(!slice.delete("2"));
    }

    #[test]
    fn test_insert_appends_to_tail() {
        let mut slice = keyed();
        slice.load(vec![entry("2", "2"), entry("4", "4")]);
        slice.insert(entry("1", "1"));

        assert_eq!(slice.locate("1"), Some(2));
        assert_eq!(slice.locate("4"), Some(1));
    }

    #[test]
    fn test_reinsert_after_delete_is_found_in_tail() {
        let mut slice = keyed();
        slice.load(vec![entry("1", "1"), entry("2", "2")]);
        slice.delete("1");
        slice.insert(entry("1", "1"));

        assert_eq!(slice.locate("1"), Some(2));
        assert_eq!(slice.len(), 2);
    }

    #[test]
    fn test_range_skips_tombstones() {
        let mut slice = keyed();
        slice.load(vec![entry("1", "1"), entry("2", "2"), entry("3", "3"), entry("4", "4")]);
        slice.delete("2");

        let rows = slice.range_between(0, 2);
        let ids: Vec<String> = rows.iter().map(|r| r.read()["id"].clone()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_reload_of_live_entries_restores_order() {
        let mut slice = keyed();
        slice.load(vec![entry("5", "5"), entry("3", "3")]);
        slice.insert(entry("1", "1"));
        slice.delete("3");

        let live: Vec<OrderedEntry> = slice.live().cloned().collect();
        slice.load(live);
        assert_eq!(slice.tombstones(), 0);
        assert_eq!(slice.raw_len(), 2);
        assert_eq!(slice.sorted_len, 2);
        let entries: Vec<&OrderedEntry> = slice.live().collect();
        let keys: Vec<&str> = entries.iter().map(|e| e.sort_key.as_str()).collect();
        assert_eq!(keys, vec!["1", "5"]);
        assert!(is_sorted(&slice.slots, SortMode::Asc.into()));
    }
}
