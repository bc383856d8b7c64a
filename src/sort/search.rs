//! Binary searches over sorted keyed sequences.

use std::cmp::Ordering;

use super::{Keyed, SortOrder};

// == Binary Search ==
/// Finds the position of an exact key match in a sequence already sorted in
/// `order`.
///
/// Returns `None` when the key is absent. With duplicate keys any matching
/// position may be returned.
pub fn binary_search<T: Keyed>(data: &[T], key: &str, order: SortOrder) -> Option<usize> {
    let mut low = 0usize;
    let mut high = data.len();

    while low < high {
        let mid = low + (high - low) / 2;
        match order.compare(data[mid].sort_key(), key) {
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
            Ordering::Equal => return Some(mid),
        }
    }
    None
}

// == Insert Position ==
/// Computes where `key` must be inserted to keep `data` sorted in `order`.
///
/// The result is an upper bound: a new key lands after every existing equal
/// key, so ties stay adjacent and keep their arrival order.
pub fn insert_position<T: Keyed>(data: &[T], key: &str, order: SortOrder) -> usize {
    locate_insert(data, key, order, 0, data.len())
}

fn locate_insert<T: Keyed>(data: &[T], key: &str, order: SortOrder, low: usize, high: usize) -> usize {
    if low >= high {
        return low;
    }
    let mid = low + (high - low) / 2;
    if order.compare(data[mid].sort_key(), key) == Ordering::Greater {
        locate_insert(data, key, order, low, mid)
    } else {
        locate_insert(data, key, order, mid + 1, high)
    }
}
