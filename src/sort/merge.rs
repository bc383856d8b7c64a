//! Stable merge sort with a concurrent divide step.

use std::cmp::Ordering;

use super::{binary_insertion_sort, Keyed, SortOrder, INSERTION_THRESHOLD, MAX_PARALLEL_DEPTH};

// == Merge Sort ==
/// Sorts `data` and returns it.
///
/// Stable: records with equal keys keep their input order. Halves are sorted
/// concurrently with `rayon::join` down to `MAX_PARALLEL_DEPTH`; runs shorter
/// than `INSERTION_THRESHOLD` use binary insertion sort.
pub fn merge_sort<T: Keyed + Send>(data: Vec<T>, order: SortOrder) -> Vec<T> {
    merge_sort_at_depth(data, order, 0)
}

fn merge_sort_at_depth<T: Keyed + Send>(mut data: Vec<T>, order: SortOrder, depth: usize) -> Vec<T> {
    if data.len() < INSERTION_THRESHOLD {
        binary_insertion_sort(&mut data, order);
        return data;
    }

    let right = data.split_off(data.len() / 2);
    let (left, right) = if depth < MAX_PARALLEL_DEPTH {
        rayon::join(
            || merge_sort_at_depth(data, order, depth + 1),
            || merge_sort_at_depth(right, order, depth + 1),
        )
    } else {
        (
            merge_sort_at_depth(data, order, depth + 1),
            merge_sort_at_depth(right, order, depth + 1),
        )
    };
    merge(left, right, order)
}

fn merge<T: Keyed>(left: Vec<T>, right: Vec<T>, order: SortOrder) -> Vec<T> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => order.compare(r.sort_key(), l.sort_key()) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        if let Some(item) = next {
            merged.push(item);
        }
    }
    merged
}
