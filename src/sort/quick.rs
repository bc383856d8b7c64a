//! Hybrid quicksort with binary insertion sort for short runs.

use std::cmp::Ordering;

use rand::Rng;

use super::{insert_position, Keyed, SortOrder, INSERTION_THRESHOLD, MAX_PARALLEL_DEPTH};

// == Binary Insertion Sort ==
/// Sorts `data` in place by inserting each element at the position found by
/// binary search over the already sorted prefix.
///
/// Stable: an element is placed after every equal key before it.
pub fn binary_insertion_sort<T: Keyed>(data: &mut [T], order: SortOrder) {
    for i in 1..data.len() {
        let position = insert_position(&data[..i], data[i].sort_key(), order);
        if position < i {
            data[position..=i].rotate_right(1);
        }
    }
}

// == Quick Sort ==
/// Sorts `data` in place.
///
/// Short sequences use [`binary_insertion_sort`]. Longer ones are split with a
/// random pivot into less / equal / greater partitions, and the two outer
/// partitions are sorted concurrently with `rayon::join` until
/// `MAX_PARALLEL_DEPTH` is reached.
pub fn quick_sort<T: Keyed + Send>(data: &mut [T], order: SortOrder) {
    quick_sort_at_depth(data, order, 0);
}

fn quick_sort_at_depth<T: Keyed + Send>(data: &mut [T], order: SortOrder, depth: usize) {
    if data.len() < INSERTION_THRESHOLD {
        binary_insertion_sort(data, order);
        return;
    }

    let (lt, gt) = partition(data, order);
    let (less, rest) = data.split_at_mut(lt);
    let greater = &mut rest[gt - lt..];

    if depth < MAX_PARALLEL_DEPTH {
        rayon::join(
            || quick_sort_at_depth(less, order, depth + 1),
            || quick_sort_at_depth(greater, order, depth + 1),
        );
    } else {
        quick_sort_at_depth(less, order, depth + 1);
        quick_sort_at_depth(greater, order, depth + 1);
    }
}

/// Three-way partition around a randomly chosen pivot.
///
/// Returns `(lt, gt)` such that `data[..lt]` sorts before the pivot,
/// `data[lt..gt]` equals it and `data[gt..]` sorts after it.
fn partition<T: Keyed>(data: &mut [T], order: SortOrder) -> (usize, usize) {
    let pivot = rand::thread_rng().gen_range(0..data.len());
    data.swap(0, pivot);

    let mut lt = 0;
    let mut gt = data.len();
    let mut i = 1;

    while i < gt {
        match order.compare(data[i].sort_key(), data[0].sort_key()) {
            Ordering::Less => {
                data.swap(i, lt + 1);
                lt += 1;
                i += 1;
            }
            Ordering::Greater => {
                gt -= 1;
                data.swap(i, gt);
            }
            Ordering::Equal => i += 1,
        }
    }
    data.swap(0, lt);
    (lt, gt)
}
