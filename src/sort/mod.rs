//! Sort Engine Module
//!
//! Hybrid quicksort / binary insertion sort, a concurrent merge sort and the
//! binary searches used to keep ordered row structures correct.
//!
//! Every routine works on records exposing a string sort key through
//! [`Keyed`] and takes a [`SortOrder`]: a direction plus a [`Collation`]
//! deciding whether keys compare as text or as numbers.

mod merge;
mod quick;
mod search;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

pub use merge::merge_sort;
pub use quick::{binary_insertion_sort, quick_sort};
pub use search::{binary_search, insert_position};

// == Public Constants ==
/// Sequences shorter than this are sorted with binary insertion sort.
pub const INSERTION_THRESHOLD: usize = 32;

/// Recursion depth below which partitions are sorted concurrently.
///
/// Deeper levels recurse on the current worker, which bounds the number of
/// concurrently scheduled tasks to roughly `2^MAX_PARALLEL_DEPTH`.
pub const MAX_PARALLEL_DEPTH: usize = 8;

// == Sort Mode ==
/// Direction of an ordered structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Smallest key first
    #[default]
    Asc,
    /// Largest key first
    Desc,
}

impl SortMode {
    /// Compares two keys in this mode: `Less` means `a` comes first.
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            SortMode::Asc => a.cmp(b),
            SortMode::Desc => b.cmp(a),
        }
    }
}

// == Collation ==
/// How two sort keys compare before the direction is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Collation {
    /// Byte-wise string order
    #[default]
    Text,
    /// Numeric order for keys that parse as finite numbers.
    ///
    /// Keys that do not parse (NULL, empty) sort before every number and
    /// compare as text among themselves. Numerically equal keys fall back to
    /// text order so the ordering stays total.
    Numeric,
}

impl Collation {
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            Collation::Text => a.cmp(b),
            Collation::Numeric => match (numeric_value(a), numeric_value(b)) {
                (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => a.cmp(b),
            },
        }
    }
}

fn numeric_value(key: &str) -> Option<f64> {
    key.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// == Sort Order ==
/// Direction and collation of an ordered structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortOrder {
    pub mode: SortMode,
    pub collation: Collation,
}

impl SortOrder {
    pub fn new(mode: SortMode, collation: Collation) -> Self {
        Self { mode, collation }
    }

    /// Compares two keys: `Less` means `a` comes first.
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        let ordering = self.collation.compare(a, b);
        match self.mode {
            SortMode::Asc => ordering,
            SortMode::Desc => ordering.reverse(),
        }
    }
}

impl From<SortMode> for SortOrder {
    fn from(mode: SortMode) -> Self {
        Self::new(mode, Collation::Text)
    }
}

// == Keyed Trait ==
/// A lightweight record carrying a sort key.
pub trait Keyed {
    fn sort_key(&self) -> &str;
}

impl Keyed for String {
    fn sort_key(&self) -> &str {
        self.as_str()
    }
}

impl Keyed for &str {
    fn sort_key(&self) -> &str {
        self
    }
}

/// Returns true if every adjacent pair respects `order`.
pub fn is_sorted<T: Keyed>(data: &[T], order: SortOrder) -> bool {
    data.windows(2)
        .all(|pair| order.compare(pair[0].sort_key(), pair[1].sort_key()) != Ordering::Greater)
}
