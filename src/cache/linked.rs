//! Doubly linked ordered store.
//!
//! Nodes live in an index arena; freed slots are reused by later inserts.
//! Without a sort order every insert appends at the tail in O(1).

use std::cmp::Ordering;
use std::iter;
use std::sync::Arc;

use crate::config::CacheKind;
use crate::sort::{merge_sort, SortOrder};

use super::entry::{OrderedEntry, SharedRow};
use super::ordered::{clamp_range, OrderLayout, OrderedStore};

struct Node {
    entry: OrderedEntry,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Linked list of entries with head and tail links.
pub struct LinkedList {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    order: Option<SortOrder>,
}

impl LinkedList {
    pub fn new(layout: OrderLayout) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            order: layout.order(),
        }
    }

    fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)?.as_ref()
    }

    fn node_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index)?.as_mut()
    }

    /// Walks from the head, yielding arena index and node.
    fn walk(&self) -> impl Iterator<Item = (usize, &Node)> + '_ {
        let first = self.head.and_then(|h| self.node(h).map(|n| (h, n)));
        iter::successors(first, move |(_, node)| {
            node.next.and_then(|i| self.node(i).map(|n| (i, n)))
        })
    }

    /// Links `entry` in front of `before`, or at the tail when `before` is `None`.
    fn attach(&mut self, entry: OrderedEntry, before: Option<usize>) {
        let prev = match before {
            Some(b) => self.node(b).and_then(|n| n.prev),
            None => self.tail,
        };
        let node = Node {
            entry,
            prev,
            next: before,
        };
        let index = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };

        match prev.and_then(|p| self.node_mut(p)) {
            Some(p) => p.next = Some(index),
            None => self.head = Some(index),
        }
        match before.and_then(|b| self.node_mut(b)) {
            Some(b) => b.prev = Some(index),
            None => self.tail = Some(index),
        }
        self.len += 1;
    }

    fn detach(&mut self, index: usize) -> Option<OrderedEntry> {
        let node = self.nodes.get_mut(index)?.take()?;

        match node.prev.and_then(|p| self.node_mut(p)) {
            Some(p) => p.next = node.next,
            None => self.head = node.next,
        }
        match node.next.and_then(|n| self.node_mut(n)) {
            Some(n) => n.prev = node.prev,
            None => self.tail = node.prev,
        }
        self.free.push(index);
        self.len -= 1;
        Some(node.entry)
    }

    /// Arena index and list position of the node holding `pkey`.
    fn find(&self, pkey: &str) -> Option<(usize, usize)> {
        self.walk()
            .enumerate()
            .find(|(_, (_, node))| node.entry.pkey == pkey)
            .map(|(position, (index, _))| (index, position))
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }
}

impl OrderedStore for LinkedList {
    fn kind(&self) -> CacheKind {
        CacheKind::LinkedList
    }

    fn insert(&mut self, entry: OrderedEntry) {
        let before = self.order.and_then(|order| {
            self.walk()
                .find(|(_, node)| order.compare(&node.entry.sort_key, &entry.sort_key) == Ordering::Greater)
                .map(|(index, _)| index)
        });
        self.attach(entry, before);
    }

    fn delete(&mut self, pkey: &str) -> bool {
        match self.find(pkey) {
            Some((index, _)) => self.detach(index).is_some(),
            None => false,
        }
    }

    fn locate(&self, pkey: &str) -> Option<usize> {
        self.find(pkey).map(|(_, position)| position)
    }

    fn range_between(&self, start: usize, end: usize) -> Vec<SharedRow> {
        let (start, end) = clamp_range(start, end, self.len);
        self.walk()
            .skip(start)
            .take(end - start)
            .map(|(_, node)| Arc::clone(&node.entry.row))
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn load(&mut self, entries: Vec<OrderedEntry>) {
        self.clear();
        let entries = match self.order {
            Some(order) => merge_sort(entries, order),
            None => entries,
        };
        for entry in entries {
            self.attach(entry, None);
        }
    }
}
