//! The mining worker's in-memory set of unmined work items.
//!
//! `Mempool` is the only write path gossip handlers use to feed the miner:
//! dedup on `id` and capacity eviction happen atomically under a single
//! mutex so the mining worker and any number of gossip readers can share it
//! safely (see the concurrency model in the daemon crate).

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::work_item::WorkItem;
use crate::Hash;

/// Bounded, dedup-on-insert FIFO of work items awaiting mining.
pub struct Mempool {
    inner: Mutex<Inner>,
    capacity: usize,
}

struct Inner {
    order: VecDeque<WorkItem>,
    ids: HashSet<Hash>,
}

impl Mempool {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                order: VecDeque::new(),
                ids: HashSet::new(),
            }),
            capacity,
        }
    }

    /// Inserts `item` unless its id is already present. Evicts the oldest
    /// item when the mempool is over capacity after insertion.
    ///
    /// Returns `true` if the item was newly inserted.
    pub fn submit(&self, item: WorkItem) -> bool {
        let mut inner = self.inner.lock().expect("mempool mutex poisoned");
        if inner.ids.contains(&item.id) {
            return false;
        }
        inner.ids.insert(item.id);
        inner.order.push_back(item);
        while inner.order.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.ids.remove(&evicted.id);
            }
        }
        true
    }

    /// Removes and returns up to `n` items, sorted by id ascending for a
    /// deterministic merkle root.
    pub fn drain(&self, n: usize) -> Vec<WorkItem> {
        let mut inner = self.inner.lock().expect("mempool mutex poisoned");
        let take = n.min(inner.order.len());
        let mut items: Vec<WorkItem> = inner.order.drain(..take).collect();
        for item in &items {
            inner.ids.remove(&item.id);
        }
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    pub fn size(&self) -> usize {
        self.inner.lock().expect("mempool mutex poisoned").order.len()
    }
}
