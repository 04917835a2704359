use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

/// Heap entry. Ordered by explicit priority first, then by insertion order
/// (earlier insertions carry a larger `order` and therefore win ties).
#[derive(Clone)]
struct Entry<T> {
    priority: i64,
    order: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.order == other.order
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.order.cmp(&other.order))
    }
}

/// Stable max-priority queue.
///
/// Items with a higher priority come out first. Items sharing a priority come
/// out in the order they were inserted. Reading is destructive: use
/// [`PriorityQueue::drain`] on a clone when the queue must survive.
#[derive(Clone)]
pub struct PriorityQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    next_order: u64,
}

// Manual Debug implementation, items are usually not Debug
impl<T> fmt::Debug for PriorityQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("len", &self.heap.len())
            .field("next_order", &self.next_order)
            .finish()
    }
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_order: u64::MAX,
        }
    }

    /// Insert an item. The secondary key counts down so earlier items sort higher.
    pub fn insert(&mut self, item: T, priority: i64) {
        let order = self.next_order;
        self.next_order = self.next_order.saturating_sub(1);
        self.heap.push(Entry { priority, order, item });
    }

    /// Remove and return the highest priority item.
    pub fn extract(&mut self) -> Option<T> {
        self.heap.pop().map(|entry| entry.item)
    }

    /// Empty the queue, returning its items in extraction order.
    pub fn drain(&mut self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.heap.len());
        while let Some(item) = self.extract() {
            items.push(item);
        }
        items
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
