//! Binary min-heap scheduler.
//!
//! The heap lives in a flat `Vec` with the children of slot `i` at
//! `2i + 1` and `2i + 2`. `std::collections::BinaryHeap` cannot remove an
//! arbitrary entry, which `Simulator::remove` needs, so the sifts are
//! written out here.

use super::{EventKey, ScheduledEvent, Scheduler};

/// Scheduler backed by an implicit binary min-heap.
#[derive(Debug, Default)]
pub struct HeapScheduler {
    heap: Vec<ScheduledEvent>,
}

impl HeapScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
        }
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].key >= self.heap[parent].key {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smallest = if right < len && self.heap[right].key < self.heap[left].key {
                right
            } else {
                left
            };
            if self.heap[index].key <= self.heap[smallest].key {
                break;
            }
            self.heap.swap(index, smallest);
            index = smallest;
        }
    }

    /// Removes the slot at `index` and restores the heap property.
    fn remove_at(&mut self, index: usize) -> ScheduledEvent {
        let removed = self.heap.swap_remove(index);
        if index < self.heap.len() {
            self.sift_down(index);
            self.sift_up(index);
        }
        removed
    }
}

impl Scheduler for HeapScheduler {
    fn insert(&mut self, entry: ScheduledEvent) {
        self.heap.push(entry);
        let last = self.heap.len() - 1;
        self.sift_up(last);
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn peek_next(&self) -> Option<&ScheduledEvent> {
        self.heap.first()
    }

    fn remove_next(&mut self) -> Option<ScheduledEvent> {
        if self.heap.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    fn remove(&mut self, key: EventKey) -> Option<ScheduledEvent> {
        let index = self.heap.iter().position(|e| e.key == key)?;
        Some(self.remove_at(index))
    }

    fn name(&self) -> &'static str {
        "heap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing;

    #[test]
    fn test_empty() {
        testing::check_empty(&mut HeapScheduler::new());
    }

    #[test]
    fn test_ordering() {
        testing::check_ordering(&mut HeapScheduler::new());
    }

    #[test]
    fn test_remove() {
        testing::check_remove(&mut HeapScheduler::new());
    }

    #[test]
    fn test_interleaved() {
        testing::check_interleaved(&mut HeapScheduler::with_capacity(4));
    }

    #[test]
    fn test_heap_property_after_removals() {
        let mut s = HeapScheduler::new();
        for uid in 1..=64u64 {
            s.insert(testing::entry((uid * 37) % 17, uid));
        }
        for uid in (1..=64u64).step_by(3) {
            assert!(s.remove(EventKey { ts: (uid * 37) % 17, uid }).is_some());
        }
        for i in 1..s.heap.len() {
            assert!(s.heap[(i - 1) / 2].key <= s.heap[i].key, "violated at {}", i);
        }
        let mut last = None;
        while let Some(e) = s.remove_next() {
            if let Some(prev) = last {
                assert!(prev < e.key);
            }
            last = Some(e.key);
        }
    }
}
