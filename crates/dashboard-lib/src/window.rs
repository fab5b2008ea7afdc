//! Bounded, insertion-ordered windows of recent samples and decisions
//!
//! Windows behave like the ring buffers used for offline metrics: a fixed
//! capacity with FIFO eviction, oldest entries leaving first.

use crate::models::{Decision, TelemetrySample};
use std::collections::VecDeque;

/// Capacity of the telemetry window
pub const TELEMETRY_CAPACITY: usize = 200;

/// Capacity of the decision window
pub const DECISION_CAPACITY: usize = 30;

/// Fixed-capacity FIFO window
#[derive(Debug, Clone)]
pub struct BoundedWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

pub type TelemetryWindow = BoundedWindow<TelemetrySample>;
pub type DecisionWindow = BoundedWindow<Decision>;

impl<T: Clone + PartialEq> BoundedWindow<T> {
    /// Create an empty window holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// Up to `limit` entries, newest first
    pub fn recent_first(&self, limit: usize) -> Vec<T> {
        self.items.iter().rev().take(limit).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    /// Append one entry, evicting the oldest on overflow.
    /// Returns the number of evicted entries.
    pub fn push(&mut self, item: T) -> usize {
        self.items.push_back(item);
        self.evict_overflow()
    }

    /// Merge a tail into the window.
    ///
    /// The leading part of `tail` that repeats the window's newest entries is
    /// skipped, so a producer re-sending its last N items (or its whole store)
    /// does not duplicate them. Everything else is appended in order and the
    /// window is trimmed back to capacity. Returns the number of appended entries.
    pub fn merge(&mut self, tail: Vec<T>) -> usize {
        let overlap = self.overlap_with(&tail);
        let mut appended = 0;
        for item in tail.into_iter().skip(overlap) {
            self.items.push_back(item);
            appended += 1;
        }
        self.evict_overflow();
        appended
    }

    /// Replace the whole content, keeping only the newest `capacity` entries
    pub fn replace(&mut self, items: Vec<T>) {
        self.items = trim_to_recent(items, self.capacity).into();
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Length of the longest window suffix equal to a prefix of `tail`
    fn overlap_with(&self, tail: &[T]) -> usize {
        let max = self.items.len().min(tail.len());
        (1..=max)
            .rev()
            .find(|&k| {
                let start = self.items.len() - k;
                self.items.range(start..).zip(&tail[..k]).all(|(a, b)| a == b)
            })
            .unwrap_or(0)
    }

    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;
        while self.items.len() > self.capacity {
            self.items.pop_front();
            evicted += 1;
        }
        evicted
    }
}

/// Keep only the newest `limit` entries of a tail
pub fn trim_to_recent<T>(mut items: Vec<T>, limit: usize) -> Vec<T> {
    if items.len() > limit {
        items.drain(..items.len() - limit);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut window = BoundedWindow::new(3);
        for i in 0..5 {
            window.push(i);
        }
        assert_eq!(window.to_vec(), vec![2, 3, 4]);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_merge_is_concatenation_for_new_entries() {
        let mut window = BoundedWindow::new(200);
        window.merge((0..150).collect());
        window.merge((150..260).collect());

        let expected: Vec<i32> = (60..260).collect();
        assert_eq!(window.to_vec(), expected);
    }

    #[test]
    fn test_merge_skips_redelivered_overlap() {
        let mut window = BoundedWindow::new(200);
        window.merge((0..10).collect());
        // producer re-sends its last ten items plus one new item
        let appended = window.merge((1..11).collect());

        assert_eq!(appended, 1);
        assert_eq!(window.to_vec(), (0..11).collect::<Vec<i32>>());
    }

    #[test]
    fn test_merge_whole_store_redelivery() {
        let mut window = BoundedWindow::new(5);
        window.merge((0..8).collect());
        assert_eq!(window.to_vec(), vec![3, 4, 5, 6, 7]);

        window.merge(trim_to_recent((0..9).collect(), 5));
        assert_eq!(window.to_vec(), vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_recent_first() {
        let mut window = BoundedWindow::new(10);
        window.merge(vec![1, 2, 3, 4]);
        assert_eq!(window.recent_first(2), vec![4, 3]);
        assert_eq!(window.recent_first(10), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_replace_keeps_newest() {
        let mut window = BoundedWindow::new(3);
        window.push(99);
        window.replace(vec![1, 2, 3, 4, 5]);
        assert_eq!(window.to_vec(), vec![3, 4, 5]);
    }

    #[test]
    fn test_trim_to_recent() {
        assert_eq!(trim_to_recent(vec![1, 2, 3], 5), vec![1, 2, 3]);
        assert_eq!(trim_to_recent(vec![1, 2, 3, 4], 2), vec![3, 4]);
        assert!(trim_to_recent(Vec::<u8>::new(), 2).is_empty());
    }
}
