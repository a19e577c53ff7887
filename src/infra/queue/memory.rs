//! In-memory two-lane priority queue.

use std::collections::VecDeque;

use crate::core::PendingQueue;
use crate::util::serde::PriorityClass;

/// Two FIFO lanes, one per priority class.
///
/// Every operation except [`PendingQueue::snapshot`] is O(1) amortized: each
/// lane is a ring buffer, so appending, popping the head and pushing back onto
/// the head never shift the other entries. Draining is strict priority: the
/// normal lane is only consulted when the high lane is empty.
#[derive(Debug, Clone)]
pub struct InMemoryLanes<T> {
    high: VecDeque<T>,
    normal: VecDeque<T>,
}

impl<T> InMemoryLanes<T> {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            high: VecDeque::new(),
            normal: VecDeque::new(),
        }
    }

    fn lane_mut(&mut self, class: PriorityClass) -> &mut VecDeque<T> {
        match class {
            PriorityClass::High => &mut self.high,
            PriorityClass::Normal => &mut self.normal,
        }
    }

    fn lane(&self, class: PriorityClass) -> &VecDeque<T> {
        match class {
            PriorityClass::High => &self.high,
            PriorityClass::Normal => &self.normal,
        }
    }

    /// Peek at the item the next `dequeue_head` would return.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.high.front().or_else(|| self.normal.front())
    }
}

impl<T> Default for InMemoryLanes<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> PendingQueue<T> for InMemoryLanes<T> {
    fn enqueue_tail(&mut self, class: PriorityClass, item: T) {
        self.lane_mut(class).push_back(item);
    }

    fn enqueue_head(&mut self, class: PriorityClass, item: T) {
        self.lane_mut(class).push_front(item);
    }

    fn dequeue_head(&mut self) -> Option<T> {
        self.high.pop_front().or_else(|| self.normal.pop_front())
    }

    fn snapshot(&self) -> Vec<T> {
        self.high.iter().chain(self.normal.iter()).cloned().collect()
    }

    fn lane_len(&self, class: PriorityClass) -> usize {
        self.lane(class).len()
    }

    fn len(&self) -> usize {
        self.high.len() + self.normal.len()
    }
}
