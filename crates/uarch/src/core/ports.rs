//! Typed bounded queues connecting the core to its neighbours.
//!
//! Each port carries exactly one message type in one direction. Producers
//! check [`PortQueue::has_room`] before pushing; overflowing a port is a
//! wiring defect, not a modeled condition.

use std::collections::VecDeque;

/// A bounded single-direction message queue.
#[derive(Debug)]
pub struct PortQueue<T> {
    queue: VecDeque<T>,
    capacity: usize,
}

impl<T> PortQueue<T> {
    /// Creates a port holding at most `capacity` in-flight messages.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "port capacity must be non-zero");
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// True if another message fits.
    pub fn has_room(&self) -> bool {
        self.queue.len() < self.capacity
    }

    /// Enqueues a message.
    ///
    /// # Panics
    ///
    /// Pushing into a full port is a defect; callers gate on `has_room`.
    pub fn push(&mut self, item: T) {
        assert!(self.has_room(), "port overflow (capacity {})", self.capacity);
        self.queue.push_back(item);
    }

    /// Dequeues the oldest message, if any.
    pub fn try_pull(&mut self) -> Option<T> {
        self.queue.pop_front()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut port = PortQueue::new(2);
        port.push(1);
        port.push(2);
        assert!(!port.has_room());
        assert_eq!(port.try_pull(), Some(1));
        assert_eq!(port.try_pull(), Some(2));
        assert_eq!(port.try_pull(), None);
    }

    #[test]
    #[should_panic(expected = "port overflow")]
    fn test_overflow_is_fatal() {
        let mut port = PortQueue::new(1);
        port.push(1);
        port.push(2);
    }
}
