//! Bounded FIFO queue.
//!
//! Typed, capacity-bounded, closable, strictly insertion-ordered. All
//! operations are non-blocking; producers poll `enqueue` and consumers
//! poll `dequeue`. Closure is recorded through an atomic flag flipped by
//! compare-and-swap so double-close is safe, and a closed queue still
//! drains its remaining elements in order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Single-producer-many-consumer bounded queue.
pub struct FifoQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    closed: AtomicBool,
}

impl<T> FifoQueue<T> {
    /// Create a queue with a fixed capacity. Capacity zero is accepted
    /// and rejects every enqueue.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    /// Try to append an element. A full or closed queue rejects the
    /// element and hands it back to the caller for retry.
    pub fn enqueue(&self, item: T) -> Result<(), T> {
        if self.closed.load(Ordering::Acquire) {
            return Err(item);
        }

        let mut items = self.items.lock().expect("queue lock poisoned");
        // Re-check under the lock so an enqueue racing with close cannot
        // slip an element past the flag.
        if self.closed.load(Ordering::Acquire) || items.len() >= self.capacity {
            return Err(item);
        }
        items.push_back(item);
        Ok(())
    }

    /// Try to take the oldest element. Returns None when the queue is
    /// empty, including when it is closed and fully drained.
    pub fn dequeue(&self) -> Option<T> {
        self.items.lock().expect("queue lock poisoned").pop_front()
    }

    /// Current element count, best-effort.
    pub fn len(&self) -> usize {
        self.items.lock().expect("queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close the queue. Idempotent; later enqueues return false while
    /// dequeues keep draining remaining elements.
    pub fn close(&self) {
        let _ = self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drop every queued element without closing. Refused on a closed
    /// queue, which keeps its remaining elements for draining.
    pub fn clear(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.items.lock().expect("queue lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn enqueue_dequeue_fifo_order() {
        let q = FifoQueue::new(3);
        assert!(q.enqueue(1).is_ok());
        assert!(q.enqueue(2).is_ok());
        assert!(q.enqueue(3).is_ok());
        // Full queue hands the element back.
        assert_eq!(q.enqueue(4), Err(4));
        assert_eq!(q.len(), 3);

        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(q.dequeue(), Some(2));

        // Space freed, accepts again and keeps order.
        assert!(q.enqueue(4).is_ok());
        assert_eq!(q.dequeue(), Some(3));
        assert_eq!(q.dequeue(), Some(4));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let q = FifoQueue::new(0);
        assert_eq!(q.enqueue(1), Err(1));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn close_stops_enqueue_but_drains() {
        let q = FifoQueue::new(3);
        assert!(q.enqueue("first").is_ok());
        assert!(q.enqueue("second").is_ok());

        q.close();
        assert_eq!(q.enqueue("third"), Err("third"));

        assert_eq!(q.dequeue(), Some("first"));
        assert_eq!(q.dequeue(), Some("second"));
        assert_eq!(q.dequeue(), None);

        // Double close is a no-op.
        q.close();
        assert!(q.is_closed());
    }

    #[test]
    fn clear_refuses_after_close() {
        let q = FifoQueue::new(3);
        let _ = q.enqueue(1);
        let _ = q.enqueue(2);
        q.clear();
        assert!(q.is_empty());

        let _ = q.enqueue(3);
        q.close();
        q.clear();
        assert_eq!(q.dequeue(), Some(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn capacity_is_a_hard_ceiling_under_contention() {
        let q = Arc::new(FifoQueue::new(8));
        let mut handles = Vec::new();

        for i in 0..4 {
            let q = Arc::clone(&q);
            handles.push(tokio::spawn(async move {
                let mut accepted = 0usize;
                for n in 0..100 {
                    if q.enqueue(i * 100 + n).is_ok() {
                        accepted += 1;
                    }
                    assert!(q.len() <= 8);
                    if n % 3 == 0 {
                        q.dequeue();
                    }
                }
                accepted
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(q.len() <= 8);
    }
}
