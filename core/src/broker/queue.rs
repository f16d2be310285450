//! Bounded in-memory FIFO for queue delivery mode.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::Notify;

/// Capacity used when a non-positive capacity is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue is at capacity; the payload was not stored.
    #[error("queue full")]
    Full,

    /// No payload is currently available.
    #[error("queue empty")]
    Empty,

    /// The queue has been closed; no operation succeeds anymore.
    #[error("queue closed")]
    Closed,
}

#[derive(Debug)]
struct QueueInner {
    buf: VecDeque<Bytes>,
    closed: bool,
}

/// Bounded FIFO of opaque payloads, shared by producer and consumer loops.
///
/// `enqueue` and [`try_dequeue`](Self::try_dequeue) never suspend the caller;
/// a full queue drops the new payload rather than exerting backpressure on
/// the producer connection. Consumer loops use the condition-notified
/// [`dequeue`](Self::dequeue) so an idle consumer parks instead of polling.
///
/// The queue is `Open` until [`close`](Self::close), which is one-way and
/// idempotent and discards anything still buffered.
#[derive(Debug)]
pub struct MemoryQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    capacity: usize,
}

impl MemoryQueue {
    /// Creates a queue with the given capacity. Non-positive capacities fall
    /// back to [`DEFAULT_QUEUE_CAPACITY`].
    pub fn new(capacity: i64) -> Self {
        let capacity = if capacity <= 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            capacity as usize
        };
        Self {
            inner: Mutex::new(QueueInner {
                buf: VecDeque::new(),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Appends a payload without blocking. Fails with [`QueueError::Full`]
    /// at capacity (the payload is discarded by the caller) and
    /// [`QueueError::Closed`] after close.
    pub fn enqueue(&self, payload: Bytes) -> Result<(), QueueError> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(QueueError::Closed);
            }
            if inner.buf.len() >= self.capacity {
                return Err(QueueError::Full);
            }
            inner.buf.push_back(payload);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Removes and returns the oldest payload without blocking.
    pub fn try_dequeue(&self) -> Result<Bytes, QueueError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }
        inner.buf.pop_front().ok_or(QueueError::Empty)
    }

    /// Waits until a payload is available or the queue closes.
    ///
    /// The notified-future is created before re-checking the queue so a
    /// wakeup between the check and the await is never lost.
    pub async fn dequeue(&self) -> Result<Bytes, QueueError> {
        loop {
            let notified = self.notify.notified();
            match self.try_dequeue() {
                Err(QueueError::Empty) => {}
                other => {
                    // Pass the baton: a Notify holds at most one stored
                    // permit, so with several parked consumers a burst of
                    // enqueues can under-notify.
                    if other.is_ok() && !self.is_empty() {
                        self.notify.notify_one();
                    }
                    return other;
                }
            }
            notified.await;
        }
    }

    /// Current number of buffered payloads.
    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Closes the queue, discarding buffered payloads and waking every
    /// parked consumer. Idempotent.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.buf.clear();
        }
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn fifo_order_preserved() {
        let queue = MemoryQueue::new(100);
        for i in 0..50u32 {
            queue
                .enqueue(Bytes::from(format!("message {}", i)))
                .unwrap();
        }
        assert_eq!(queue.len(), 50);

        for i in 0..50u32 {
            let msg = queue.try_dequeue().unwrap();
            assert_eq!(msg, Bytes::from(format!("message {}", i)));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_rejects_without_altering_contents() {
        let queue = MemoryQueue::new(2);
        queue.enqueue(Bytes::from_static(b"a")).unwrap();
        queue.enqueue(Bytes::from_static(b"b")).unwrap();
        assert!(queue.is_full());

        assert_eq!(queue.enqueue(Bytes::from_static(b"c")), Err(QueueError::Full));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.try_dequeue().unwrap(), Bytes::from_static(b"a"));
        assert_eq!(queue.try_dequeue().unwrap(), Bytes::from_static(b"b"));
        assert_eq!(queue.try_dequeue(), Err(QueueError::Empty));
    }

    #[test]
    fn empty_dequeue_does_not_block() {
        let queue = MemoryQueue::new(10);
        assert_eq!(queue.try_dequeue(), Err(QueueError::Empty));
    }

    #[test]
    fn non_positive_capacity_falls_back_to_default() {
        assert_eq!(MemoryQueue::new(0).capacity(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(MemoryQueue::new(-5).capacity(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(MemoryQueue::new(7).capacity(), 7);
    }

    #[test]
    fn close_discards_and_is_idempotent() {
        let queue = MemoryQueue::new(10);
        queue.enqueue(Bytes::from_static(b"msg")).unwrap();
        queue.close();
        queue.close();

        assert_eq!(queue.len(), 0);
        assert_eq!(queue.enqueue(Bytes::from_static(b"x")), Err(QueueError::Closed));
        assert_eq!(queue.try_dequeue(), Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn blocking_dequeue_wakes_on_enqueue() {
        let queue = Arc::new(MemoryQueue::new(10));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue().await })
        };

        // Give the consumer a chance to park before the payload arrives
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.enqueue(Bytes::from_static(b"wake")).unwrap();

        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer never woke")
            .unwrap();
        assert_eq!(got.unwrap(), Bytes::from_static(b"wake"));
    }

    #[tokio::test]
    async fn blocking_dequeue_ends_on_close() {
        let queue = Arc::new(MemoryQueue::new(10));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.close();

        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer never observed close")
            .unwrap();
        assert_eq!(got, Err(QueueError::Closed));
    }
}
