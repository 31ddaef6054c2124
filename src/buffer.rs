//! Shared FIFO of decoded samples
//!
//! The decoder pushes from the event dispatch task; consumers (the shutdown
//! drain, a GUI poller on another thread, an async stream) pull from any
//! thread. A bound keeps memory flat when nobody drains: once full, the
//! oldest sample is discarded and counted.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

use crate::types::Position;

struct Inner {
    queue: Mutex<VecDeque<Position>>,
    capacity: Option<usize>,
    dropped: AtomicU64,
    notify: Notify,
}

/// Cloneable handle to one shared sample queue
#[derive(Clone)]
pub struct SampleBuffer {
    inner: Arc<Inner>,
}

impl SampleBuffer {
    /// Create a buffer holding at most `capacity` samples, or unbounded for `None`
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                capacity,
                dropped: AtomicU64::new(0),
                notify: Notify::new(),
            }),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Append a sample without blocking.
    ///
    /// Returns `false` when the buffer was full and the oldest sample was
    /// dropped to make room.
    pub fn push(&self, sample: Position) -> bool {
        let mut evicted = false;
        {
            let mut queue = self.inner.queue.lock();
            if let Some(capacity) = self.inner.capacity {
                if queue.len() >= capacity {
                    queue.pop_front();
                    evicted = true;
                }
            }
            queue.push_back(sample);
        }

        if evicted {
            let total = self.inner.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            // Log on powers of two so a stalled consumer does not flood the log
            if total.is_power_of_two() {
                warn!(dropped = total, "Sample buffer full, discarding oldest samples");
            }
        }

        self.inner.notify.notify_one();
        !evicted
    }

    /// Take the oldest sample, if any
    pub fn pop(&self) -> Option<Position> {
        self.inner.queue.lock().pop_front()
    }

    /// Take every buffered sample in FIFO order, leaving the buffer empty
    pub fn drain(&self) -> Vec<Position> {
        self.inner.queue.lock().drain(..).collect()
    }

    /// Most recent sample without consuming it
    pub fn latest(&self) -> Option<Position> {
        self.inner.queue.lock().back().copied()
    }

    pub fn len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.lock().is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.inner.capacity
    }

    /// Samples discarded because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Wait for the next sample
    pub async fn recv(&self) -> Position {
        loop {
            if let Some(sample) = self.pop() {
                return sample;
            }
            self.inner.notify.notified().await;
        }
    }

    /// Endless stream of samples as they arrive
    pub fn stream(&self) -> impl Stream<Item = Position> + Send + 'static {
        futures::stream::unfold(self.clone(), |buffer| async move {
            let sample = buffer.recv().await;
            Some((sample, buffer))
        })
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use proptest::prelude::*;
    use std::time::Duration;

    fn sample(i: usize) -> Position {
        Position::new(i as f64, 0.0, 0.0, 0.0)
    }

    #[test]
    fn drain_is_fifo_and_empties() {
        let buffer = SampleBuffer::unbounded();
        for i in 0..5 {
            assert!(buffer.push(sample(i)));
        }

        let drained = buffer.drain();
        assert_eq!(drained, (0..5).map(sample).collect::<Vec<_>>());
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn full_buffer_drops_oldest() {
        let buffer = SampleBuffer::new(Some(3));
        for i in 0..5 {
            buffer.push(sample(i));
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.dropped(), 2);
        assert_eq!(buffer.latest(), Some(sample(4)));
        assert_eq!(buffer.drain(), vec![sample(2), sample(3), sample(4)]);
    }

    #[test]
    fn clones_share_one_queue() {
        let producer = SampleBuffer::unbounded();
        let consumer = producer.clone();
        producer.push(sample(1));
        assert_eq!(consumer.pop(), Some(sample(1)));
        assert!(producer.is_empty());
    }

    #[test]
    fn concurrent_producers_keep_their_own_order() {
        let buffer = SampleBuffer::unbounded();
        let handles: Vec<_> = (0..4)
            .map(|producer| {
                let buffer = buffer.clone();
                std::thread::spawn(move || {
                    for seq in 0..500 {
                        buffer.push(Position::new(producer as f64, seq as f64, 0.0, 0.0));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let drained = buffer.drain();
        assert_eq!(drained.len(), 2000);
        for producer in 0..4 {
            let seqs: Vec<f64> =
                drained.iter().filter(|p| p.x == producer as f64).map(|p| p.y).collect();
            assert_eq!(seqs, (0..500).map(|s| s as f64).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn recv_wakes_on_push() {
        let buffer = SampleBuffer::unbounded();
        let waiter = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.recv().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        buffer.push(sample(7));

        let got = tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert_eq!(got, sample(7));
    }

    #[tokio::test]
    async fn stream_yields_in_order() {
        let buffer = SampleBuffer::unbounded();
        for i in 0..3 {
            buffer.push(sample(i));
        }
        let got: Vec<_> = buffer.stream().take(3).collect().await;
        assert_eq!(got, vec![sample(0), sample(1), sample(2)]);
    }

    proptest! {
        #[test]
        fn drain_returns_every_push_exactly_once(xs in prop::collection::vec(-1e6f64..1e6, 0..200)) {
            let buffer = SampleBuffer::unbounded();
            for x in &xs {
                buffer.push(Position::new(*x, 1.0, 2.0, 3.0));
            }
            let drained: Vec<f64> = buffer.drain().into_iter().map(|p| p.x).collect();
            prop_assert_eq!(drained, xs);
            prop_assert!(buffer.is_empty());
        }
    }
}
