//! Lock-free single-producer single-consumer event queues.
//!
//! The control thread pushes [`crate::events::NoteEvent`] and
//! [`crate::events::ParamEvent`] values; the audio thread drains them
//! at block start. Neither side ever blocks: a full queue rejects the
//! push (the newest event is dropped) and an empty queue returns
//! `None`. Indices are published with acquire/release atomics, so one
//! writer and one reader never observe a torn slot.
//!
//! The ring keeps one slot empty to distinguish full from empty, so a
//! queue built with capacity `n` holds `n.next_power_of_two() - 1`
//! events.
#![allow(unsafe_code)]

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

struct Ring<T> {
    slots: Box<[UnsafeCell<T>]>,
    mask: usize,
    /// Next slot the producer writes. Owned by the producer, read by
    /// the consumer.
    write: AtomicUsize,
    /// Next slot the consumer reads. Owned by the consumer, read by
    /// the producer.
    read: AtomicUsize,
}

// Safety: each slot is written by the single producer strictly before
// the release store that publishes it, and read by the single consumer
// strictly after the acquire load that observes it. The two sides
// never touch the same slot concurrently.
unsafe impl<T: Copy + Send> Send for Ring<T> {}
unsafe impl<T: Copy + Send> Sync for Ring<T> {}

/// Control-thread half of an event queue.
pub struct Producer<T: Copy + Default> {
    ring: Arc<Ring<T>>,
}

/// Audio-thread half of an event queue.
pub struct Consumer<T: Copy + Default> {
    ring: Arc<Ring<T>>,
}

/// Build a queue pair. `capacity` is rounded up to a power of two
/// (minimum 2); the usable capacity is one less than that.
///
/// # Example
///
/// ```rust
/// use ondas_synth::queue::event_queue;
///
/// let (mut tx, mut rx) = event_queue::<u32>(4);
/// assert!(tx.push(7));
/// assert_eq!(rx.pop(), Some(7));
/// assert_eq!(rx.pop(), None);
/// ```
pub fn event_queue<T: Copy + Default>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let cap = capacity.max(2).next_power_of_two();
    let slots: Box<[UnsafeCell<T>]> = (0..cap).map(|_| UnsafeCell::new(T::default())).collect();
    let ring = Arc::new(Ring {
        slots,
        mask: cap - 1,
        write: AtomicUsize::new(0),
        read: AtomicUsize::new(0),
    });
    (
        Producer {
            ring: Arc::clone(&ring),
        },
        Consumer { ring },
    )
}

impl<T: Copy + Default> Producer<T> {
    /// Push an event. Returns `false` when the queue is full; the
    /// event is dropped, the producer is never blocked.
    pub fn push(&mut self, value: T) -> bool {
        let ring = &*self.ring;
        let write = ring.write.load(Ordering::Relaxed);
        let next = (write + 1) & ring.mask;
        if next == ring.read.load(Ordering::Acquire) {
            return false;
        }
        // Safety: `write` is owned by this producer and the consumer
        // will not read this slot until the release store below.
        unsafe {
            *ring.slots[write].get() = value;
        }
        ring.write.store(next, Ordering::Release);
        true
    }

    /// Number of events the queue can hold.
    pub fn capacity(&self) -> usize {
        self.ring.mask
    }
}

impl<T: Copy + Default> Consumer<T> {
    /// Pop the oldest event, or `None` when the queue is empty. Never
    /// blocks.
    pub fn pop(&mut self) -> Option<T> {
        let ring = &*self.ring;
        let read = ring.read.load(Ordering::Relaxed);
        if read == ring.write.load(Ordering::Acquire) {
            return None;
        }
        // Safety: the acquire load above observed the producer's
        // release store for this slot, so the write to it has
        // completed and the producer will not touch it again until we
        // advance `read`.
        let value = unsafe { *ring.slots[read].get() };
        ring.read.store((read + 1) & ring.mask, Ordering::Release);
        Some(value)
    }

    /// Whether the queue currently holds no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events currently queued.
    pub fn len(&self) -> usize {
        let read = self.ring.read.load(Ordering::Relaxed);
        let write = self.ring.write.load(Ordering::Acquire);
        write.wrapping_sub(read) & self.ring.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let (mut tx, mut rx) = event_queue::<u32>(8);
        for i in 0..5 {
            assert!(tx.push(i));
        }
        for i in 0..5 {
            assert_eq!(rx.pop(), Some(i));
        }
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let (mut tx, mut rx) = event_queue::<u32>(4);
        assert_eq!(tx.capacity(), 3);
        assert!(tx.push(0));
        assert!(tx.push(1));
        assert!(tx.push(2));
        assert!(!tx.push(3), "fourth push must be rejected");
        // The rejected event is gone, the first three survive
        assert_eq!(rx.pop(), Some(0));
        assert_eq!(rx.pop(), Some(1));
        assert_eq!(rx.pop(), Some(2));
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        let (tx, _rx) = event_queue::<u32>(100);
        assert_eq!(tx.capacity(), 127);
        let (tx, _rx) = event_queue::<u32>(0);
        assert_eq!(tx.capacity(), 1);
    }

    #[test]
    fn test_queue_reusable_after_drain() {
        let (mut tx, mut rx) = event_queue::<u32>(4);
        for round in 0..10u32 {
            assert!(tx.push(round));
            assert!(tx.push(round + 100));
            assert_eq!(rx.pop(), Some(round));
            assert_eq!(rx.pop(), Some(round + 100));
        }
        assert!(rx.is_empty());
    }

    #[test]
    fn test_two_thread_stress() {
        const COUNT: u32 = 100_000;
        let (mut tx, mut rx) = event_queue::<u32>(64);

        let producer = std::thread::spawn(move || {
            for i in 0..COUNT {
                // Spin until accepted; only the test is allowed to
                // busy-wait like this
                while !tx.push(i) {
                    std::hint::spin_loop();
                }
            }
        });

        let mut expected = 0;
        while expected < COUNT {
            if let Some(value) = rx.pop() {
                assert_eq!(value, expected, "events must arrive in order");
                expected += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        producer.join().unwrap();
        assert_eq!(rx.pop(), None);
    }
}
