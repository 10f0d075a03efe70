//! Bounded MPMC ring queue driven by four atomic cursors.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::error::Full;

/// Slot wrapper holding one item in the ring buffer.
struct Slot<T> {
    data: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    const fn new() -> Self {
        Self {
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Maximum supported capacity (2^20 = ~1 million slots).
/// Prevents accidental huge allocations from typos like `RingQueue::new(1000000000)`.
const MAX_CAPACITY: usize = 1 << 20;

/// Bounded multi-producer/multi-consumer FIFO queue.
///
/// The queue never blocks in the kernel and takes no locks: producers claim
/// write regions and consumers claim read regions by compare-and-swap over
/// four cursors, each stored modulo the capacity:
///
/// - `read`: next index a consumer may claim.
/// - `readable`: one past the last index fully published by a producer.
/// - `write`: next index a producer may claim.
/// - `writeable`: one past the last index released by a consumer. Starts at
///   `capacity - 1`, keeping a one-slot gap so that full (`write ==
///   writeable`) and empty (`read == readable`) stay distinguishable.
///
/// Walking the ring forward, `[read, readable)` holds committed items,
/// `[readable, write)` holds claimed-but-unpublished slots, `[write,
/// writeable)` is free, and `[writeable, read)` is released but not yet
/// reclaimed. At most `capacity - 1` items are in the queue at once.
///
/// A full queue rejects pushes and an empty queue rejects pops with a zero
/// count; there are no other failure modes.
///
/// # Example
///
/// ```
/// use quadring::RingQueue;
///
/// let queue = RingQueue::new(8);
/// queue.try_push(1u64).unwrap();
/// queue.try_push(2u64).unwrap();
/// assert_eq!(queue.try_pop(), Some(1));
/// assert_eq!(queue.try_pop(), Some(2));
/// assert_eq!(queue.try_pop(), None);
/// ```
pub struct RingQueue<T> {
    buffer: Box<[Slot<T>]>,
    read: AtomicUsize,
    readable: AtomicUsize,
    write: AtomicUsize,
    writeable: AtomicUsize,
}

// SAFETY: Slots are accessed only through cursor claims. A producer owns a
// slot from winning the `write` CAS until its `readable` publish; a consumer
// owns it from winning the `read` CAS until its `writeable` release. The
// claims never overlap, so sharing the queue across threads is safe whenever
// the items themselves can move between threads.
unsafe impl<T: Send> Send for RingQueue<T> {}
unsafe impl<T: Send> Sync for RingQueue<T> {}

impl<T> RingQueue<T> {
    /// Create a queue with room for `capacity - 1` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2` (one slot is the full/empty gap) or if
    /// `capacity` exceeds the maximum (2^20).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "capacity must be at least 2");
        assert!(capacity <= MAX_CAPACITY, "capacity exceeds maximum (2^20)");

        Self {
            buffer: (0..capacity).map(|_| Slot::new()).collect(),
            read: AtomicUsize::new(0),
            readable: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
            writeable: AtomicUsize::new(capacity - 1),
        }
    }

    /// Forward distance from `from` to `to` along the ring.
    #[inline]
    fn distance(&self, from: usize, to: usize) -> usize {
        (to + self.buffer.len() - from) % self.buffer.len()
    }

    /// Cursor position `n` steps past `pos`, wrapping at capacity.
    #[inline]
    fn advance(&self, pos: usize, n: usize) -> usize {
        (pos + n) % self.buffer.len()
    }

    /// Claim up to `n` write slots. Returns the claim start and its length,
    /// or `None` when the queue is full.
    fn claim_write(&self, n: usize) -> Option<(usize, usize)> {
        // Ordering: Acquire — pairs with the consumer's Release on
        // `writeable`, making the claimed slots safe to overwrite.
        let mut write = self.write.load(Ordering::Acquire);
        loop {
            let writeable = self.writeable.load(Ordering::Acquire);
            if write == writeable {
                return None;
            }
            let actual = n.min(self.distance(write, writeable));
            // Ordering: AcqRel — the winner's claim is visible to later
            // producers reloading `write`.
            match self.write.compare_exchange(
                write,
                self.advance(write, actual),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some((write, actual)),
                Err(current) => write = current,
            }
        }
    }

    /// Publish a claimed region, making it visible to consumers as a group.
    ///
    /// Producers publish in claim order: a claim later in the ring waits
    /// (yielding the scheduler) until every earlier claim has advanced
    /// `readable` past its own start.
    fn publish(&self, start: usize, actual: usize) {
        let end = self.advance(start, actual);
        // Ordering: AcqRel — the Release half pairs with the Acquire load of
        // `readable` in `claim_read`, making the slot payloads visible.
        while self
            .readable
            .compare_exchange(start, end, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            thread::yield_now();
        }
    }

    /// Claim up to `n` read slots. Returns the claim start and its length,
    /// or `None` when the queue is empty.
    fn claim_read(&self, n: usize) -> Option<(usize, usize)> {
        // Ordering: Acquire — pairs with the producer's Release on
        // `readable`, making the slot payloads visible.
        let mut read = self.read.load(Ordering::Acquire);
        loop {
            let readable = self.readable.load(Ordering::Acquire);
            if read == readable {
                return None;
            }
            let actual = n.min(self.distance(read, readable));
            match self.read.compare_exchange(
                read,
                self.advance(read, actual),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some((read, actual)),
                Err(current) => read = current,
            }
        }
    }

    /// Release a consumed region back to producers.
    ///
    /// The expected prior `writeable` is the slot just before the region's
    /// start, so consumers release in pop order, yielding while earlier
    /// claims finish.
    fn release(&self, start: usize, actual: usize) {
        let expected = (start + self.buffer.len() - 1) % self.buffer.len();
        let end = self.advance(expected, actual);
        // Ordering: AcqRel — the Release half pairs with the Acquire load of
        // `writeable` in `claim_write`, making the slots safe to overwrite.
        while self
            .writeable
            .compare_exchange(expected, end, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            thread::yield_now();
        }
    }

    /// Attempt to enqueue one item.
    ///
    /// # Errors
    ///
    /// Returns [`Full`] carrying the item back when the queue has no free
    /// slot right now.
    #[inline]
    pub fn try_push(&self, item: T) -> Result<(), Full<T>> {
        let Some((start, _)) = self.claim_write(1) else {
            return Err(Full(item));
        };
        // SAFETY: The CAS on `write` granted exclusive ownership of slot
        // `start`, and the slot lies in the free region, so it holds no
        // live value. write() does not drop the previous contents.
        unsafe { (*self.buffer[start].data.get()).write(item) };
        self.publish(start, 1);
        Ok(())
    }

    /// Attempt to dequeue one item. Returns `None` when the queue is empty.
    #[inline]
    #[must_use]
    pub fn try_pop(&self) -> Option<T> {
        let (start, _) = self.claim_read(1)?;
        // SAFETY: Slot `start` lies in the committed region, so it was
        // initialized by a producer, and the CAS on `read` granted us
        // exclusive ownership until we release it. assume_init_read moves
        // the value out; the slot is treated as uninitialized afterwards.
        let item = unsafe { (*self.buffer[start].data.get()).assume_init_read() };
        self.release(start, 1);
        Some(item)
    }

    /// Enqueue up to `items.len()` items, draining the accepted prefix from
    /// the vector in order. Returns the number enqueued; `0` means the queue
    /// was full and `items` is untouched.
    ///
    /// The accepted items become visible to consumers atomically as a group.
    pub fn push_batch(&self, items: &mut Vec<T>) -> usize {
        if items.is_empty() {
            return 0;
        }
        let Some((start, actual)) = self.claim_write(items.len()) else {
            return 0;
        };
        for (i, item) in items.drain(..actual).enumerate() {
            let idx = self.advance(start, i);
            // SAFETY: Slots `[start, start + actual)` are exclusively claimed
            // and lie in the free region; each index is written exactly once.
            unsafe { (*self.buffer[idx].data.get()).write(item) };
        }
        self.publish(start, actual);
        actual
    }

    /// Dequeue up to `max` items, appending them to `out` in queue order.
    /// Returns the number dequeued; `0` means the queue was empty.
    pub fn pop_batch(&self, out: &mut Vec<T>, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        let Some((start, actual)) = self.claim_read(max) else {
            return 0;
        };
        out.reserve(actual);
        for i in 0..actual {
            let idx = self.advance(start, i);
            // SAFETY: Slots `[start, start + actual)` lie in the committed
            // region and are exclusively ours; each value is moved out once.
            out.push(unsafe { (*self.buffer[idx].data.get()).assume_init_read() });
        }
        self.release(start, actual);
        actual
    }

    /// Number of committed items.
    ///
    /// An approximation under concurrency: monotonic with respect to
    /// happens-before, but not a linearizable snapshot.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.distance(
            self.read.load(Ordering::Acquire),
            self.readable.load(Ordering::Acquire),
        )
    }

    /// True if no committed items are visible.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read.load(Ordering::Acquire) == self.readable.load(Ordering::Acquire)
    }

    /// True if no free slot is visible.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.write.load(Ordering::Acquire) == self.writeable.load(Ordering::Acquire)
    }

    /// Total slot count. Usable capacity is one less (the full/empty gap).
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Fill fraction `len / capacity`, in `[0, 1)`.
    #[inline]
    #[must_use]
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.buffer.len() as f64
    }
}

impl<T> Drop for RingQueue<T> {
    fn drop(&mut self) {
        // Exclusive access: drain the committed region so the remaining
        // items run their destructors.
        while self.try_pop().is_some() {}
    }
}
