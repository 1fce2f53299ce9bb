//! Fixed-capacity lossy ring buffer with split head/tail locks.
//!
//! # Locking
//!
//! | Operation | head lock | tail lock |
//! |-----------|-----------|-----------|
//! | `add` | write | write, only to evict when full |
//! | `remove` | - | write |
//! | `remove_n` | read | write |
//! | `clear` | write | write |
//! | cursor step | read | read, to snapshot geometry |
//!
//! Producers and consumers each hold one role lock, so a stream of `add`
//! and a stream of `remove` do not contend. Whenever both locks are held the
//! head lock is taken first.
//!
//! # Invariants
//!
//! - `0 <= count <= capacity`
//! - `count == 0` implies `head == tail`
//! - the live items, oldest first, are `slots[tail..head)` read circularly
//!   (all slots when full); every other slot is `None`
//! - `mod_count` grows by one per successful mutation; an overflowing
//!   `add` counts its eviction as a separate `remove`

use std::fmt;
use std::num::NonZeroUsize;

use tracing::{debug, trace};

use crate::config::RingConfig;
use crate::cursor::Cursor;
use crate::error::RingError;
use crate::mode::Geometry;
use crate::sync::{AtomicU64, AtomicUsize, Mutex, Ordering, RwLock};

/// Tail position plus the number of times it has wrapped to slot 0.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TailPosition {
    pub(crate) index: usize,
    pub(crate) wrap_count: u64,
}

impl TailPosition {
    fn advance(&mut self, capacity: usize) {
        self.index += 1;
        if self.index == capacity {
            self.index = 0;
            self.wrap_count += 1;
        }
    }
}

/// A fixed-capacity circular buffer that evicts its oldest item when full.
///
/// `add` never blocks on a full buffer and never fails. Readers traverse
/// with a [`Cursor`], which stops instead of returning an item from a slot
/// that has since been reused.
pub struct RingBuffer<T> {
    capacity: usize,
    pub(crate) slots: Box<[Mutex<Option<T>>]>,
    /// Head lock; the guarded value is the next write index.
    pub(crate) head: RwLock<usize>,
    /// Tail lock; the guarded value is the oldest live index and its laps.
    pub(crate) tail: RwLock<TailPosition>,
    count: AtomicUsize,
    mod_count: AtomicU64,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer with `capacity` slots.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        debug!(capacity, "creating ring buffer");
        Self {
            capacity,
            slots: (0..capacity).map(|_| Mutex::new(None)).collect(),
            head: RwLock::new(0),
            tail: RwLock::new(TailPosition::default()),
            count: AtomicUsize::new(0),
            mod_count: AtomicU64::new(0),
        }
    }

    /// Create an empty buffer, rejecting a zero capacity.
    pub fn try_new(capacity: usize) -> Result<Self, RingError> {
        NonZeroUsize::new(capacity)
            .map(Self::new)
            .ok_or(RingError::ZeroCapacity)
    }

    pub fn from_config(config: &RingConfig) -> Result<Self, RingError> {
        config.validate().map(Self::new)
    }

    /// Append `item` as the newest element, evicting the oldest if full.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is still full after evicting ("double
    /// overflow"). That can only happen if the locking invariants are broken.
    pub fn add(&self, item: T) {
        let mut head = self.head.write();
        self.insert(&mut head, item, false);
    }

    fn insert(&self, head: &mut usize, item: T, in_overflow: bool) {
        if self.count.load(Ordering::Acquire) == self.capacity {
            assert!(
                !in_overflow,
                "double overflow in ring buffer (capacity {})",
                self.capacity
            );
            trace!(capacity = self.capacity, "ring full, evicting oldest item");
            drop(self.remove());
            return self.insert(head, item, true);
        }

        debug_assert!(*head < self.capacity, "head out of range: {}", *head);
        *self.slots[*head].lock() = Some(item);
        *head += 1;
        if *head == self.capacity {
            *head = 0;
        }
        self.count.fetch_add(1, Ordering::AcqRel);
        self.mod_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Remove and return the oldest item, or `None` if empty.
    pub fn remove(&self) -> Option<T> {
        let mut tail = self.tail.write();
        if self.count.load(Ordering::Acquire) == 0 {
            return None;
        }

        let item = self.slots[tail.index].lock().take();
        tail.advance(self.capacity);
        self.count.fetch_sub(1, Ordering::AcqRel);
        self.mod_count.fetch_add(1, Ordering::AcqRel);
        item
    }

    /// Drop up to `n` of the oldest items.
    ///
    /// The tail never moves past the head, so asking for more than `count`
    /// empties the buffer. `count` is recomputed from the resulting
    /// `tail`/`head` geometry. On an empty buffer this is a no-op and leaves
    /// `mod_count` alone; otherwise it counts as a mutation even for `n == 0`.
    pub fn remove_n(&self, n: usize) {
        // Head cannot move while the new tail is computed.
        let head = self.head.read();
        let mut tail = self.tail.write();

        let count = self.count.load(Ordering::Acquire);
        if count == 0 {
            return;
        }

        let steps = n.min(count);
        if steps < n {
            debug!(requested = n, removed = steps, "bulk removal clamped at head");
        }
        for _ in 0..steps {
            *self.slots[tail.index].lock() = None;
            tail.advance(self.capacity);
        }

        let remaining = if tail.index == *head {
            0
        } else {
            (*head + self.capacity - tail.index) % self.capacity
        };
        self.count.store(remaining, Ordering::Release);
        self.mod_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Empty the buffer in place.
    ///
    /// Cursors opened before the clear stop rather than resume on new items.
    pub fn clear(&self) {
        let mut head = self.head.write();
        let mut tail = self.tail.write();

        for slot in self.slots.iter() {
            *slot.lock() = None;
        }
        *head = 0;
        tail.index = 0;
        // Open cursors are at most one lap ahead of the tail, so two laps
        // leaves every one of them behind.
        tail.wrap_count += 2;
        self.count.store(0, Ordering::Release);
        self.mod_count.fetch_add(1, Ordering::AcqRel);
        debug!(capacity = self.capacity, "ring buffer cleared");
    }

    /// Number of live items.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count() == self.capacity
    }

    /// Number of successful mutations so far.
    #[must_use]
    pub fn mod_count(&self) -> u64 {
        self.mod_count.load(Ordering::Acquire)
    }

    /// Open a cursor at the current tail.
    pub fn cursor(&self) -> Cursor<'_, T> {
        Cursor::new(self)
    }

    /// Snapshot head/tail/count. Caller holds the head lock and passes its value.
    pub(crate) fn geometry(&self, head: usize) -> Geometry {
        let tail = self.tail.read();
        Geometry {
            head,
            tail: tail.index,
            tail_wrap_count: tail.wrap_count,
            count: self.count.load(Ordering::Acquire),
            capacity: self.capacity,
            mod_count: self.mod_count.load(Ordering::Acquire),
        }
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Peek at the oldest item without touching the head lock.
    ///
    /// Callers are expected to know the buffer is non-empty; on an empty
    /// buffer this is `None`. A concurrent `remove` can take the item right
    /// after it was read.
    #[must_use]
    pub fn tail_item(&self) -> Option<T> {
        let index = self.tail.read().index;
        self.slots[index].lock().clone()
    }

    /// Drain a fresh cursor into a `Vec`, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.cursor().collect()
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("count", &self.count())
            .field("mod_count", &self.mod_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring<T>(capacity: usize) -> RingBuffer<T> {
        RingBuffer::try_new(capacity).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            RingBuffer::<u32>::try_new(0),
            Err(RingError::ZeroCapacity)
        ));
        assert!(RingBuffer::<u32>::from_config(&RingConfig::with_capacity(0)).is_err());
        assert_eq!(
            RingBuffer::<u32>::from_config(&RingConfig::default())
                .unwrap()
                .capacity(),
            crate::config::CAPACITY_DEFAULT
        );
    }

    #[test]
    fn test_add_remove_fifo() {
        let buffer = ring(4);
        buffer.add(1);
        buffer.add(2);
        buffer.add(3);
        assert_eq!(buffer.count(), 3);
        assert_eq!(buffer.remove(), Some(1));
        assert_eq!(buffer.remove(), Some(2));
        assert_eq!(buffer.remove(), Some(3));
        assert_eq!(buffer.remove(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let buffer = ring(3);
        for i in 1..=4 {
            buffer.add(i);
        }
        assert_eq!(buffer.count(), 3);
        assert!(buffer.is_full());
        assert_eq!(buffer.to_vec(), vec![2, 3, 4]);
        assert_eq!(buffer.tail_item(), Some(2));
    }

    #[test]
    fn test_capacity_one() {
        let buffer = ring(1);
        buffer.add("a");
        buffer.add("b");
        assert_eq!(buffer.count(), 1);
        assert_eq!(buffer.to_vec(), vec!["b"]);
        assert_eq!(buffer.remove(), Some("b"));
        assert_eq!(buffer.remove(), None);
    }

    #[test]
    fn test_remove_on_empty_is_not_a_mutation() {
        let buffer: RingBuffer<u8> = ring(2);
        assert_eq!(buffer.remove(), None);
        buffer.remove_n(3);
        assert_eq!(buffer.mod_count(), 0);
    }

    #[test]
    fn test_mod_count_strictly_increases() {
        let buffer = ring(2);
        let mut last = buffer.mod_count();
        let mut bump = |buffer: &RingBuffer<u32>| {
            let now = buffer.mod_count();
            assert!(now > last, "mod_count {} did not exceed {}", now, last);
            last = now;
        };

        buffer.add(1);
        bump(&buffer);
        buffer.add(2);
        bump(&buffer);
        buffer.add(3); // overflow
        bump(&buffer);
        buffer.remove();
        bump(&buffer);
        buffer.remove_n(1);
        bump(&buffer);
        buffer.clear();
        bump(&buffer);
    }

    #[test]
    fn test_overflow_counts_eviction_and_insert() {
        let buffer = ring(1);
        buffer.add(1);
        assert_eq!(buffer.mod_count(), 1);
        buffer.add(2);
        assert_eq!(buffer.mod_count(), 3);
    }

    #[test]
    fn test_remove_n_clamps_at_head() {
        let buffer = ring(3);
        buffer.add('A');
        buffer.add('B');
        buffer.add('C');
        buffer.add('D');
        assert_eq!(buffer.remove(), Some('B'));
        assert_eq!(buffer.count(), 2);

        buffer.remove_n(5);
        assert_eq!(buffer.count(), 0);
        assert!(buffer.is_empty());
        assert_eq!(buffer.to_vec(), Vec::<char>::new());
        assert_eq!(buffer.tail_item(), None);
    }

    #[test]
    fn test_remove_n_across_wrap_recounts_from_geometry() {
        let buffer = ring(4);
        for i in 0..6 {
            buffer.add(i);
        }
        // live [2, 3, 4, 5], tail at slot 2, head at slot 2
        buffer.remove_n(3);
        assert_eq!(buffer.count(), 1);
        assert_eq!(buffer.to_vec(), vec![5]);
        assert_eq!(buffer.tail.read().wrap_count, 1);
    }

    #[test]
    fn test_remove_n_zero_on_non_empty_is_a_mutation() {
        let buffer = ring(2);
        buffer.add(1);
        let before = buffer.mod_count();
        buffer.remove_n(0);
        assert!(buffer.mod_count() > before);
        assert_eq!(buffer.count(), 1);
        assert_eq!(buffer.to_vec(), vec![1]);
    }

    #[test]
    #[should_panic(expected = "double overflow")]
    fn test_overflow_recurring_during_eviction_panics() {
        let buffer = ring(1);
        buffer.add(1);
        let mut head = buffer.head.write();
        buffer.insert(&mut head, 2, true);
    }

    #[test]
    fn test_clear_resets_in_place() {
        let buffer = ring(3);
        for i in 0..5 {
            buffer.add(i);
        }
        buffer.clear();
        assert_eq!(buffer.count(), 0);
        assert!(buffer.is_empty());
        assert!(!buffer.cursor().has_next());
        assert!(buffer.slots.iter().all(|slot| slot.lock().is_none()));

        buffer.add(9);
        assert_eq!(buffer.to_vec(), vec![9]);
    }

    #[test]
    fn test_evicted_slot_reused_without_leaking_old_value() {
        let buffer = ring(2);
        buffer.add(String::from("x"));
        buffer.add(String::from("y"));
        buffer.add(String::from("z"));
        assert_eq!(buffer.to_vec(), vec!["y".to_string(), "z".to_string()]);
    }

    #[test]
    fn test_debug_output() {
        let buffer = ring::<u8>(2);
        buffer.add(1);
        let rendered = format!("{:?}", buffer);
        assert!(rendered.contains("capacity: 2"));
        assert!(rendered.contains("count: 1"));
    }
}
