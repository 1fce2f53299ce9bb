//! A `RingBuffer<u64>` that records its own history for the property checker.

use std::num::NonZeroUsize;

use lr_core::RingBufferProperties;
use parking_lot::Mutex;

use crate::buffer::RingBuffer;

#[derive(Debug, Default)]
struct History {
    produced: Vec<u64>,
    consumed: Vec<u64>,
    evicted: Vec<u64>,
    mod_counts: Vec<u64>,
}

/// Ring buffer wrapper that logs every produced, consumed and evicted value.
///
/// Mutations are serialized through the history lock so each recorded
/// eviction matches what the ring actually dropped. Values must be unique.
#[derive(Debug)]
pub struct TrackedRing {
    ring: RingBuffer<u64>,
    history: Mutex<History>,
}

impl TrackedRing {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
            history: Mutex::new(History::default()),
        }
    }

    /// The wrapped ring, for read-only use. Mutating it directly bypasses
    /// the history.
    #[must_use]
    pub fn ring(&self) -> &RingBuffer<u64> {
        &self.ring
    }

    pub fn add(&self, value: u64) {
        let mut history = self.history.lock();
        if self.ring.is_full() {
            if let Some(oldest) = self.ring.tail_item() {
                history.evicted.push(oldest);
            }
        }
        self.ring.add(value);
        history.produced.push(value);
        history.mod_counts.push(self.ring.mod_count());
    }

    pub fn remove(&self) -> Option<u64> {
        let mut history = self.history.lock();
        let value = self.ring.remove()?;
        history.consumed.push(value);
        history.mod_counts.push(self.ring.mod_count());
        Some(value)
    }

    pub fn remove_n(&self, n: usize) {
        let mut history = self.history.lock();
        let live = self.ring.to_vec();
        self.ring.remove_n(n);
        if !live.is_empty() {
            let dropped = n.min(live.len());
            history.evicted.extend_from_slice(&live[..dropped]);
            history.mod_counts.push(self.ring.mod_count());
        }
    }

    pub fn clear(&self) {
        let mut history = self.history.lock();
        history.evicted.extend(self.ring.to_vec());
        self.ring.clear();
        history.mod_counts.push(self.ring.mod_count());
    }
}

impl RingBufferProperties for TrackedRing {
    fn produced_messages(&self) -> Vec<u64> {
        self.history.lock().produced.clone()
    }

    fn consumed_messages(&self) -> Vec<u64> {
        self.history.lock().consumed.clone()
    }

    fn evicted_messages(&self) -> Vec<u64> {
        self.history.lock().evicted.clone()
    }

    fn current_contents(&self) -> Vec<u64> {
        let _history = self.history.lock();
        self.ring.to_vec()
    }

    fn capacity(&self) -> u64 {
        self.ring.capacity() as u64
    }

    fn mod_count_history(&self) -> Vec<u64> {
        self.history.lock().mod_counts.clone()
    }
}
