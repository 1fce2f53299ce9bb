//! Forward-only cursor over a [`RingBuffer`].
//!
//! A cursor only trusts a slot while it can prove, from the buffer's
//! geometry and its own lap count, that the slot still holds an item it has
//! not yet skipped past. The moment that proof fails the cursor becomes
//! [`Mode::Invalid`] and yields nothing more. Running out this way is a normal
//! outcome of lossy eviction, not an error.

use std::fmt;

use crate::buffer::RingBuffer;
use crate::mode::{Geometry, Mode};

/// Single-reader view created by [`RingBuffer::cursor`].
///
/// Iterating yields items oldest first. A cursor that reaches the head
/// reports nothing further, but picks up again if new items arrive before it
/// has been lapped.
pub struct Cursor<'a, T> {
    buffer: &'a RingBuffer<T>,
    next: usize,
    next_wrap_count: u64,
    mode: Mode,
    ready: bool,
    expected_mod_count: u64,
}

impl<'a, T> Cursor<'a, T> {
    pub(crate) fn new(buffer: &'a RingBuffer<T>) -> Self {
        let head = buffer.head.read();
        let geometry = buffer.geometry(*head);
        let mut cursor = Self {
            buffer,
            next: geometry.tail,
            next_wrap_count: geometry.tail_wrap_count,
            mode: Mode::Start,
            ready: false,
            expected_mod_count: geometry.mod_count,
        };
        cursor.recompute(&geometry);
        cursor
    }

    /// Whether the next call to `next` will produce an item.
    ///
    /// Revalidates against the buffer when it has been modified since the
    /// last check. Once this returns `false` because the cursor was lapped,
    /// it returns `false` forever.
    pub fn has_next(&mut self) -> bool {
        if self.mode == Mode::Invalid {
            return false;
        }

        let buffer = self.buffer;
        let head = buffer.head.read();
        if buffer.mod_count() != self.expected_mod_count {
            self.recompute(&buffer.geometry(*head));
        }
        self.ready
    }

    /// Current position relative to the live window.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Cursors are read-only.
    ///
    /// # Panics
    ///
    /// Always.
    pub fn remove(&mut self) -> ! {
        panic!("ring buffer cursors do not support removal; use RingBuffer::remove")
    }

    fn recompute(&mut self, geometry: &Geometry) {
        self.expected_mod_count = geometry.mod_count;

        if self.mode != Mode::Invalid {
            let mode = Mode::classify(geometry, self.next, self.next_wrap_count);
            let safe = mode == Mode::Empty
                || (self.mode.can_become(mode) && mode.lap_matches(geometry, self.next_wrap_count));
            self.mode = if safe { mode } else { Mode::Invalid };
        }
        self.ready = self.mode.is_readable();
    }
}

impl<'a, T: Clone> Cursor<'a, T> {
    /// Read the slot under the cursor and move past it.
    ///
    /// Holding the head lock keeps producers from reusing the slot mid-read.
    /// `None` when the cursor is not ready, or when a consumer emptied the
    /// slot after the last `has_next`.
    fn step(&mut self) -> Option<T> {
        let buffer = self.buffer;
        let head = buffer.head.read();
        if buffer.mod_count() != self.expected_mod_count {
            self.recompute(&buffer.geometry(*head));
        }
        if !self.ready {
            return None;
        }

        let item = buffer.slots[self.next].lock().clone();
        self.next += 1;
        if self.next == buffer.capacity() {
            self.next = 0;
            self.next_wrap_count += 1;
        }

        self.recompute(&buffer.geometry(*head));
        item
    }
}

impl<'a, T: Clone> Iterator for Cursor<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        while self.has_next() {
            if let Some(item) = self.step() {
                return Some(item);
            }
        }
        None
    }
}

impl<'a, T> fmt::Debug for Cursor<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("next", &self.next)
            .field("next_wrap_count", &self.next_wrap_count)
            .field("mode", &self.mode)
            .field("expected_mod_count", &self.expected_mod_count)
            .finish_non_exhaustive()
    }
}
