//! Simulation hooks: lets `lr_dst` drive a `RingBuffer<u64>` and its cursors.

use lr_dst::{DstTestableReader, DstTestableRing};

use crate::buffer::RingBuffer;
use crate::cursor::Cursor;

impl DstTestableReader for Cursor<'_, u64> {
    fn has_next(&mut self) -> bool {
        Cursor::has_next(self)
    }

    fn next_value(&mut self) -> Option<u64> {
        self.next()
    }
}

impl DstTestableRing for RingBuffer<u64> {
    type Reader<'a> = Cursor<'a, u64>;

    fn add(&self, value: u64) {
        RingBuffer::add(self, value);
    }

    fn remove(&self) -> Option<u64> {
        RingBuffer::remove(self)
    }

    fn remove_n(&self, n: usize) {
        RingBuffer::remove_n(self, n);
    }

    fn clear(&self) {
        RingBuffer::clear(self);
    }

    fn count(&self) -> usize {
        RingBuffer::count(self)
    }

    fn capacity(&self) -> usize {
        RingBuffer::capacity(self)
    }

    fn mod_count(&self) -> u64 {
        RingBuffer::mod_count(self)
    }

    fn reader(&self) -> Cursor<'_, u64> {
        self.cursor()
    }
}
