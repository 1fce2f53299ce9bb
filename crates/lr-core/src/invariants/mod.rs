//! Invariant traits for ring buffer implementations.
//!
//! - `ring_buffer`: BoundedCapacity, NoLostMessages, FIFO_Order, ModCountMonotonic

pub mod ring_buffer;

pub use ring_buffer::{RingBufferProperties, RingBufferPropertyChecker};
