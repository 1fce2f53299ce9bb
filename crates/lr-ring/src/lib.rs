//! # lr-ring
//!
//! Fixed-capacity, thread-safe, lossy ring buffer with a lap-safe cursor.
//!
//! - `add` never blocks: a full buffer evicts its oldest item.
//! - Producers take the head lock and consumers the tail lock, so the two
//!   sides do not contend with each other.
//! - A [`Cursor`] walks the live items while both sides keep mutating. It
//!   tracks which lap of the slot array it is on, and stops as soon as it
//!   can no longer prove its next slot has not been reused.
//!
//! ```rust
//! use lr_ring::RingBuffer;
//!
//! let buffer = RingBuffer::try_new(3).unwrap();
//! for c in ['A', 'B', 'C', 'D'] {
//!     buffer.add(c);
//! }
//! assert_eq!(buffer.to_vec(), vec!['B', 'C', 'D']);
//!
//! let mut cursor = buffer.cursor();
//! assert_eq!(cursor.next(), Some('B'));
//! buffer.add('E');
//! buffer.add('F');
//! buffer.add('G');
//! // lapped: the slots it had not read yet were reused
//! assert_eq!(cursor.next(), None);
//! ```
//!
//! # Modules
//!
//! - `buffer`: the ring buffer itself
//! - `cursor`: the lap-safe cursor
//! - `mode`: cursor position classification and safe transitions
//! - `tracked`: history-recording wrapper checked by `lr_core`
//! - `throttle`: sliding-window event limiter built on the ring
//! - `dst`: `lr_dst` bindings for simulation runs

pub mod buffer;
pub mod config;
pub mod cursor;
pub mod dst;
pub mod error;
pub mod mode;
mod sync;
pub mod throttle;
pub mod tracked;

pub use buffer::RingBuffer;
pub use config::{RingConfig, CAPACITY_DEFAULT};
pub use cursor::Cursor;
pub use error::RingError;
pub use mode::Mode;
pub use throttle::{Throttle, ThrottleDecision};
pub use tracked::TrackedRing;
