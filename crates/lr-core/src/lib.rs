//! # lr-core
//!
//! Core types and invariants for the lap-safe ring buffer.
//!
//! This crate provides:
//! - `PropertyResult` and `PropertyChecker` for verifying invariants
//! - `Counterexample` for rendering failure paths
//! - `RingBufferProperties`, the invariant trait every ring implementation
//!   exposes to the checker
//!
//! The crate has no knowledge of the buffer itself. Implementations report
//! their history (produced, consumed, evicted) and the checker decides.

pub mod counterexample;
pub mod invariants;
pub mod property;

pub use counterexample::{Action, Anomaly, Counterexample, StateSnapshot};
pub use invariants::{RingBufferProperties, RingBufferPropertyChecker};
pub use property::{PropertyChecker, PropertyResult};
