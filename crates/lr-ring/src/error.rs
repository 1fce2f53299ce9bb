//! Error types.

use thiserror::Error;

/// Recoverable errors from building a ring buffer.
///
/// Runtime misuse is not represented here: an empty peek or an exhausted
/// cursor is `None`, and a double overflow is a panic.
#[derive(Debug, Error)]
pub enum RingError {
    #[error("ring buffer capacity must be positive")]
    ZeroCapacity,

    #[error("invalid ring buffer config: {0}")]
    Config(#[from] serde_json::Error),
}
