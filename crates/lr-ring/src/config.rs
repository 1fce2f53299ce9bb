//! Ring buffer configuration.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::RingError;

/// Capacity used when a config omits it.
pub const CAPACITY_DEFAULT: usize = 1024;

/// Construction-time settings for a [`RingBuffer`](crate::RingBuffer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Number of slots. Fixed for the life of the buffer.
    pub capacity: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity: CAPACITY_DEFAULT,
        }
    }
}

impl RingConfig {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Parse a JSON document such as `{"capacity": 500}`.
    pub fn from_json(text: &str) -> Result<Self, RingError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings and return the capacity as a non-zero value.
    pub fn validate(&self) -> Result<NonZeroUsize, RingError> {
        NonZeroUsize::new(self.capacity).ok_or(RingError::ZeroCapacity)
    }
}
