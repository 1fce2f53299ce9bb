//! Simulated time.

/// Simulated clock. Time only moves when the test advances it.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_ns: u64,
}

impl SimClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn now_ns(&self) -> u64 {
        self.now_ns
    }

    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_ns / 1_000_000
    }

    pub fn advance_ns(&mut self, delta: u64) {
        self.now_ns = self.now_ns.saturating_add(delta);
    }

    pub fn advance_us(&mut self, delta: u64) {
        self.advance_ns(delta.saturating_mul(1_000));
    }

    pub fn advance_ms(&mut self, delta: u64) {
        self.advance_ns(delta.saturating_mul(1_000_000));
    }
}
