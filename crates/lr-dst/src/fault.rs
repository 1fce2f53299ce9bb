//! Fault injection at operation boundaries.
//!
//! The buffer itself is never instrumented. Faults are things the
//! surrounding system can do between two buffer calls: a producer burst
//! that laps every open reader, a reader that stalls, a consumer sweep, or
//! simulated delay.

use crate::random::DeterministicRng;

/// Types of faults the ring harness can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    /// Producer adds `capacity + 1` items back to back
    WriterBurst,
    /// The scheduled reader operation is skipped
    ReaderStall,
    /// Consumer bulk-removes a full capacity worth of items
    ConsumerSweep,
    /// Simulated time passes
    Delay,
}

/// Fault injection configuration.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// Probability that any given operation boundary injects a fault
    pub failure_probability: f64,
    /// Upper bound for simulated delays, in microseconds
    pub delay_us_max: u64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            failure_probability: 0.05,
            delay_us_max: 1_000,
        }
    }
}

impl FaultConfig {
    /// No faults at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            failure_probability: 0.0,
            delay_us_max: 0,
        }
    }

    /// Frequent faults, for soak runs.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            failure_probability: 0.25,
            delay_us_max: 10_000,
        }
    }
}

/// Decides, deterministically, when and which faults fire.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    rng: DeterministicRng,
    config: FaultConfig,
    injected_count: u64,
}

impl FaultInjector {
    #[must_use]
    pub fn new(rng: DeterministicRng, config: FaultConfig) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&config.failure_probability),
            "failure_probability out of range: {}",
            config.failure_probability
        );
        Self {
            rng,
            config,
            injected_count: 0,
        }
    }

    /// Roll for a fault at this boundary.
    pub fn should_fail(&mut self) -> bool {
        if self.config.failure_probability <= 0.0 {
            return false;
        }
        let fail = self.rng.gen_bool(self.config.failure_probability);
        if fail {
            self.injected_count += 1;
        }
        fail
    }

    /// Pick which fault to inject once `should_fail` fired.
    pub fn choose(&mut self) -> FaultType {
        match self.rng.gen_range(0..4_u8) {
            0 => FaultType::WriterBurst,
            1 => FaultType::ReaderStall,
            2 => FaultType::ConsumerSweep,
            _ => FaultType::Delay,
        }
    }

    /// Delay length in microseconds, within the configured bound.
    pub fn delay_us(&mut self) -> u64 {
        if self.config.delay_us_max == 0 {
            return 0;
        }
        self.rng.gen_range(1..=self.config.delay_us_max)
    }

    #[must_use]
    pub fn injected_count(&self) -> u64 {
        self.injected_count
    }
}
