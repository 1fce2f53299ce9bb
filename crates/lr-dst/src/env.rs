//! The simulation environment: seed, RNG, clock and fault injector.

use std::fmt;

use crate::clock::SimClock;
use crate::fault::{FaultConfig, FaultInjector};
use crate::random::DeterministicRng;

/// Everything nondeterministic in a test, derived from one seed.
#[derive(Debug)]
pub struct DstEnv {
    seed: u64,
    rng: DeterministicRng,
    clock: SimClock,
    fault: FaultInjector,
    delays_count: u64,
}

/// Summary counters for a DST environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvStats {
    pub seed: u64,
    pub elapsed_ns: u64,
    pub faults_injected: u64,
    pub delays: u64,
}

impl fmt::Display for EnvStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DST_SEED={} elapsed_ns={} faults={} delays={}",
            self.seed, self.elapsed_ns, self.faults_injected, self.delays
        )
    }
}

impl DstEnv {
    /// Environment with the default fault configuration.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_fault_config(seed, FaultConfig::default())
    }

    #[must_use]
    pub fn with_fault_config(seed: u64, config: FaultConfig) -> Self {
        // Faults get their own stream so changing the fault config does not
        // change the operation sequence.
        let fault = FaultInjector::new(DeterministicRng::new(seed.wrapping_add(1)), config);
        Self {
            seed,
            rng: DeterministicRng::new(seed),
            clock: SimClock::new(),
            fault,
            delays_count: 0,
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    pub fn clock(&mut self) -> &mut SimClock {
        &mut self.clock
    }

    pub fn fault(&mut self) -> &mut FaultInjector {
        &mut self.fault
    }

    /// Advance simulated time by a random delay drawn from the fault config.
    pub fn delay(&mut self) {
        let delay = self.fault.delay_us();
        self.clock.advance_us(delay);
        self.delays_count += 1;
    }

    /// `DST_SEED=<seed>`, for assertion messages.
    #[must_use]
    pub fn format_seed(&self) -> String {
        format!("DST_SEED={}", self.seed)
    }

    #[must_use]
    pub fn stats(&self) -> EnvStats {
        EnvStats {
            seed: self.seed,
            elapsed_ns: self.clock.now_ns(),
            faults_injected: self.fault.injected_count(),
            delays: self.delays_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_is_reproducible() {
        let mut a = DstEnv::new(42);
        let mut b = DstEnv::new(42);
        for _ in 0..100 {
            if a.fault().should_fail() {
                a.delay();
            }
            if b.fault().should_fail() {
                b.delay();
            }
            assert_eq!(a.rng().gen::<u64>(), b.rng().gen::<u64>());
        }
        assert_eq!(a.stats(), b.stats());
        assert_eq!(a.format_seed(), "DST_SEED=42");
    }

    #[test]
    fn test_delay_advances_clock() {
        let mut env = DstEnv::new(5);
        for _ in 0..10 {
            env.delay();
        }
        let stats = env.stats();
        assert_eq!(stats.delays, 10);
        assert_eq!(stats.elapsed_ns, env.clock().now_ns());
        assert!(stats.to_string().starts_with("DST_SEED=5 "));
    }
}
