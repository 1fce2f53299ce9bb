//! # lr-dst
//!
//! Deterministic Simulation Testing for the lap-safe ring buffer.
//!
//! All time, randomness, and faults flow from one seed, so a failing run is
//! reproduced by re-running with the same seed.
//!
//! ## Usage
//!
//! ```rust
//! use lr_dst::DstEnv;
//!
//! let mut env = DstEnv::new(12345);
//!
//! // Deterministic time
//! env.clock().advance_ms(5);
//! assert_eq!(env.clock().now_ms(), 5);
//!
//! // Deterministic randomness
//! let choice: u64 = env.rng().gen_range(0..10);
//! assert!(choice < 10);
//! ```
//!
//! ## Reproducibility
//!
//! ```bash
//! DST_SEED=12345 cargo test
//! ```

pub mod clock;
pub mod env;
pub mod fault;
pub mod harness;
pub mod random;

pub use clock::SimClock;
pub use env::{DstEnv, EnvStats};
pub use fault::{FaultConfig, FaultInjector, FaultType};
pub use harness::{
    generate_ops, run_ring_scenario, DstTestableReader, DstTestableRing, RingDstResult,
    RingDstRunner, RingDstStats, RingOp, RunnerConfig,
};
pub use random::DeterministicRng;

/// Default number of DST operations when `DST_ITERATIONS` is unset.
pub const ITERATIONS_DEFAULT: u64 = 1000;

/// Get DST seed from environment or generate random one.
///
/// Prints the seed for reproduction. Use `DST_SEED=<seed>` to reproduce.
///
/// # Panics
///
/// Panics if `DST_SEED` is set but is not a valid `u64`.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    match std::env::var("DST_SEED") {
        Ok(s) => {
            let seed: u64 = s.parse().expect("DST_SEED must be a valid u64");
            println!("DST_SEED={} (from environment)", seed);
            seed
        }
        Err(_) => {
            let seed = rand::random::<u64>();
            println!("DST_SEED={} (randomly generated)", seed);
            seed
        }
    }
}

/// Operation count from `DST_ITERATIONS`, falling back to [`ITERATIONS_DEFAULT`].
#[must_use]
pub fn iterations_from_env() -> u64 {
    std::env::var("DST_ITERATIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(ITERATIONS_DEFAULT)
}
