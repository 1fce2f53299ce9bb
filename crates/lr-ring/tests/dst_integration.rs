//! DST integration tests for the ring buffer.
//!
//! Runs `RingBuffer<u64>` through the `lr_dst` runner with fault injection,
//! and checks the ring buffer properties from lr-core on a `TrackedRing`.
//!
//! Reproduce a failure with `DST_SEED=<seed> cargo test -p lr-ring`.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use lr_core::{PropertyChecker, RingBufferPropertyChecker};
use lr_dst::{
    generate_ops, get_or_generate_seed, iterations_from_env, run_ring_scenario, DeterministicRng,
    RingOp, RunnerConfig,
};
use lr_ring::{RingBuffer, TrackedRing};
use proptest::prelude::*;

#[test]
fn test_ring_with_dst_runner() {
    let seed = get_or_generate_seed();
    let iterations = iterations_from_env() as usize;

    for capacity in [1, 2, 3, 8] {
        let ring = RingBuffer::<u64>::try_new(capacity).unwrap();
        let mut rng = DeterministicRng::new(seed);
        let ops = generate_ops(&mut rng, iterations, capacity);
        let result = run_ring_scenario(&ring, seed, &ops, RunnerConfig::default());
        println!("capacity={} {}", capacity, result.stats.format());
        assert!(
            result.passed,
            "capacity {} failed:\n{}",
            capacity,
            result.format()
        );
    }
}

#[test]
fn test_ring_under_stress_faults() {
    let seed = get_or_generate_seed();
    let ring = RingBuffer::<u64>::try_new(4).unwrap();
    let mut rng = DeterministicRng::new(seed);
    let ops = generate_ops(&mut rng, 2000, 4);
    let result = run_ring_scenario(&ring, seed, &ops, RunnerConfig::stress());
    assert!(result.passed, "{}", result.format());
    assert!(result.stats.faults_injected > 0, "stress run injected no faults");
}

#[test]
fn test_scenario_replay() {
    // reader 0 is lapped, reader 1 is opened after the burst and reads it all
    let ops = [
        RingOp::Add,
        RingOp::OpenReader,
        RingOp::Add,
        RingOp::Add,
        RingOp::Add,
        RingOp::OpenReader,
        RingOp::Drain(0),
        RingOp::Drain(1),
        RingOp::RemoveN(10),
        RingOp::Add,
        RingOp::Drain(1),
        RingOp::Clear,
        RingOp::Add,
        RingOp::Poll(1),
    ];
    let ring = RingBuffer::<u64>::try_new(3).unwrap();
    let result = run_ring_scenario(&ring, 12345, &ops, RunnerConfig::quick());
    println!("{}", result.format());
    assert!(result.passed);
    // reader 1: 2, 3, 4 from the first drain and 5 after the bulk removal
    assert_eq!(result.stats.reads, 4);
}

#[test]
fn test_determinism() {
    let seed = 42_u64;
    let run = || {
        let ring = RingBuffer::<u64>::try_new(3).unwrap();
        let mut rng = DeterministicRng::new(seed);
        let ops = generate_ops(&mut rng, 500, 3);
        let result = run_ring_scenario(&ring, seed, &ops, RunnerConfig::default());
        (
            result.passed,
            result.stats.reads,
            result.stats.faults_injected,
            ring.mod_count(),
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn test_tracked_ring_properties_hold() {
    let seed = get_or_generate_seed();
    let mut rng = DeterministicRng::new(seed);
    let ring = TrackedRing::new(NonZeroUsize::new(5).unwrap());

    let mut next = 1_u64;
    for _ in 0..1000 {
        match rng.gen_range(0..10_u8) {
            0..=5 => {
                ring.add(next);
                next += 1;
            }
            6 | 7 => {
                ring.remove();
            }
            8 => ring.remove_n(rng.gen_range(0..7)),
            _ => {
                if rng.gen_bool(0.1) {
                    ring.clear();
                }
            }
        }
    }

    let checker = RingBufferPropertyChecker::new(&ring).with_seed(seed);
    for result in checker.check_all() {
        assert!(result.holds, "DST_SEED={} {}", seed, result.summary());
    }
}

#[derive(Debug, Clone)]
enum Op {
    Add,
    Remove,
    RemoveN(usize),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => Just(Op::Add),
        2 => Just(Op::Remove),
        1 => (0..8_usize).prop_map(Op::RemoveN),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    /// After any single-threaded history, a fresh cursor yields exactly the
    /// model's live window and `count` agrees with it.
    #[test]
    fn prop_cursor_matches_model(
        capacity in 1..6_usize,
        ops in proptest::collection::vec(op_strategy(), 0..64),
    ) {
        let ring = RingBuffer::try_new(capacity).unwrap();
        let mut model = VecDeque::new();
        let mut next = 0_u32;

        for op in ops {
            match op {
                Op::Add => {
                    ring.add(next);
                    if model.len() == capacity {
                        model.pop_front();
                    }
                    model.push_back(next);
                    next += 1;
                }
                Op::Remove => prop_assert_eq!(ring.remove(), model.pop_front()),
                Op::RemoveN(n) => {
                    ring.remove_n(n);
                    let k = n.min(model.len());
                    model.drain(..k);
                }
                Op::Clear => {
                    ring.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(ring.count(), model.len());
            prop_assert!(ring.count() <= capacity);
        }

        let expected: Vec<u32> = model.iter().copied().collect();
        prop_assert_eq!(ring.to_vec(), expected);
    }

    /// A cursor opened before further adds never yields an item out of
    /// order or one that was not live when it was read.
    #[test]
    fn prop_lagging_cursor_is_lap_safe(
        capacity in 1..6_usize,
        prefill in 0..6_u32,
        bursts in proptest::collection::vec(0..8_u32, 1..6),
    ) {
        let ring = RingBuffer::try_new(capacity).unwrap();
        let mut next = 0_u32;
        for _ in 0..prefill {
            ring.add(next);
            next += 1;
        }

        let mut cursor = ring.cursor();
        let mut last = None;
        for burst in bursts {
            for _ in 0..burst {
                ring.add(next);
                next += 1;
            }
            if let Some(item) = cursor.next() {
                // nothing is removed, so the live window is the last `capacity` adds
                let oldest = next.saturating_sub(capacity as u32);
                prop_assert!(item >= oldest, "read {} but oldest live is {}", item, oldest);
                if let Some(prev) = last {
                    prop_assert!(item > prev);
                }
                last = Some(item);
            }
        }
    }
}
