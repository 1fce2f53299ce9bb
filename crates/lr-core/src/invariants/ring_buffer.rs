//! Ring buffer invariants.
//!
//! | Property | Description |
//! |----------|-------------|
//! | BoundedCapacity | Buffer never holds more than its capacity |
//! | NoLostMessages | Every produced message is live, consumed, or evicted |
//! | FIFO_Order | Consumed and live messages appear in production order |
//! | ModCountMonotonic | Every mutation strictly increases the modification counter |
//!
//! Eviction is part of the contract here: a full buffer drops its oldest
//! message on `add`, so "lost" means unaccounted for, not merely gone.

use std::collections::{HashMap, HashSet};

use crate::counterexample::{Counterexample, StateSnapshot};
use crate::property::{PropertyChecker, PropertyResult};

/// Properties that any lossy ring buffer implementation must satisfy.
///
/// Messages are `u64` identifiers and must be unique per run so the
/// checker can locate each one in the production history.
pub trait RingBufferProperties {
    /// All messages that have been produced (in order).
    fn produced_messages(&self) -> Vec<u64>;

    /// All messages that have been consumed via remove (in order).
    fn consumed_messages(&self) -> Vec<u64>;

    /// Messages dropped by overflow eviction, bulk removal, or clear.
    fn evicted_messages(&self) -> Vec<u64>;

    /// Current messages in the buffer (oldest to newest).
    fn current_contents(&self) -> Vec<u64>;

    /// Maximum capacity of the buffer.
    fn capacity(&self) -> u64;

    /// Modification counter observed after each mutating operation.
    fn mod_count_history(&self) -> Vec<u64>;
}

/// Property checker for ring buffer implementations.
pub struct RingBufferPropertyChecker<'a, T: RingBufferProperties> {
    buffer: &'a T,
    dst_seed: Option<u64>,
}

impl<'a, T: RingBufferProperties> RingBufferPropertyChecker<'a, T> {
    #[must_use]
    pub fn new(buffer: &'a T) -> Self {
        Self {
            buffer,
            dst_seed: None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.dst_seed = Some(seed);
        self
    }

    fn counterexample(&self) -> Counterexample {
        match self.dst_seed {
            Some(seed) => Counterexample::with_seed(seed),
            None => Counterexample::new(),
        }
    }

    fn check_bounded_capacity(&self) -> PropertyResult {
        let contents = self.buffer.current_contents();
        let capacity = self.buffer.capacity();

        if contents.len() as u64 > capacity {
            return PropertyResult::fail(
                "BoundedCapacity",
                format!(
                    "Buffer contains {} items but capacity is {}",
                    contents.len(),
                    capacity
                ),
                None,
            );
        }

        PropertyResult::pass("BoundedCapacity")
    }

    fn check_no_lost_messages(&self) -> PropertyResult {
        let produced = self.buffer.produced_messages();
        let consumed: HashSet<u64> = self.buffer.consumed_messages().into_iter().collect();
        let evicted: HashSet<u64> = self.buffer.evicted_messages().into_iter().collect();
        let contents: HashSet<u64> = self.buffer.current_contents().into_iter().collect();

        for msg in &produced {
            if !consumed.contains(msg) && !evicted.contains(msg) && !contents.contains(msg) {
                let mut ce = self.counterexample();
                ce.add_state(StateSnapshot {
                    step: 1,
                    description: format!("Message {} lost", msg),
                    variables: vec![
                        ("produced".to_string(), format!("{:?}", produced)),
                        ("consumed".to_string(), format!("{:?}", consumed)),
                        ("evicted".to_string(), format!("{:?}", evicted)),
                        ("contents".to_string(), format!("{:?}", contents)),
                    ],
                });
                return PropertyResult::fail(
                    "NoLostMessages",
                    format!(
                        "Message {} was produced but is neither live, consumed, nor evicted",
                        msg
                    ),
                    Some(ce),
                );
            }
        }

        PropertyResult::pass("NoLostMessages")
    }

    /// Consumed messages, and separately the live contents, must each be
    /// strictly increasing in production position.
    fn check_fifo_order(&self) -> PropertyResult {
        let produced = self.buffer.produced_messages();
        let position: HashMap<u64, usize> = produced
            .iter()
            .enumerate()
            .map(|(i, msg)| (*msg, i))
            .collect();

        let sequences = [
            ("consumed", self.buffer.consumed_messages()),
            ("contents", self.buffer.current_contents()),
        ];

        for (label, seq) in &sequences {
            let mut last: Option<usize> = None;
            for msg in seq {
                let Some(&pos) = position.get(msg) else {
                    return PropertyResult::fail(
                        "FIFO_Order",
                        format!("{} holds message {} that was never produced", label, msg),
                        None,
                    );
                };
                if let Some(prev) = last {
                    if pos <= prev {
                        return PropertyResult::fail(
                            "FIFO_Order",
                            format!(
                                "{} has message {} (produced #{}) after produced #{}",
                                label, msg, pos, prev
                            ),
                            None,
                        );
                    }
                }
                last = Some(pos);
            }
        }

        PropertyResult::pass("FIFO_Order")
    }

    fn check_mod_count_monotonic(&self) -> PropertyResult {
        let history = self.buffer.mod_count_history();

        for pair in history.windows(2) {
            if pair[1] <= pair[0] {
                return PropertyResult::fail(
                    "ModCountMonotonic",
                    format!("mod_count went from {} to {} across a mutation", pair[0], pair[1]),
                    None,
                );
            }
        }

        PropertyResult::pass("ModCountMonotonic")
    }
}

impl<'a, T: RingBufferProperties> PropertyChecker for RingBufferPropertyChecker<'a, T> {
    fn check_all(&self) -> Vec<PropertyResult> {
        vec![
            self.check_bounded_capacity(),
            self.check_no_lost_messages(),
            self.check_fifo_order(),
            self.check_mod_count_monotonic(),
        ]
    }
}
