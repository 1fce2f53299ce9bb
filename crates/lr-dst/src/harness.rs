//! DST runner for lossy ring buffers.
//!
//! The runner drives a ring through a seeded operation sequence and mirrors
//! every mutation in a `VecDeque` reference model. Values are sequence
//! numbers, so "older" and "newer" are plain integer comparisons.
//!
//! # What is checked
//!
//! | Check | When |
//! |-------|------|
//! | count matches model, never above capacity | after every mutation |
//! | mod_count moves iff the operation mutated | after every mutation |
//! | reader item is live in the model | every read |
//! | reader items strictly increase | every read |
//! | fresh traversal equals model contents | every `content_check_interval` steps and at the end |
//!
//! A reader is allowed to stop early. It is never allowed to return an item
//! that has been overwritten, removed, or that it already passed.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use lr_core::{Action, Anomaly, Counterexample, StateSnapshot};

use crate::env::DstEnv;
use crate::fault::{FaultConfig, FaultType};
use crate::random::DeterministicRng;

/// Forward-only reader over a ring under test.
pub trait DstTestableReader {
    fn has_next(&mut self) -> bool;

    /// Next item, or `None` once the reader is exhausted or has given up.
    fn next_value(&mut self) -> Option<u64>;
}

/// Minimal ring interface the runner needs. No DST knowledge in the
/// implementation.
pub trait DstTestableRing: Sync {
    type Reader<'a>: DstTestableReader
    where
        Self: 'a;

    fn add(&self, value: u64);
    fn remove(&self) -> Option<u64>;
    fn remove_n(&self, n: usize);
    fn clear(&self);
    fn count(&self) -> usize;
    fn capacity(&self) -> usize;
    fn mod_count(&self) -> u64;
    fn reader(&self) -> Self::Reader<'_>;
}

/// One scheduled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingOp {
    Add,
    Remove,
    RemoveN(usize),
    Clear,
    OpenReader,
    /// Read one item from reader `i % open_readers`
    Poll(usize),
    /// Read reader `i % open_readers` until it stops
    Drain(usize),
}

impl fmt::Display for RingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingOp::Add => write!(f, "add"),
            RingOp::Remove => write!(f, "remove()"),
            RingOp::RemoveN(n) => write!(f, "remove_n({})", n),
            RingOp::Clear => write!(f, "clear()"),
            RingOp::OpenReader => write!(f, "cursor()"),
            RingOp::Poll(i) => write!(f, "poll({})", i),
            RingOp::Drain(i) => write!(f, "drain({})", i),
        }
    }
}

/// Generate a weighted random operation sequence.
///
/// Adds dominate so readers regularly get lapped on small capacities.
pub fn generate_ops(rng: &mut DeterministicRng, count: usize, capacity: usize) -> Vec<RingOp> {
    debug_assert!(capacity > 0, "capacity must be positive");
    (0..count)
        .map(|_| match rng.gen_range(0..100_u8) {
            0..=44 => RingOp::Add,
            45..=59 => RingOp::Remove,
            60..=64 => RingOp::RemoveN(rng.gen_range(0..=capacity + 1)),
            65..=66 => RingOp::Clear,
            67..=74 => RingOp::OpenReader,
            75..=94 => RingOp::Poll(rng.gen_range(0..8)),
            _ => RingOp::Drain(rng.gen_range(0..8)),
        })
        .collect()
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub fault_config: FaultConfig,
    /// Compare a fresh traversal with the model every N steps (0 = only at the end)
    pub content_check_interval: u64,
    /// Oldest reader is dropped when opening one more than this
    pub readers_max: usize,
    /// Number of recent actions kept for the counterexample
    pub trace_len: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fault_config: FaultConfig::default(),
            content_check_interval: 16,
            readers_max: 8,
            trace_len: 64,
        }
    }
}

impl RunnerConfig {
    /// No faults, frequent content checks.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            fault_config: FaultConfig::none(),
            content_check_interval: 4,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn stress() -> Self {
        Self {
            fault_config: FaultConfig::aggressive(),
            content_check_interval: 64,
            readers_max: 16,
            trace_len: 128,
        }
    }
}

/// Counters from a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RingDstStats {
    pub seed: u64,
    pub operations: u64,
    pub faults_injected: u64,
    pub stalled_reads: u64,
    pub readers_opened: u64,
    pub reads: u64,
    pub elapsed_ns: u64,
}

impl RingDstStats {
    #[must_use]
    pub fn format(&self) -> String {
        format!(
            "DST_SEED={} ops={} faults={} stalls={} readers={} reads={}",
            self.seed,
            self.operations,
            self.faults_injected,
            self.stalled_reads,
            self.readers_opened,
            self.reads
        )
    }
}

/// Result of a run.
#[derive(Debug)]
pub struct RingDstResult {
    pub passed: bool,
    pub anomalies: Vec<Anomaly>,
    pub stats: RingDstStats,
    pub counterexample: Option<Counterexample>,
}

impl RingDstResult {
    #[must_use]
    pub fn format(&self) -> String {
        let status = if self.passed { "PASS" } else { "FAIL" };
        let mut result = format!("[{}] {}", status, self.stats.format());
        for anomaly in &self.anomalies {
            result.push_str(&format!("\n  VIOLATION: {}", anomaly));
        }
        if let Some(ref ce) = self.counterexample {
            result.push('\n');
            result.push_str(&ce.render_diagram());
        }
        result
    }
}

/// Reference model: the live window as a deque of sequence numbers.
#[derive(Debug)]
struct RingModel {
    capacity: usize,
    live: VecDeque<u64>,
}

impl RingModel {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            live: VecDeque::with_capacity(capacity),
        }
    }

    fn add(&mut self, value: u64) {
        if self.live.len() == self.capacity {
            self.live.pop_front();
        }
        self.live.push_back(value);
    }

    fn remove(&mut self) -> Option<u64> {
        self.live.pop_front()
    }

    /// Returns whether this counts as a mutation: any bulk removal on a
    /// non-empty ring does, even one that drops nothing.
    fn remove_n(&mut self, n: usize) -> bool {
        if self.live.is_empty() {
            return false;
        }
        let k = n.min(self.live.len());
        self.live.drain(..k);
        true
    }

    fn clear(&mut self) {
        self.live.clear();
    }

    fn is_live(&self, value: u64) -> bool {
        // Values are added in increasing order, so the deque stays sorted.
        self.live.binary_search(&value).is_ok()
    }
}

struct ReaderState<R> {
    reader: R,
    id: usize,
    last: Option<u64>,
}

/// Drives one ring through a scenario with fault injection.
pub struct RingDstRunner<'r, R: DstTestableRing + 'r> {
    ring: &'r R,
    env: DstEnv,
    config: RunnerConfig,
    model: RingModel,
    readers: Vec<ReaderState<R::Reader<'r>>>,
    next_value: u64,
    next_reader_id: usize,
    step: u64,
    stats: RingDstStats,
    trace: VecDeque<Action>,
    anomalies: Vec<Anomaly>,
}

impl<'r, R: DstTestableRing + 'r> RingDstRunner<'r, R> {
    /// Create a runner over an empty ring.
    pub fn new(ring: &'r R, seed: u64, config: RunnerConfig) -> Self {
        debug_assert_eq!(ring.count(), 0, "runner expects an empty ring");
        let env = DstEnv::with_fault_config(seed, config.fault_config.clone());
        Self {
            ring,
            env,
            model: RingModel::new(ring.capacity()),
            readers: Vec::new(),
            next_value: 1,
            next_reader_id: 0,
            step: 0,
            stats: RingDstStats {
                seed,
                ..RingDstStats::default()
            },
            trace: VecDeque::with_capacity(config.trace_len),
            anomalies: Vec::new(),
            config,
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.env.seed()
    }

    /// Anomalies seen so far.
    #[must_use]
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Apply one operation, possibly preceded by a fault.
    pub fn apply(&mut self, op: RingOp) {
        self.step += 1;
        self.stats.operations += 1;

        if self.env.fault().should_fail() {
            self.stats.faults_injected += 1;
            match self.env.fault().choose() {
                FaultType::WriterBurst => {
                    for _ in 0..=self.model.capacity {
                        self.add();
                    }
                }
                FaultType::ReaderStall => {
                    if matches!(op, RingOp::Poll(_) | RingOp::Drain(_)) {
                        self.stats.stalled_reads += 1;
                        return;
                    }
                }
                FaultType::ConsumerSweep => self.remove_n(self.model.capacity),
                FaultType::Delay => self.env.delay(),
            }
        }

        match op {
            RingOp::Add => self.add(),
            RingOp::Remove => self.remove(),
            RingOp::RemoveN(n) => self.remove_n(n),
            RingOp::Clear => self.clear(),
            RingOp::OpenReader => self.open_reader(),
            RingOp::Poll(i) => self.poll(i),
            RingOp::Drain(i) => self.drain(i),
        }

        let interval = self.config.content_check_interval;
        if interval > 0 && self.step % interval == 0 {
            self.check_contents();
        }
    }

    /// Final content check and result.
    pub fn finish(mut self) -> RingDstResult {
        self.check_contents();
        let env_stats = self.env.stats();
        self.stats.elapsed_ns = env_stats.elapsed_ns;

        let counterexample = self.anomalies.first().map(|first| {
            let mut ce = Counterexample::with_seed(self.env.seed())
                .with_description(first.to_string());
            for action in self.trace.drain(..) {
                ce.add_action(action);
            }
            for anomaly in &self.anomalies {
                ce.add_anomaly(anomaly.clone());
            }
            ce.add_state(StateSnapshot {
                step: self.step,
                description: format!("count={} live={:?}", self.ring.count(), self.model.live),
                variables: vec![
                    ("mod_count".to_string(), self.ring.mod_count().to_string()),
                    ("capacity".to_string(), self.model.capacity.to_string()),
                ],
            });
            ce
        });

        debug!(
            %env_stats,
            operations = self.stats.operations,
            anomalies = self.anomalies.len(),
            "ring DST run finished"
        );

        RingDstResult {
            passed: self.anomalies.is_empty(),
            anomalies: self.anomalies,
            stats: self.stats,
            counterexample,
        }
    }

    fn add(&mut self) {
        let value = self.next_value;
        self.next_value += 1;
        let before = self.ring.mod_count();
        self.ring.add(value);
        self.model.add(value);
        self.record("producer", format!("add({})", value), true);
        self.check_mutation(before, true);
    }

    fn remove(&mut self) {
        let before = self.ring.mod_count();
        let actual = self.ring.remove();
        let expected = self.model.remove();
        self.record(
            "consumer",
            format!("remove()={:?}", actual),
            actual.is_some(),
        );
        if actual != expected {
            self.push_anomaly(Anomaly::ContentMismatch {
                expected: expected.into_iter().collect(),
                actual: actual.into_iter().collect(),
                step: self.step,
            });
        }
        self.check_mutation(before, expected.is_some());
    }

    fn remove_n(&mut self, n: usize) {
        let before = self.ring.mod_count();
        self.ring.remove_n(n);
        let mutated = self.model.remove_n(n);
        self.record("consumer", format!("remove_n({})", n), mutated);
        self.check_mutation(before, mutated);
    }

    fn clear(&mut self) {
        let before = self.ring.mod_count();
        self.ring.clear();
        self.model.clear();
        self.record("consumer", "clear()".to_string(), true);
        self.check_mutation(before, true);
    }

    fn open_reader(&mut self) {
        if self.readers.len() >= self.config.readers_max {
            self.readers.remove(0);
        }
        let id = self.next_reader_id;
        self.next_reader_id += 1;
        let ring = self.ring;
        self.readers.push(ReaderState {
            reader: ring.reader(),
            id,
            last: None,
        });
        self.stats.readers_opened += 1;
        self.record(&format!("reader-{}", id), "cursor()".to_string(), true);
    }

    fn read_one(&mut self, index: usize) -> Option<u64> {
        let state = &mut self.readers[index];
        if state.reader.has_next() {
            state.reader.next_value()
        } else {
            None
        }
    }

    fn poll(&mut self, i: usize) {
        if self.readers.is_empty() {
            return;
        }
        let index = i % self.readers.len();
        let value = self.read_one(index);
        self.observe(index, value);
    }

    fn drain(&mut self, i: usize) {
        if self.readers.is_empty() {
            return;
        }
        let index = i % self.readers.len();
        // Nothing mutates during a drain, so a correct reader stops within
        // one capacity worth of items.
        for _ in 0..=self.model.capacity {
            let value = self.read_one(index);
            self.observe(index, value);
            if value.is_none() {
                return;
            }
        }
    }

    fn observe(&mut self, index: usize, value: Option<u64>) {
        let id = self.readers[index].id;
        self.record(
            &format!("reader-{}", id),
            format!("next()={:?}", value),
            value.is_some(),
        );
        let Some(value) = value else {
            return;
        };
        self.stats.reads += 1;

        if !self.model.is_live(value) {
            self.push_anomaly(Anomaly::StaleRead {
                reader: id,
                value,
                step: self.step,
            });
        }
        if let Some(previous) = self.readers[index].last {
            if value <= previous {
                self.push_anomaly(Anomaly::OutOfOrder {
                    reader: id,
                    previous,
                    value,
                    step: self.step,
                });
            }
        }
        self.readers[index].last = Some(value);
    }

    fn check_mutation(&mut self, before: u64, mutated: bool) {
        let after = self.ring.mod_count();
        let moved_correctly = if mutated { after > before } else { after == before };
        if !moved_correctly {
            self.push_anomaly(Anomaly::ModCount {
                before,
                after,
                mutated,
                step: self.step,
            });
        }

        let actual = self.ring.count();
        if actual != self.model.live.len() || actual > self.model.capacity {
            self.push_anomaly(Anomaly::CountMismatch {
                expected: self.model.live.len(),
                actual,
                step: self.step,
            });
        }
    }

    fn check_contents(&mut self) {
        let mut reader = self.ring.reader();
        let mut seen = Vec::with_capacity(self.model.capacity);
        while seen.len() <= self.model.capacity && reader.has_next() {
            match reader.next_value() {
                Some(v) => seen.push(v),
                None => break,
            }
        }
        let expected: Vec<u64> = self.model.live.iter().copied().collect();
        if seen != expected {
            self.push_anomaly(Anomaly::ContentMismatch {
                expected,
                actual: seen,
                step: self.step,
            });
        }
    }

    fn record(&mut self, actor: &str, action: String, success: bool) {
        if self.config.trace_len == 0 {
            return;
        }
        if self.trace.len() == self.config.trace_len {
            self.trace.pop_front();
        }
        self.trace.push_back(Action {
            actor: actor.to_string(),
            step: self.step,
            action,
            success,
        });
    }

    fn push_anomaly(&mut self, anomaly: Anomaly) {
        warn!(dst_seed = %self.env.format_seed(), %anomaly, "ring invariant violated");
        self.anomalies.push(anomaly);
    }
}

/// Run a full scenario against `ring` and check every invariant.
pub fn run_ring_scenario<R: DstTestableRing>(
    ring: &R,
    seed: u64,
    ops: &[RingOp],
    config: RunnerConfig,
) -> RingDstResult {
    let mut runner = RingDstRunner::new(ring, seed, config);
    for &op in ops {
        runner.apply(op);
    }
    runner.finish()
}
