//! Sliding-window event limiter backed by a [`RingBuffer`] of timestamps.
//!
//! The ring holds the last `max_events` stamps. When it is full, the oldest
//! stamp (the tail) tells how long until one more event fits in the window.

use std::num::NonZeroUsize;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::RingBuffer;

/// Outcome of [`Throttle::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Proceed,
    /// Milliseconds until the oldest recorded event leaves the window.
    Wait(u64),
}

/// At most `max_events` events per `window`.
#[derive(Debug)]
pub struct Throttle {
    stamps: RingBuffer<u64>,
    window_ms: u64,
    origin: Instant,
    /// Makes check and record in `acquire` one step. Not held while sleeping.
    gate: Mutex<()>,
}

impl Throttle {
    #[must_use]
    pub fn new(max_events: NonZeroUsize, window: Duration) -> Self {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        Self {
            stamps: RingBuffer::new(max_events),
            window_ms,
            origin: Instant::now(),
            gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn max_events(&self) -> usize {
        self.stamps.capacity()
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Decide whether an event at `now_ms` fits in the window.
    #[must_use]
    pub fn check(&self, now_ms: u64) -> ThrottleDecision {
        if !self.stamps.is_full() {
            return ThrottleDecision::Proceed;
        }
        match self.stamps.tail_item() {
            Some(oldest) => {
                let frees_at = oldest.saturating_add(self.window_ms);
                if frees_at > now_ms {
                    ThrottleDecision::Wait(frees_at - now_ms)
                } else {
                    ThrottleDecision::Proceed
                }
            }
            None => ThrottleDecision::Proceed,
        }
    }

    /// Record an event at `now_ms`, evicting the oldest stamp when full.
    pub fn record(&self, now_ms: u64) {
        self.stamps.add(now_ms);
    }

    /// Block until an event is allowed, then record it.
    pub fn acquire(&self) {
        loop {
            let wait_ms = {
                let _gate = self.gate.lock();
                let now_ms = self.elapsed_ms();
                match self.check(now_ms) {
                    ThrottleDecision::Proceed => {
                        self.record(now_ms);
                        return;
                    }
                    ThrottleDecision::Wait(wait_ms) => wait_ms,
                }
            };
            debug!(
                wait_ms,
                max_events = self.max_events(),
                "event limit reached, throttling"
            );
            thread::sleep(Duration::from_millis(wait_ms));
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lr_dst::SimClock;

    fn throttle(max_events: usize, window_ms: u64) -> Throttle {
        Throttle::new(
            NonZeroUsize::new(max_events).unwrap(),
            Duration::from_millis(window_ms),
        )
    }

    #[test]
    fn test_allows_up_to_max_events() {
        let limiter = throttle(3, 1000);
        let mut clock = SimClock::new();
        for _ in 0..3 {
            assert_eq!(limiter.check(clock.now_ms()), ThrottleDecision::Proceed);
            limiter.record(clock.now_ms());
            clock.advance_ms(10);
        }
        // stamps at 0, 10, 20; oldest frees at 1000
        assert_eq!(limiter.check(clock.now_ms()), ThrottleDecision::Wait(970));
    }

    #[test]
    fn test_window_slides_with_oldest_stamp() {
        let limiter = throttle(2, 100);
        let mut clock = SimClock::new();
        limiter.record(clock.now_ms());
        clock.advance_ms(50);
        limiter.record(clock.now_ms());

        clock.advance_ms(50);
        assert_eq!(limiter.check(clock.now_ms()), ThrottleDecision::Proceed);
        limiter.record(clock.now_ms());

        // oldest is now the stamp at 50
        clock.advance_ms(20);
        assert_eq!(limiter.check(clock.now_ms()), ThrottleDecision::Wait(30));
    }

    #[test]
    fn test_acquire_without_contention_does_not_wait() {
        let limiter = throttle(4, 60_000);
        let started = Instant::now();
        for _ in 0..4 {
            limiter.acquire();
        }
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(
            limiter.check(limiter.elapsed_ms()),
            ThrottleDecision::Wait(_)
        ));
    }

    #[test]
    fn test_acquire_sleeps_until_window_frees() {
        let limiter = throttle(1, 30);
        let started = Instant::now();
        limiter.acquire();
        limiter.acquire();
        assert!(started.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_waiting_acquire_releases_gate() {
        let limiter = throttle(1, 300);
        limiter.acquire();
        thread::scope(|s| {
            s.spawn(|| limiter.acquire());
            thread::sleep(Duration::from_millis(50));
            // the spawned call is asleep waiting for the window
            assert!(limiter.gate.try_lock().is_some());
        });
        assert!(matches!(
            limiter.check(limiter.elapsed_ms()),
            ThrottleDecision::Wait(_)
        ));
    }

    #[test]
    fn test_accessors() {
        let limiter = throttle(30, 10_000);
        assert_eq!(limiter.max_events(), 30);
        assert_eq!(limiter.window(), Duration::from_secs(10));
    }
}
