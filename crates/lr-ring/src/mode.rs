//! Cursor modes: where a cursor sits relative to the live window.
//!
//! The live window is `[tail, head)` read circularly. Either it is a single
//! run (`tail < head`) or it wraps past the end of the slot array
//! (`head <= tail`, which includes the full ring). A cursor's position is
//! classified against that window, and the classification is only trusted
//! if the cursor's lap agrees with it.
//!
//! ```text
//!  unwrapped            wrapped
//!  . . T x x N x H . .   x N x H . . . T x x
//!        Mode1             Mode2Left    Mode2Right lives right of T
//! ```
//!
//! Laps are what make a slot index unambiguous. Every position inside the
//! window has exactly one lap at which it is live:
//!
//! | Mode | Cursor lap must be |
//! |------|--------------------|
//! | Start, Mode1, Mode2Right | the tail's lap |
//! | Mode2Left | one past the tail's lap |
//! | End | the head's lap |
//!
//! A cursor whose lap differs has been overtaken, and its slot now holds
//! something it never saw.

/// Cursor position relative to the live window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Buffer holds nothing.
    Empty,
    /// At the oldest live item.
    Start,
    /// At the write position; nothing further to read.
    End,
    /// Strictly inside an unwrapped window.
    Mode1,
    /// Wrapped window, left of the head.
    Mode2Left,
    /// Wrapped window, right of the tail.
    Mode2Right,
    /// Position can no longer be trusted. Terminal.
    Invalid,
}

/// Consistent view of the buffer's geometry, taken under both role locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Geometry {
    pub(crate) head: usize,
    pub(crate) tail: usize,
    pub(crate) tail_wrap_count: u64,
    pub(crate) count: usize,
    pub(crate) capacity: usize,
    pub(crate) mod_count: u64,
}

impl Geometry {
    /// Lap on which the head position lies.
    pub(crate) fn head_wrap_count(&self) -> u64 {
        if self.tail + self.count >= self.capacity {
            self.tail_wrap_count + 1
        } else {
            self.tail_wrap_count
        }
    }

    fn is_full(&self) -> bool {
        self.count == self.capacity
    }
}

impl Mode {
    /// Classify a cursor at slot `next`, lap `next_wrap_count`.
    ///
    /// On a full ring the tail slot is also the head slot; the lap decides
    /// which one the cursor is at.
    pub(crate) fn classify(geometry: &Geometry, next: usize, next_wrap_count: u64) -> Mode {
        let Geometry { head, tail, .. } = *geometry;

        if geometry.count == 0 {
            Mode::Empty
        } else if next == tail {
            if geometry.is_full() && next_wrap_count == geometry.tail_wrap_count + 1 {
                Mode::End
            } else {
                Mode::Start
            }
        } else if next == head {
            Mode::End
        } else if tail < head {
            if tail < next && next < head {
                Mode::Mode1
            } else {
                Mode::Invalid
            }
        } else if next < head {
            Mode::Mode2Left
        } else if next > tail {
            Mode::Mode2Right
        } else {
            Mode::Invalid
        }
    }

    /// The table of safe transitions.
    ///
    /// Moving into `Empty` is always accepted (it only reports "nothing to
    /// read"); leaving it is only possible by resuming at the tail.
    pub(crate) fn can_become(self, next: Mode) -> bool {
        use Mode::*;

        match (self, next) {
            (Invalid, _) | (_, Invalid) => false,
            (_, Empty) => true,
            (Empty, Start) => true,
            (Empty, _) => false,
            (Start, Start | Mode1 | Mode2Left | Mode2Right | End) => true,
            (Mode1, Mode1 | Mode2Left | Mode2Right | Start | End) => true,
            (Mode2Left, Mode2Left | Mode1 | Mode2Right | Start | End) => true,
            (Mode2Right, Mode2Right | Mode2Left | Mode1 | Start | End) => true,
            (End, End | Start | Mode1 | Mode2Left | Mode2Right) => true,
        }
    }

    /// Whether a cursor on lap `next_wrap_count` can really be in this mode.
    pub(crate) fn lap_matches(self, geometry: &Geometry, next_wrap_count: u64) -> bool {
        let tail_laps = geometry.tail_wrap_count;
        match self {
            Mode::Empty => true,
            Mode::Start | Mode::Mode1 | Mode::Mode2Right => next_wrap_count == tail_laps,
            Mode::Mode2Left => next_wrap_count == tail_laps + 1,
            Mode::End => next_wrap_count == geometry.head_wrap_count(),
            Mode::Invalid => false,
        }
    }

    /// Whether a cursor in this mode has an item to read.
    #[must_use]
    pub fn is_readable(self) -> bool {
        matches!(
            self,
            Mode::Start | Mode::Mode1 | Mode::Mode2Left | Mode::Mode2Right
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(head: usize, tail: usize, count: usize, capacity: usize) -> Geometry {
        Geometry {
            head,
            tail,
            tail_wrap_count: 0,
            count,
            capacity,
            mod_count: 0,
        }
    }

    #[test]
    fn test_classify_unwrapped() {
        // capacity 6, live [1, 4)
        let g = geometry(4, 1, 3, 6);
        assert_eq!(Mode::classify(&g, 1, 0), Mode::Start);
        assert_eq!(Mode::classify(&g, 2, 0), Mode::Mode1);
        assert_eq!(Mode::classify(&g, 4, 0), Mode::End);
        // behind the tail or past the head
        assert_eq!(Mode::classify(&g, 0, 0), Mode::Invalid);
        assert_eq!(Mode::classify(&g, 5, 0), Mode::Invalid);
    }

    #[test]
    fn test_classify_wrapped() {
        // capacity 6, live [4, 6) ++ [0, 2)
        let g = geometry(2, 4, 4, 6);
        assert_eq!(Mode::classify(&g, 4, 0), Mode::Start);
        assert_eq!(Mode::classify(&g, 5, 0), Mode::Mode2Right);
        assert_eq!(Mode::classify(&g, 0, 1), Mode::Mode2Left);
        assert_eq!(Mode::classify(&g, 2, 1), Mode::End);
        assert_eq!(Mode::classify(&g, 3, 0), Mode::Invalid);
    }

    #[test]
    fn test_classify_full_ring_uses_lap() {
        let g = geometry(3, 3, 6, 6);
        assert_eq!(Mode::classify(&g, 3, 0), Mode::Start);
        assert_eq!(Mode::classify(&g, 3, 1), Mode::End);
    }

    #[test]
    fn test_classify_empty() {
        let g = geometry(2, 2, 0, 6);
        assert_eq!(Mode::classify(&g, 2, 0), Mode::Empty);
        assert_eq!(Mode::classify(&g, 5, 3), Mode::Empty);
    }

    #[test]
    fn test_head_wrap_count() {
        assert_eq!(geometry(4, 1, 3, 6).head_wrap_count(), 0);
        assert_eq!(geometry(2, 4, 4, 6).head_wrap_count(), 1);
        // head exactly at slot 0 after filling to the end
        assert_eq!(geometry(0, 2, 4, 6).head_wrap_count(), 1);
        assert_eq!(geometry(3, 3, 6, 6).head_wrap_count(), 1);
    }

    #[test]
    fn test_lap_rules() {
        let g = geometry(2, 4, 4, 6);
        assert!(Mode::Mode2Right.lap_matches(&g, 0));
        assert!(!Mode::Mode2Right.lap_matches(&g, 1));
        assert!(Mode::Mode2Left.lap_matches(&g, 1));
        // left of the head on the tail's own lap means a full lap behind
        assert!(!Mode::Mode2Left.lap_matches(&g, 0));
        assert!(Mode::End.lap_matches(&g, 1));
        assert!(!Mode::End.lap_matches(&g, 0));
    }

    #[test]
    fn test_transition_table() {
        assert!(Mode::Mode1.can_become(Mode::Mode2Left));
        assert!(Mode::Mode2Right.can_become(Mode::Mode1));
        assert!(Mode::End.can_become(Mode::Mode2Left));
        assert!(Mode::Start.can_become(Mode::Empty));
        assert!(Mode::Empty.can_become(Mode::Start));
        assert!(!Mode::Empty.can_become(Mode::Mode1));
        assert!(!Mode::Empty.can_become(Mode::End));
        assert!(!Mode::Invalid.can_become(Mode::Start));
        assert!(!Mode::Mode1.can_become(Mode::Invalid));
    }

    #[test]
    fn test_readable_modes() {
        assert!(Mode::Start.is_readable());
        assert!(Mode::Mode2Left.is_readable());
        assert!(!Mode::End.is_readable());
        assert!(!Mode::Empty.is_readable());
        assert!(!Mode::Invalid.is_readable());
    }
}
