
mod fixed_big_int;

use fixed_big_int::FixedBigInt;

/// Verdict of a replay window probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayCheck {
    /// The index has not been seen and is inside (or ahead of) the window.
    Ok,
    /// The index is inside the window but its bit is already set.
    Duplicate,
    /// The index fell behind the window, or sits beyond the detector's
    /// index space and can never enter it.
    TooOld,
}

/// ReplayDetector tracks recently seen packet indices.
///
/// `check` is a pure probe; `accept` commits the most recent successful
/// probe into the window. Callers authenticate the packet between the two
/// calls so that forged packets never advance the window.
pub trait ReplayDetector {
    fn check(&mut self, seq: u64) -> ReplayCheck;
    fn accept(&mut self);
}

/// Sliding-window detector over monotonically increasing indices up to
/// `max_seq`. Suitable for the SRTP 48-bit packet index and the SRTCP
/// 31-bit index, neither of which wraps.
pub struct SlidingWindowDetector {
    accepted: bool,
    seq: u64,
    latest_seq: u64,
    max_seq: u64,
    window_size: usize,
    mask: FixedBigInt,
}

impl SlidingWindowDetector {
    pub fn new(window_size: usize, max_seq: u64) -> Self {
        SlidingWindowDetector {
            accepted: false,
            seq: 0,
            latest_seq: 0,
            max_seq,
            window_size,
            mask: FixedBigInt::new(window_size),
        }
    }
}

impl ReplayDetector for SlidingWindowDetector {
    fn check(&mut self, seq: u64) -> ReplayCheck {
        self.accepted = false;

        if seq > self.max_seq {
            return ReplayCheck::TooOld;
        }

        if seq <= self.latest_seq {
            if self.latest_seq >= self.window_size as u64 + seq {
                return ReplayCheck::TooOld;
            }
            if self.mask.bit((self.latest_seq - seq) as usize) != 0 {
                return ReplayCheck::Duplicate;
            }
        }

        self.accepted = true;
        self.seq = seq;
        ReplayCheck::Ok
    }

    fn accept(&mut self) {
        if !self.accepted {
            return;
        }

        if self.seq > self.latest_seq {
            // Advance the head of the window.
            self.mask.lsh((self.seq - self.latest_seq) as usize);
            self.latest_seq = self.seq;
        }
        self.mask.set_bit((self.latest_seq - self.seq) as usize);
    }
}

/// Detector that accepts everything. Installed where replay protection is
/// not requested, e.g. local (send) contexts.
#[derive(Default)]
pub struct NoOpReplayDetector;

impl ReplayDetector for NoOpReplayDetector {
    fn check(&mut self, _: u64) -> ReplayCheck {
        ReplayCheck::Ok
    }

    fn accept(&mut self) {}
}
