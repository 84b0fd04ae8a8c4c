use core::fmt;

/// Monotonic stack time in milliseconds since router start.
/// Advanced by the message router at the end of every tick; entities only
/// ever compare and add, never read a wall clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct MonoTime {
    ms: u64,
}

impl MonoTime {
    pub fn from_millis(ms: u64) -> MonoTime {
        MonoTime { ms }
    }

    pub fn as_millis(self) -> u64 {
        self.ms
    }

    pub fn add_millis(self, ms: u64) -> MonoTime {
        MonoTime { ms: self.ms + ms }
    }

    /// Difference between two times in milliseconds
    pub fn diff(self, b: Self) -> i64 {
        self.ms as i64 - b.ms as i64
    }

    /// Age of this time compared to now
    #[inline(always)]
    pub fn age(self, now: MonoTime) -> i64 {
        now.diff(self)
    }
}

impl fmt::Display for MonoTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:8}.{:03}", self.ms / 1000, self.ms % 1000)
    }
}

impl fmt::Debug for MonoTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:8}.{:03}", self.ms / 1000, self.ms % 1000)
    }
}
