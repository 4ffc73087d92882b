//! Fallback tick source for platforms without a dedicated implementation.

use std::sync::OnceLock;
use std::time::Instant;

/// Fallback tick source using `std::time::Instant` anchored at first use.
///
/// Ticks are nanoseconds since the anchor, reported at 1 GHz.
pub struct PlatformClock;

fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

impl PlatformClock {
    /// Current monotonic ticks (nanoseconds since first use).
    pub fn ticks() -> i64 {
        anchor().elapsed().as_nanos().min(i64::MAX as u128) as i64
    }

    /// Tick frequency (nanosecond resolution).
    pub fn ticks_per_second() -> i64 {
        crate::NS_PER_SECOND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_advance() {
        let a = PlatformClock::ticks();
        let b = PlatformClock::ticks();
        assert!(b >= a);
    }
}
