//! Linux-specific monotonic tick source.

use libc::{CLOCK_MONOTONIC, clock_gettime, timespec};

/// Linux tick source backed by `clock_gettime(CLOCK_MONOTONIC)`.
///
/// Ticks are nanoseconds since an unspecified epoch (usually boot), so the
/// reported frequency is fixed at 1 GHz.
pub struct PlatformClock;

impl PlatformClock {
    /// Current monotonic ticks (nanoseconds).
    pub fn ticks() -> i64 {
        let mut ts = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // CLOCK_MONOTONIC cannot fail with a valid timespec pointer.
        unsafe {
            clock_gettime(CLOCK_MONOTONIC, &mut ts);
        }
        // time_t / c_long are narrower than i64 on some targets.
        (ts.tv_sec as i64)
            .saturating_mul(crate::NS_PER_SECOND)
            .saturating_add(ts.tv_nsec as i64)
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

    #[test]
    fn test_frequency_is_nanoseconds() {
        assert_eq!(PlatformClock::ticks_per_second(), 1_000_000_000);
    }
}
