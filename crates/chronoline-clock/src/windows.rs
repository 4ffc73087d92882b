//! Windows-specific monotonic tick source.

use windows::Win32::System::Performance::{QueryPerformanceCounter, QueryPerformanceFrequency};

/// Windows tick source backed by the performance counter.
pub struct PlatformClock;

impl PlatformClock {
    /// Current performance-counter ticks.
    pub fn ticks() -> i64 {
        let mut counter = 0i64;
        // QueryPerformanceCounter cannot fail on XP and later.
        unsafe {
            let _ = QueryPerformanceCounter(&mut counter);
        }
        counter
    }

    /// Performance-counter frequency in ticks per second.
    pub fn ticks_per_second() -> i64 {
        let mut frequency = 0i64;
        unsafe {
            let _ = QueryPerformanceFrequency(&mut frequency);
        }
        frequency.max(1)
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
    fn test_frequency_positive() {
        assert!(PlatformClock::ticks_per_second() >= 1);
    }
}
