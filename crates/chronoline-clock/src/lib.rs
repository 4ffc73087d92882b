//! Monotonic microsecond time source for the chronoline timeline scheduler.
//!
//! This crate provides the process-wide clock that every execution strategy
//! measures against:
//!
//! - **Microsecond counter**: [`now_us`] reports monotonic, non-decreasing
//!   microseconds from the platform's highest-resolution monotonic clock
//! - **Tick access**: [`now_ticks`] exposes the raw platform counter, with
//!   [`us_to_ticks`]/[`ticks_to_us`] conversions and [`ticks_per_second`]
//! - **Bounded busy-wait**: [`busy_wait_until`] spins to an absolute deadline
//!   without ever sleeping and reports the observed lateness
//!
//! # Platform Sources
//!
//! - **Linux**: `clock_gettime(CLOCK_MONOTONIC)` (nanosecond ticks)
//! - **Windows**: `QueryPerformanceCounter` / `QueryPerformanceFrequency`
//! - **Other platforms**: `std::time::Instant` anchored at first use
//!
//! # Safety Guarantees
//!
//! - All operations are thread-safe and lock-free after first use
//! - The tick-to-microsecond ratio is computed once per process
//! - A platform frequency below 1 MHz clamps the ratio to 1, so conversions
//!   never divide by zero
//!
//! # Example
//!
//! ```
//! use chronoline_clock as clock;
//!
//! let start = clock::now_us();
//! let late_us = clock::busy_wait_until(start + 50);
//! assert!(clock::now_us() >= start + 50);
//! assert!(late_us >= 0);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

use std::sync::OnceLock;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
mod fallback;

#[cfg(target_os = "linux")]
use crate::linux::PlatformClock;

#[cfg(target_os = "windows")]
use crate::windows::PlatformClock;

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
use crate::fallback::PlatformClock;

/// Microseconds per second.
pub const US_PER_SECOND: i64 = 1_000_000;

/// Nanoseconds per second.
pub const NS_PER_SECOND: i64 = 1_000_000_000;

/// Cached tick rate, resolved once per process.
struct TickRate {
    ticks_per_second: i64,
    ticks_per_us: i64,
}

fn tick_rate() -> &'static TickRate {
    static RATE: OnceLock<TickRate> = OnceLock::new();
    RATE.get_or_init(|| {
        let ticks_per_second = PlatformClock::ticks_per_second().max(1);
        // Sub-MHz counters clamp to one tick per microsecond so the
        // conversion pair never divides by zero.
        let ticks_per_us = (ticks_per_second / US_PER_SECOND).max(1);
        TickRate {
            ticks_per_second,
            ticks_per_us,
        }
    })
}

/// Current monotonic time in raw platform ticks.
#[inline]
#[must_use]
pub fn now_ticks() -> i64 {
    PlatformClock::ticks()
}

/// Current monotonic time in microseconds.
///
/// Non-decreasing for any single call site; the zero point is unspecified
/// (platform boot or first use, depending on the tick source).
#[inline]
#[must_use]
pub fn now_us() -> i64 {
    ticks_to_us(now_ticks())
}

/// Platform tick frequency in ticks per second.
#[inline]
#[must_use]
pub fn ticks_per_second() -> i64 {
    tick_rate().ticks_per_second
}

/// Duration of one platform tick in nanoseconds.
#[inline]
#[must_use]
pub fn ns_per_tick() -> f64 {
    NS_PER_SECOND as f64 / tick_rate().ticks_per_second as f64
}

/// Convert microseconds to platform ticks.
#[inline]
#[must_use]
pub fn us_to_ticks(us: i64) -> i64 {
    us.saturating_mul(tick_rate().ticks_per_us)
}

/// Convert platform ticks to microseconds.
#[inline]
#[must_use]
pub fn ticks_to_us(ticks: i64) -> i64 {
    ticks / tick_rate().ticks_per_us
}

/// Spin until the monotonic clock reaches `target_us`.
///
/// Never sleeps: the wait is a busy loop with [`std::hint::spin_loop`]
/// between samples, so latency is bounded by the clock read itself. CPU
/// cost is 100% for the duration of the wait.
///
/// # Returns
///
/// The observed lateness in microseconds (`now_us() - target_us` at exit,
/// always >= 0). A deadline already in the past returns immediately with
/// the amount by which it was missed.
#[must_use]
pub fn busy_wait_until(target_us: i64) -> i64 {
    loop {
        let now = now_us();
        if now >= target_us {
            return now - target_us;
        }
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_us_is_monotonic() {
        let mut prev = now_us();
        for _ in 0..1_000 {
            let next = now_us();
            assert!(next >= prev, "clock went backwards: {prev} -> {next}");
            prev = next;
        }
    }

    #[test]
    fn test_ticks_per_second_positive() {
        assert!(ticks_per_second() >= 1);
    }

    #[test]
    fn test_ns_per_tick_positive() {
        assert!(ns_per_tick() > 0.0);
    }

    #[test]
    fn test_conversion_round_trip() {
        for us in [0i64, 1, 999, 1_000, 123_456, 10_000_000] {
            let back = ticks_to_us(us_to_ticks(us));
            assert!(
                (back - us).abs() <= 1,
                "round trip {us} -> {back} drifted more than 1us"
            );
        }
    }

    #[test]
    fn test_conversion_is_linear() {
        let one = us_to_ticks(1_000);
        assert_eq!(us_to_ticks(2_000), one * 2);
        assert_eq!(us_to_ticks(10_000), one * 10);
    }

    #[test]
    fn test_busy_wait_reaches_target() {
        let target = now_us() + 200;
        let late = busy_wait_until(target);
        assert!(now_us() >= target);
        assert!(late >= 0);
    }

    #[test]
    fn test_busy_wait_past_deadline_returns_immediately() {
        let target = now_us() - 10_000;
        let late = busy_wait_until(target);
        assert!(late >= 10_000);
    }

    #[test]
    fn test_now_ticks_advances() {
        let a = now_ticks();
        let _ = busy_wait_until(now_us() + 10);
        let b = now_ticks();
        assert!(b > a);
    }
}
