//! Property-based tests for the clock crate.

use chronoline_clock as clock;
use quickcheck_macros::quickcheck;

#[quickcheck]
fn conversion_round_trip_within_native_rounding(us: i64) {
    let us = us.clamp(0, 1_000_000_000_000);
    let back = clock::ticks_to_us(clock::us_to_ticks(us));

    // One microsecond of native rounding is the contract.
    assert!(
        (back - us).abs() <= 1,
        "round trip {us} -> {back} drifted more than 1us"
    );
}

#[quickcheck]
fn ticks_to_us_is_monotone(a: i64, b: i64) {
    let a = a.clamp(0, i64::MAX / 2);
    let b = b.clamp(0, i64::MAX / 2);
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

    assert!(clock::ticks_to_us(lo) <= clock::ticks_to_us(hi));
}

#[quickcheck]
fn busy_wait_lateness_is_non_negative(offset: u16) {
    // Tiny offsets keep the spin bounded under test load.
    let target = clock::now_us() + i64::from(offset % 50);
    let late = clock::busy_wait_until(target);

    assert!(late >= 0);
    assert!(clock::now_us() >= target);
}
