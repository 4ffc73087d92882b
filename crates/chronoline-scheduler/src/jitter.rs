//! Jitter compensation and measurement.
//!
//! Waiting strategies wake late by some platform-dependent amount. The
//! compensator tracks that lateness as a signed offset and pre-shifts every
//! wait by it, so the effective wake time converges on the scheduled time.
//! The stats collector is a debug-only companion that records raw deltas
//! for post-hoc analysis.

use std::fmt;

/// Default convergence divisor (`offset += delta / 4`).
pub const DEFAULT_DIVISOR: i64 = 4;

/// Configuration for the jitter compensator.
///
/// The default is the stable quarter-step rule. The aggressive
/// three-quarter step converges faster at the risk of overshoot, and
/// priming seeds the offset with the first observed delta outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JitterConfig {
    /// Whether compensation is applied at all.
    pub enabled: bool,

    /// Convergence divisor `K`; each sample moves the offset by
    /// `delta / K`. Valid range is 3 to 4.
    pub divisor: i64,

    /// Use the aggressive `offset += delta * 3 / 4` step instead of the
    /// `delta / K` step.
    pub aggressive: bool,

    /// Seed the offset with the first delta (`offset = delta`), switching
    /// to the exponential rule from the second sample on.
    pub prime_first: bool,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            divisor: DEFAULT_DIVISOR,
            aggressive: false,
            prime_first: false,
        }
    }
}

impl JitterConfig {
    /// Compensation disabled entirely (the polled strategy's setting).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the convergence divisor.
    #[must_use]
    pub fn with_divisor(mut self, divisor: i64) -> Self {
        self.divisor = divisor;
        self
    }

    /// Enable or disable the aggressive three-quarter step.
    #[must_use]
    pub fn with_aggressive(mut self, aggressive: bool) -> Self {
        self.aggressive = aggressive;
        self
    }

    /// Enable or disable first-sample priming.
    #[must_use]
    pub fn with_prime_first(mut self, prime_first: bool) -> Self {
        self.prime_first = prime_first;
        self
    }

    /// Clamp fields into their valid ranges.
    pub fn normalize(&mut self) {
        self.divisor = self.divisor.clamp(3, 4);
    }

    /// Whether all fields are within their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (3..=4).contains(&self.divisor)
    }
}

/// Accumulating wake-time correction.
///
/// Before waiting for a node scheduled at `t`, a strategy waits for
/// [`wait_target`](JitterCompensator::wait_target)`(t)` = `t - offset`,
/// intentionally waking early by the accumulated bias. After dispatch it
/// feeds the measured `delta = actual - scheduled` back through
/// [`record`](JitterCompensator::record), which nudges the offset by the
/// configured convergence step. At the fixed point the measured delta is
/// zero: wakes land on the scheduled time.
#[derive(Debug, Clone)]
pub struct JitterCompensator {
    config: JitterConfig,
    offset_us: i64,
    samples: u64,
}

impl JitterCompensator {
    /// Create a compensator with the given configuration (normalized).
    #[must_use]
    pub fn new(mut config: JitterConfig) -> Self {
        config.normalize();
        Self {
            config,
            offset_us: 0,
            samples: 0,
        }
    }

    /// The wait deadline for a node scheduled at `scheduled_us`.
    ///
    /// The caller still floors the resulting wait duration at zero; the
    /// offset never turns an already-due node into a future one.
    #[must_use]
    pub fn wait_target(&self, scheduled_us: i64) -> i64 {
        if !self.config.enabled {
            return scheduled_us;
        }
        scheduled_us.saturating_sub(self.offset_us)
    }

    /// Feed back a measured `delta_us = actual - scheduled`.
    pub fn record(&mut self, delta_us: i64) {
        if !self.config.enabled {
            return;
        }

        self.samples += 1;
        if self.config.prime_first && self.samples == 1 {
            self.offset_us = delta_us;
            return;
        }

        if self.config.aggressive {
            self.offset_us += delta_us * 3 / 4;
        } else {
            self.offset_us += delta_us / self.config.divisor;
        }
    }

    /// Current accumulated offset in microseconds.
    #[must_use]
    pub fn offset_us(&self) -> i64 {
        self.offset_us
    }

    /// Number of deltas recorded since creation or reset.
    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Whether compensation is applied.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Zero the offset and sample count.
    pub fn reset(&mut self) {
        self.offset_us = 0;
        self.samples = 0;
    }
}

impl Default for JitterCompensator {
    fn default() -> Self {
        Self::new(JitterConfig::default())
    }
}

/// Debug-only jitter collector.
///
/// Records raw `delta_us` samples in a bounded buffer alongside running
/// aggregates, for post-hoc analysis of a strategy's wake behavior. Never
/// attached by default.
#[derive(Clone)]
pub struct JitterStats {
    deltas: Vec<i64>,
    max_samples: usize,
    next_sample_index: usize,
    min_us: i64,
    max_us: i64,
    sum_us: i64,
    count: u64,
}

impl JitterStats {
    /// Default bounded sample capacity.
    pub const DEFAULT_MAX_SAMPLES: usize = 4_096;

    /// Create a collector with the default sample capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_MAX_SAMPLES)
    }

    /// Create a collector retaining at most `max_samples` raw deltas.
    ///
    /// Aggregates keep counting past the cap; only the raw buffer wraps.
    #[must_use]
    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            deltas: Vec::with_capacity(max_samples),
            max_samples,
            next_sample_index: 0,
            min_us: i64::MAX,
            max_us: i64::MIN,
            sum_us: 0,
            count: 0,
        }
    }

    /// Record one measured delta.
    pub fn record(&mut self, delta_us: i64) {
        self.count += 1;
        self.min_us = self.min_us.min(delta_us);
        self.max_us = self.max_us.max(delta_us);
        self.sum_us = self.sum_us.saturating_add(delta_us);

        if self.max_samples == 0 {
            return;
        }
        if self.deltas.len() < self.max_samples {
            self.deltas.push(delta_us);
        } else {
            self.deltas[self.next_sample_index] = delta_us;
            self.next_sample_index = (self.next_sample_index + 1) % self.max_samples;
        }
    }

    /// Raw retained deltas, oldest first until the buffer wraps.
    #[must_use]
    pub fn deltas(&self) -> &[i64] {
        &self.deltas
    }

    /// Smallest recorded delta, or `None` before the first sample.
    #[must_use]
    pub fn min_us(&self) -> Option<i64> {
        (self.count > 0).then_some(self.min_us)
    }

    /// Largest recorded delta, or `None` before the first sample.
    #[must_use]
    pub fn max_us(&self) -> Option<i64> {
        (self.count > 0).then_some(self.max_us)
    }

    /// Sum of all recorded deltas (saturating).
    #[must_use]
    pub fn sum_us(&self) -> i64 {
        self.sum_us
    }

    /// Number of recorded deltas.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean delta over all samples, or `None` before the first.
    #[must_use]
    pub fn mean_us(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum_us as f64 / self.count as f64)
    }

    /// Discard all samples and aggregates.
    pub fn reset(&mut self) {
        self.deltas.clear();
        self.next_sample_index = 0;
        self.min_us = i64::MAX;
        self.max_us = i64::MIN;
        self.sum_us = 0;
        self.count = 0;
    }
}

impl Default for JitterStats {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JitterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JitterStats")
            .field("count", &self.count)
            .field("min_us", &self.min_us())
            .field("max_us", &self.max_us())
            .field("mean_us", &self.mean_us())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_quarter_step() {
        let config = JitterConfig::default();
        assert!(config.enabled);
        assert_eq!(config.divisor, 4);
        assert!(!config.aggressive);
        assert!(!config.prime_first);
        assert!(config.is_valid());
    }

    #[test]
    fn test_normalize_clamps_divisor() {
        let mut config = JitterConfig::default().with_divisor(100);
        config.normalize();
        assert_eq!(config.divisor, 4);

        let mut config = JitterConfig::default().with_divisor(0);
        config.normalize();
        assert_eq!(config.divisor, 3);
    }

    #[test]
    fn test_offset_accumulates_quarter_steps() {
        let mut comp = JitterCompensator::default();
        comp.record(400);
        assert_eq!(comp.offset_us(), 100);
        comp.record(400);
        assert_eq!(comp.offset_us(), 200);
    }

    #[test]
    fn test_wait_target_pre_shifts() {
        let mut comp = JitterCompensator::default();
        comp.record(400);
        assert_eq!(comp.wait_target(10_000), 9_900);
    }

    #[test]
    fn test_disabled_compensator_is_inert() {
        let mut comp = JitterCompensator::new(JitterConfig::disabled());
        comp.record(1_000);
        assert_eq!(comp.offset_us(), 0);
        assert_eq!(comp.wait_target(5_000), 5_000);
        assert_eq!(comp.samples(), 0);
    }

    #[test]
    fn test_prime_first_seeds_offset() {
        let config = JitterConfig::default().with_prime_first(true);
        let mut comp = JitterCompensator::new(config);

        comp.record(320);
        assert_eq!(comp.offset_us(), 320);

        // Second sample falls back to the exponential rule.
        comp.record(-80);
        assert_eq!(comp.offset_us(), 320 - 20);
    }

    #[test]
    fn test_aggressive_step() {
        let config = JitterConfig::default().with_aggressive(true);
        let mut comp = JitterCompensator::new(config);
        comp.record(400);
        assert_eq!(comp.offset_us(), 300);
    }

    #[test]
    fn test_reset_zeroes_offset() {
        let mut comp = JitterCompensator::default();
        comp.record(4_000);
        assert_ne!(comp.offset_us(), 0);

        comp.reset();
        assert_eq!(comp.offset_us(), 0);
        assert_eq!(comp.samples(), 0);
    }

    #[test]
    fn test_converges_to_constant_latency() {
        // Model a platform with a constant 250us wake latency: each wake
        // lands at wait_target + 250, so delta = 250 - offset.
        let mut comp = JitterCompensator::default();
        let latency = 250i64;

        let mut delta = 0;
        for _ in 0..30 {
            delta = latency - comp.offset_us();
            comp.record(delta);
        }

        // Integer quarter-steps stall once the residual drops below the
        // divisor.
        assert!(
            delta.abs() <= 3,
            "steady-state delta {delta} has not converged"
        );
        assert!((comp.offset_us() - latency).abs() <= 3);
    }

    #[test]
    fn test_stats_aggregates() {
        let mut stats = JitterStats::new();
        assert_eq!(stats.min_us(), None);
        assert_eq!(stats.mean_us(), None);

        stats.record(10);
        stats.record(-4);
        stats.record(30);

        assert_eq!(stats.min_us(), Some(-4));
        assert_eq!(stats.max_us(), Some(30));
        assert_eq!(stats.sum_us(), 36);
        assert_eq!(stats.count(), 3);
        assert_eq!(stats.mean_us(), Some(12.0));
        assert_eq!(stats.deltas(), &[10, -4, 30]);
    }

    #[test]
    fn test_stats_buffer_wraps() {
        let mut stats = JitterStats::with_capacity(3);
        for delta in 1..=5 {
            stats.record(delta);
        }

        assert_eq!(stats.count(), 5);
        assert_eq!(stats.deltas().len(), 3);
        let mut retained = stats.deltas().to_vec();
        retained.sort_unstable();
        assert_eq!(retained, vec![3, 4, 5]);
        assert_eq!(stats.max_us(), Some(5));
    }

    #[test]
    fn test_stats_reset() {
        let mut stats = JitterStats::new();
        stats.record(100);
        stats.reset();

        assert_eq!(stats.count(), 0);
        assert_eq!(stats.min_us(), None);
        assert!(stats.deltas().is_empty());
    }
}
