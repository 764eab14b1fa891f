//! Monotonic sample clock: converts host-monotonic ticks into a coherent
//! `(sample_time, host_time)` pair on fixed-size period boundaries.
//!
//! The host audio server schedules IO in periods of `period_frames` frames;
//! between cycles it asks "what sample time corresponds to this host time,
//! and vice versa". The two answers must always refer to the same period
//! boundary, never independently rounded. The elapsed-ticks-to-frames
//! conversion follows the same floor-division-on-nanoseconds shape used for
//! xrun-gap detection in IOProc-style duplex audio backends: convert the
//! tick delta to nanoseconds, then floor-divide by the nanoseconds-per-period.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Host-clock ticks here are nanoseconds since an arbitrary epoch, taken
/// from `Instant`. There is no separate timebase ratio to apply because
/// `Instant` is already nanosecond-resolution monotonic time on every
/// platform this runs on.
fn host_monotonic_ns(epoch: Instant) -> u64 {
    epoch.elapsed().as_nanos() as u64
}

/// Per-device sample clock state.
pub struct SampleClock {
    sample_rate: u32,
    period_frames: u32,
    ns_per_period: u64,
    epoch: Instant,
    ticks_at_zero_ns: AtomicU64,
    running: AtomicBool,
}

/// A coherent pair of timestamps referring to the same period boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStamp {
    pub sample_time: u64,
    pub host_time_ns: u64,
    pub seed: u64,
}

impl SampleClock {
    pub fn new(sample_rate: u32, period_frames: u32) -> Self {
        let ns_per_period = (period_frames as u64) * 1_000_000_000 / sample_rate as u64;
        Self {
            sample_rate,
            period_frames,
            ns_per_period,
            epoch: Instant::now(),
            ticks_at_zero_ns: AtomicU64::new(0),
            running: AtomicBool::new(false),
        }
    }

    pub fn ns_per_period(&self) -> u64 {
        self.ns_per_period
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Snapshot `ticks_at_zero`, reset sample time to zero, and mark the
    /// clock running.
    pub fn start_io(&self) {
        self.ticks_at_zero_ns
            .store(host_monotonic_ns(self.epoch), Ordering::Relaxed);
        self.running.store(true, Ordering::Relaxed);
    }

    pub fn stop_io(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Returns the coherent `(sample_time, host_time, seed)` triple for the
    /// current instant, floored to the nearest completed period.
    pub fn zero_timestamp(&self) -> TimeStamp {
        self.zero_timestamp_at(host_monotonic_ns(self.epoch))
    }

    /// Same as `zero_timestamp` but evaluated at an explicit host time,
    /// to make the period-flooring deterministic and testable.
    pub fn zero_timestamp_at(&self, now_ns: u64) -> TimeStamp {
        let ticks_at_zero = self.ticks_at_zero_ns.load(Ordering::Relaxed);
        let elapsed_ns = now_ns.saturating_sub(ticks_at_zero);
        let periods = elapsed_ns / self.ns_per_period;
        let sample_time = periods * self.period_frames as u64;
        let host_time_ns = ticks_at_zero + periods * self.ns_per_period;

        TimeStamp {
            sample_time,
            host_time_ns,
            seed: 1,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn period_frames(&self) -> u32 {
        self.period_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timestamp_floors_to_period_boundaries() {
        // 48kHz, 480-frame (10ms) periods, matching the documented scenario.
        let clock = SampleClock::new(48_000, 480);
        clock.start_io();

        let ts0 = clock.zero_timestamp_at(0);
        assert_eq!(ts0.sample_time, 0);

        let ts15 = clock.zero_timestamp_at(15_000_000);
        assert_eq!(ts15.sample_time, 480);

        let ts25 = clock.zero_timestamp_at(25_000_000);
        assert_eq!(ts25.sample_time, 960);
    }

    #[test]
    fn host_time_and_sample_time_stay_coherent() {
        let clock = SampleClock::new(48_000, 480);
        clock.start_io();

        let ts = clock.zero_timestamp_at(33_000_000);
        let periods = ts.sample_time / clock.period_frames() as u64;
        let expected_host_time = periods * clock.ns_per_period();
        assert_eq!(ts.host_time_ns, expected_host_time);
    }

    #[test]
    fn sample_time_is_non_decreasing_across_successive_calls() {
        let clock = SampleClock::new(48_000, 480);
        clock.start_io();

        let mut last = 0u64;
        for now_ns in [0, 5_000_000, 10_000_000, 10_500_000, 50_000_000] {
            let ts = clock.zero_timestamp_at(now_ns);
            assert!(ts.sample_time >= last);
            last = ts.sample_time;
        }
    }

    #[test]
    fn start_io_resets_the_zero_point() {
        let clock = SampleClock::new(48_000, 480);
        clock.start_io();
        assert!(clock.is_running());
        clock.stop_io();
        assert!(!clock.is_running());
    }
}
