//! Encoder pulse accumulator and the wait-for-target primitive.
//!
//! The robot reports absolute left/right wheel pulse counts since the
//! last `Z_STEPS`; the tracker keeps their mean. A motion primitive
//! resets the tracker, starts the motors and blocks on
//! [`PulseTracker::wait_for`] until the target is reached or the timeout
//! elapses. The wait never fails, it returns whatever accumulated, and
//! the sequencer treats an under-target value as "best effort reached"
//! and proceeds (aborting on timeout would strand the robot mid-route).

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::warn;

/// Shared encoder accumulator. One instance per robot session; the route
/// sequencer owns its value for the duration of each motion primitive.
#[derive(Debug, Default)]
pub struct PulseTracker {
    pulses: Mutex<f32>,
    updated: Condvar,
}

impl PulseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a left/right pulse report. The accumulator becomes the mean
    /// of the two wheels; all pending waiters re-evaluate.
    pub fn on_pulses(&self, left: u32, right: u32) {
        let avg = (left as f32 + right as f32) / 2.0;
        let mut pulses = self.pulses.lock();
        *pulses = avg;
        self.updated.notify_all();
    }

    /// Zero the accumulator before a new motion primitive. Wakes any
    /// stale waiter so it cannot be satisfied by a pre-reset count.
    pub fn reset(&self) {
        let mut pulses = self.pulses.lock();
        *pulses = 0.0;
        self.updated.notify_all();
    }

    /// Current accumulated pulse value.
    pub fn current(&self) -> f32 {
        *self.pulses.lock()
    }

    /// Block until the accumulator reaches `target` or `timeout` elapses.
    ///
    /// Returns the accumulated value in both cases: immediately if the
    /// target is already met, on the first satisfying update otherwise,
    /// or whatever has accumulated when the deadline passes.
    pub fn wait_for(&self, target: f32, timeout: Duration) -> f32 {
        let deadline = Instant::now() + timeout;
        let mut pulses = self.pulses.lock();
        loop {
            if *pulses >= target {
                return *pulses;
            }
            if self.updated.wait_until(&mut pulses, deadline).timed_out() {
                warn!(
                    achieved = *pulses,
                    target, "pulse wait timed out, proceeding with best effort"
                );
                return *pulses;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_average_of_wheels() {
        let tracker = PulseTracker::new();
        tracker.on_pulses(12, 14);
        assert_eq!(tracker.current(), 13.0);
    }

    #[test]
    fn test_immediate_resolve_when_target_met() {
        let tracker = PulseTracker::new();
        tracker.on_pulses(50, 50);
        let t0 = Instant::now();
        let got = tracker.wait_for(46.0, Duration::from_secs(5));
        assert_eq!(got, 50.0);
        assert!(t0.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_resolves_on_satisfying_update() {
        let tracker = Arc::new(PulseTracker::new());
        let feeder = Arc::clone(&tracker);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            feeder.on_pulses(10, 10); // below target, waiter keeps waiting
            thread::sleep(Duration::from_millis(20));
            feeder.on_pulses(48, 44); // avg 46, satisfies
        });

        let got = tracker.wait_for(46.0, Duration::from_secs(5));
        assert_eq!(got, 46.0);
        handle.join().unwrap();
    }

    #[test]
    fn test_timeout_returns_accumulated() {
        let tracker = PulseTracker::new();
        tracker.on_pulses(20, 20);
        let t0 = Instant::now();
        let got = tracker.wait_for(46.0, Duration::from_millis(50));
        assert_eq!(got, 20.0);
        assert!(t0.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_reset_clears_pending_satisfaction() {
        let tracker = Arc::new(PulseTracker::new());
        tracker.on_pulses(100, 100);
        tracker.reset();
        assert_eq!(tracker.current(), 0.0);
        // After reset the old count cannot satisfy a new wait.
        let got = tracker.wait_for(46.0, Duration::from_millis(30));
        assert_eq!(got, 0.0);
    }
}
