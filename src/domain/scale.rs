//! Weight post-processing.
//!
//! The scale only pushes instantaneous weight readings; flow rate, timer
//! elapsed time and reading stability are derived locally from those.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Estimates pour rate as the least-squares slope of weight over a sliding
/// time window.
pub struct FlowRateEstimator {
    samples: VecDeque<(Instant, f64)>,
    window: Duration,
}

impl FlowRateEstimator {
    pub fn new(window: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            window,
        }
    }

    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    pub fn push(&mut self, at: Instant, weight: f64) {
        self.samples.push_back((at, weight));
        while let Some(&(oldest, _)) = self.samples.front() {
            if at.duration_since(oldest) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Drop all retained samples. Called on tare and on disconnect so that a
    /// weight jump does not register as flow.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Slope of weight over the retained window, in units per second.
    /// Returns 0.0 until at least two samples are available.
    pub fn rate(&self) -> f64 {
        let n = self.samples.len();
        if n < 2 {
            return 0.0;
        }

        let origin = self.samples[0].0;
        let mut sum_t = 0.0;
        let mut sum_w = 0.0;
        let mut sum_tt = 0.0;
        let mut sum_tw = 0.0;
        for &(at, weight) in &self.samples {
            let t = at.duration_since(origin).as_secs_f64();
            sum_t += t;
            sum_w += weight;
            sum_tt += t * t;
            sum_tw += t * weight;
        }

        let count = n as f64;
        let denominator = count * sum_tt - sum_t * sum_t;
        if denominator.abs() < f64::EPSILON {
            return 0.0;
        }
        (count * sum_tw - sum_t * sum_w) / denominator
    }
}

/// Local stopwatch mirroring the timer commands sent to the scale.
///
/// The scale runs its own timer on the device display but never reports it
/// back, so elapsed time is tracked here from the same start/stop/reset
/// commands the device receives.
#[derive(Debug, Default)]
pub struct ShotTimer {
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl ShotTimer {
    pub fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    pub fn stop(&mut self, now: Instant) {
        if let Some(started) = self.started_at.take() {
            self.accumulated += now.duration_since(started);
        }
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started) => self.accumulated + now.duration_since(started),
            None => self.accumulated,
        }
    }
}

/// Tracks whether the reading has settled.
///
/// A reading counts as stable once all samples across the last second agree
/// with the newest one within a small tolerance.
pub struct StabilityTracker {
    samples: VecDeque<(Instant, f64)>,
    window: Duration,
    tolerance: f64,
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self {
            samples: VecDeque::new(),
            window: Duration::from_secs(1),
            tolerance: 0.1,
        }
    }
}

impl StabilityTracker {
    pub fn push(&mut self, at: Instant, weight: f64) {
        self.samples.push_back((at, weight));
        while let Some(&(oldest, _)) = self.samples.front() {
            if at.duration_since(oldest) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn is_stable(&self) -> bool {
        let (Some(&(first, _)), Some(&(last, newest))) =
            (self.samples.front(), self.samples.back())
        else {
            return false;
        };

        // Not enough history yet to call it settled.
        if last.duration_since(first) < self.window / 2 {
            return false;
        }

        self.samples
            .iter()
            .all(|&(_, weight)| (weight - newest).abs() <= self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(origin: Instant, millis: u64) -> Instant {
        origin + Duration::from_millis(millis)
    }

    #[test]
    fn test_flow_rate_of_steady_pour() {
        let origin = Instant::now();
        let mut estimator = FlowRateEstimator::new(Duration::from_secs(3));

        // 2 g/s pour sampled at 10 Hz.
        for i in 0..20 {
            estimator.push(at(origin, i * 100), i as f64 * 0.2);
        }

        assert!((estimator.rate() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_flow_rate_requires_two_samples() {
        let origin = Instant::now();
        let mut estimator = FlowRateEstimator::new(Duration::from_secs(3));
        assert_eq!(estimator.rate(), 0.0);

        estimator.push(origin, 10.0);
        assert_eq!(estimator.rate(), 0.0);
    }

    #[test]
    fn test_flow_rate_window_discards_old_samples() {
        let origin = Instant::now();
        let mut estimator = FlowRateEstimator::new(Duration::from_secs(1));

        // A fast pour followed by a full stop; once the window has slid past
        // the pour, the rate must settle back to zero.
        for i in 0..10 {
            estimator.push(at(origin, i * 100), i as f64);
        }
        for i in 10..40 {
            estimator.push(at(origin, i * 100), 9.0);
        }

        assert!(estimator.rate().abs() < 1e-6);
    }

    #[test]
    fn test_flow_rate_reset() {
        let origin = Instant::now();
        let mut estimator = FlowRateEstimator::new(Duration::from_secs(3));
        estimator.push(origin, 0.0);
        estimator.push(at(origin, 500), 5.0);
        assert!(estimator.rate() > 0.0);

        estimator.reset();
        assert_eq!(estimator.rate(), 0.0);
    }

    #[test]
    fn test_shot_timer_accumulates_across_stops() {
        let origin = Instant::now();
        let mut timer = ShotTimer::default();
        assert!(!timer.is_running());

        timer.start(origin);
        assert!(timer.is_running());
        timer.stop(at(origin, 1500));
        assert_eq!(timer.elapsed(at(origin, 9000)), Duration::from_millis(1500));

        timer.start(at(origin, 10_000));
        assert_eq!(
            timer.elapsed(at(origin, 10_500)),
            Duration::from_millis(2000)
        );

        timer.reset();
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed(at(origin, 20_000)), Duration::ZERO);
    }

    #[test]
    fn test_shot_timer_start_is_idempotent() {
        let origin = Instant::now();
        let mut timer = ShotTimer::default();
        timer.start(origin);
        timer.start(at(origin, 1000));
        timer.stop(at(origin, 2000));
        assert_eq!(timer.elapsed(at(origin, 2000)), Duration::from_millis(2000));
    }

    #[test]
    fn test_stability_settles_after_window() {
        let origin = Instant::now();
        let mut tracker = StabilityTracker::default();

        tracker.push(origin, 18.02);
        assert!(!tracker.is_stable());

        for i in 1..12 {
            tracker.push(at(origin, i * 100), 18.02);
        }
        assert!(tracker.is_stable());
    }

    #[test]
    fn test_stability_broken_by_movement() {
        let origin = Instant::now();
        let mut tracker = StabilityTracker::default();
        for i in 0..12 {
            tracker.push(at(origin, i * 100), 18.0);
        }
        assert!(tracker.is_stable());

        tracker.push(at(origin, 1300), 19.5);
        assert!(!tracker.is_stable());
    }
}
