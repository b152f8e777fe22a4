// TapShake: Signal Filter
//
// Rate gate in front of every detector.  Samples closer than
// MIN_SAMPLE_INTERVAL to the last accepted one are dropped, which caps the
// effective processing rate at ~100 Hz whatever the sensor's native rate is.

use std::time::{Duration, Instant};

use crate::config::MIN_SAMPLE_INTERVAL;
use crate::events::SensorSample;

/// Euclidean norm of the sample vector.
pub fn magnitude(sample: &SensorSample) -> f32 {
    (sample.x * sample.x + sample.y * sample.y + sample.z * sample.z).sqrt()
}

/// Norm of the change between two consecutive vectors.
pub fn delta_magnitude(prev: &SensorSample, sample: &SensorSample) -> f32 {
    let dx = sample.x - prev.x;
    let dy = sample.y - prev.y;
    let dz = sample.z - prev.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

#[derive(Debug, Clone)]
pub struct SignalFilter {
    min_interval: Duration,
    last_accepted: Option<Instant>,
}

impl Default for SignalFilter {
    fn default() -> Self {
        Self::new(MIN_SAMPLE_INTERVAL)
    }
}

impl SignalFilter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: None,
        }
    }

    /// Gate a sample.  Returns its magnitude when accepted.
    pub fn filter(&mut self, sample: &SensorSample) -> Option<f32> {
        self.accept(sample).then(|| magnitude(sample))
    }

    /// Gate a sample without computing anything.  Out-of-order timestamps and
    /// non-finite readings are dropped as well.
    pub fn accept(&mut self, sample: &SensorSample) -> bool {
        if !sample.is_finite() {
            return false;
        }
        if let Some(last) = self.last_accepted {
            match sample.timestamp.checked_duration_since(last) {
                Some(elapsed) if elapsed >= self.min_interval => {}
                _ => return false,
            }
        }
        self.last_accepted = Some(sample.timestamp);
        true
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(t0: Instant, ms: u64, x: f32, y: f32, z: f32) -> SensorSample {
        SensorSample::new(t0 + Duration::from_millis(ms), x, y, z)
    }

    #[test]
    fn magnitude_is_euclidean_norm() {
        let t0 = Instant::now();
        assert!((magnitude(&at(t0, 0, 3.0, 4.0, 0.0)) - 5.0).abs() < 1e-6);
        assert_eq!(magnitude(&at(t0, 0, 0.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn delta_magnitude_is_never_negative() {
        let t0 = Instant::now();
        let a = at(t0, 0, 1.0, -2.0, 9.0);
        let b = at(t0, 10, -5.0, 6.0, -3.0);
        assert!(delta_magnitude(&a, &b) > 0.0);
        assert_eq!(delta_magnitude(&a, &a), 0.0);
    }

    #[test]
    fn drops_samples_closer_than_min_interval() {
        let t0 = Instant::now();
        let mut filter = SignalFilter::default();

        assert!(filter.filter(&at(t0, 0, 1.0, 0.0, 0.0)).is_some());
        assert!(filter.filter(&at(t0, 4, 1.0, 0.0, 0.0)).is_none());
        assert!(filter.filter(&at(t0, 9, 1.0, 0.0, 0.0)).is_none());
        assert!(filter.filter(&at(t0, 10, 1.0, 0.0, 0.0)).is_some());
        // Dropped samples do not move the reference point.
        assert!(filter.filter(&at(t0, 15, 1.0, 0.0, 0.0)).is_none());
        assert!(filter.filter(&at(t0, 20, 1.0, 0.0, 0.0)).is_some());
    }

    #[test]
    fn out_of_order_sample_is_dropped() {
        let t0 = Instant::now();
        let mut filter = SignalFilter::default();
        assert!(filter.accept(&at(t0, 100, 0.0, 0.0, 0.0)));
        assert!(!filter.accept(&at(t0, 50, 0.0, 0.0, 0.0)));
    }

    #[test]
    fn non_finite_sample_is_dropped_without_moving_the_gate() {
        let t0 = Instant::now();
        let mut filter = SignalFilter::default();
        assert!(filter.accept(&at(t0, 0, 0.0, 0.0, 0.0)));
        assert!(filter.filter(&at(t0, 20, f32::NAN, 0.0, 0.0)).is_none());
        assert!(filter.filter(&at(t0, 30, 0.0, f32::INFINITY, 0.0)).is_none());
        // The gate still measures from t0, so 15 ms later is accepted.
        assert_eq!(filter.filter(&at(t0, 15, 0.0, 3.0, 4.0)), Some(5.0));
    }

    #[test]
    fn reset_accepts_next_sample() {
        let t0 = Instant::now();
        let mut filter = SignalFilter::default();
        assert!(filter.accept(&at(t0, 0, 0.0, 0.0, 0.0)));
        filter.reset();
        assert!(filter.accept(&at(t0, 1, 0.0, 0.0, 0.0)));
    }
}
