// TapShake: Sensitivity Profile
//
// Maps the user-facing 1..=10 dial onto detector thresholds.  Pure functions:
// the same level and sensor kind always give the same config.

use std::time::Duration;

use crate::config::*;
use crate::events::SensorKind;

/// User sensitivity, always within 1..=10.  10 is the easiest to trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensitivityLevel(u8);

impl SensitivityLevel {
    pub const MIN: Self = Self(SENSITIVITY_MIN);
    pub const MAX: Self = Self(SENSITIVITY_MAX);

    /// Out-of-range values are clamped, never rejected.
    pub fn new(level: i32) -> Self {
        Self(level.clamp(SENSITIVITY_MIN as i32, SENSITIVITY_MAX as i32) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// 0.0 at the least sensitive level, 1.0 at the most sensitive.
    fn fraction(self) -> f32 {
        (self.0 - SENSITIVITY_MIN) as f32 / (SENSITIVITY_MAX - SENSITIVITY_MIN) as f32
    }
}

impl Default for SensitivityLevel {
    fn default() -> Self {
        Self(SENSITIVITY_DEFAULT)
    }
}

impl From<i32> for SensitivityLevel {
    fn from(level: i32) -> Self {
        Self::new(level)
    }
}

/// Threshold and timing parameters for one detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub low_threshold: f32,
    /// Upper bound of the tap band.  Shake has none.
    pub high_threshold: Option<f32>,
    pub time_window: Duration,
    pub min_gap: Duration,
    pub required_count: u8,
}

pub struct SensitivityProfile;

impl SensitivityProfile {
    /// Tap band for `level` on a `kind` sensor.
    pub fn tap(level: SensitivityLevel, kind: SensorKind) -> DetectorConfig {
        let (base_min, base_max) = Self::tap_base(kind);
        let low = lerp(base_max, base_min, level.fraction());
        DetectorConfig {
            low_threshold: low,
            high_threshold: Some(low * TAP_HIGH_MULTIPLIER),
            time_window: TAP_TIME_WINDOW,
            min_gap: TAP_MIN_GAP,
            required_count: TAP_REQUIRED_COUNT,
        }
    }

    /// Shake threshold for `level`.  Delta magnitudes are gravity-free on any
    /// sensor kind, so the range does not depend on it.
    pub fn shake(level: SensitivityLevel) -> DetectorConfig {
        DetectorConfig {
            low_threshold: lerp(
                SHAKE_THRESHOLD_LEAST_SENSITIVE,
                SHAKE_THRESHOLD_MOST_SENSITIVE,
                level.fraction(),
            ),
            high_threshold: None,
            time_window: SHAKE_TIME_WINDOW,
            min_gap: SHAKE_MIN_GAP,
            required_count: SHAKE_REQUIRED_COUNT,
        }
    }

    pub fn tap_base(kind: SensorKind) -> (f32, f32) {
        match kind {
            SensorKind::LinearAcceleration => TAP_BASE_LINEAR,
            SensorKind::Accelerometer => TAP_BASE_ACCELEROMETER,
        }
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_levels_are_clamped() {
        assert_eq!(SensitivityLevel::new(0).get(), 1);
        assert_eq!(SensitivityLevel::new(-40).get(), 1);
        assert_eq!(SensitivityLevel::new(11).get(), 10);
        assert_eq!(SensitivityLevel::new(7).get(), 7);
    }

    #[test]
    fn tap_threshold_is_monotonic_in_sensitivity() {
        for kind in [SensorKind::LinearAcceleration, SensorKind::Accelerometer] {
            for a in 1..10 {
                for b in (a + 1)..=10 {
                    let low_a = SensitivityProfile::tap(SensitivityLevel::new(a), kind).low_threshold;
                    let low_b = SensitivityProfile::tap(SensitivityLevel::new(b), kind).low_threshold;
                    assert!(low_a >= low_b, "{kind}: level {a} ({low_a}) < level {b} ({low_b})");
                }
            }
        }
    }

    #[test]
    fn shake_threshold_is_monotonic_in_sensitivity() {
        let mut prev = f32::INFINITY;
        for level in 1..=10 {
            let t = SensitivityProfile::shake(SensitivityLevel::new(level)).low_threshold;
            assert!(t <= prev);
            prev = t;
        }
    }

    #[test]
    fn extremes_hit_the_configured_bounds() {
        let (base_min, base_max) = TAP_BASE_LINEAR;
        let least = SensitivityProfile::tap(SensitivityLevel::MIN, SensorKind::LinearAcceleration);
        let most = SensitivityProfile::tap(SensitivityLevel::MAX, SensorKind::LinearAcceleration);
        assert!((least.low_threshold - base_max).abs() < 1e-5);
        assert!((most.low_threshold - base_min).abs() < 1e-5);

        let shake_least = SensitivityProfile::shake(SensitivityLevel::MIN);
        let shake_most = SensitivityProfile::shake(SensitivityLevel::MAX);
        assert!((shake_least.low_threshold - 20.0).abs() < 1e-5);
        assert!((shake_most.low_threshold - 6.67).abs() < 1e-5);
    }

    #[test]
    fn mid_level_sits_near_the_middle_of_the_band() {
        let (base_min, base_max) = TAP_BASE_LINEAR;
        let mid = (base_max + base_min) / 2.0;
        let cfg = SensitivityProfile::tap(SensitivityLevel::new(5), SensorKind::LinearAcceleration);
        assert!((cfg.low_threshold - mid).abs() <= (base_max - base_min) / 8.0);
        // A 4.0 m/s² knock falls inside the band at level 5.
        assert!(cfg.low_threshold < 4.0);
        assert!(cfg.high_threshold.is_some_and(|high| 4.0 < high));
    }

    #[test]
    fn high_threshold_is_four_times_low() {
        let cfg = SensitivityProfile::tap(SensitivityLevel::new(3), SensorKind::Accelerometer);
        assert_eq!(cfg.high_threshold, Some(cfg.low_threshold * 4.0));
        assert_eq!(cfg.required_count, 2);
        assert!(SensitivityProfile::shake(SensitivityLevel::new(3)).high_threshold.is_none());
    }

    #[test]
    fn profile_is_deterministic() {
        let a = SensitivityProfile::tap(SensitivityLevel::new(8), SensorKind::LinearAcceleration);
        let b = SensitivityProfile::tap(SensitivityLevel::new(8), SensorKind::LinearAcceleration);
        assert_eq!(a, b);
    }
}
