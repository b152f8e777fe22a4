// TapShake: Engine Configuration
//
// Timing constants, threshold ranges and host defaults.  Every detector and
// the coordinator read their defaults from here.

use std::time::Duration;

use crate::events::SensorKind;

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(10); // ~100 Hz cap
pub const REPLAY_SAMPLE_INTERVAL_MS: u64 = 5; // simulated native rate (~200 Hz)

// ---------------------------------------------------------------------------
// Double back-tap
// ---------------------------------------------------------------------------
pub const TAP_MIN_GAP: Duration = Duration::from_millis(80);
pub const TAP_TIME_WINDOW: Duration = Duration::from_millis(500);
pub const TAP_REQUIRED_COUNT: u8 = 2;
pub const TAP_HIGH_MULTIPLIER: f32 = 4.0;

// (base_min, base_max) in m/s², per sensor kind.  Level 10 maps to base_min.
pub const TAP_BASE_LINEAR: (f32, f32) = (1.5, 5.5);
pub const TAP_BASE_ACCELEROMETER: (f32, f32) = (10.8, 13.5);

// ---------------------------------------------------------------------------
// Triple shake
// ---------------------------------------------------------------------------
pub const SHAKE_MIN_GAP: Duration = Duration::from_millis(200);
pub const SHAKE_TIME_WINDOW: Duration = Duration::from_millis(800);
pub const SHAKE_REQUIRED_COUNT: u8 = 3;
pub const SHAKE_THRESHOLD_LEAST_SENSITIVE: f32 = 20.0;
pub const SHAKE_THRESHOLD_MOST_SENSITIVE: f32 = 6.67;

// ---------------------------------------------------------------------------
// Arbitration
// ---------------------------------------------------------------------------
pub const TRIGGER_COOLDOWN: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Sensitivity
// ---------------------------------------------------------------------------
pub const SENSITIVITY_MIN: u8 = 1;
pub const SENSITIVITY_MAX: u8 = 10;
pub const SENSITIVITY_DEFAULT: u8 = 5;

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------
pub const TIMER_THREAD_NAME: &str = "gesture-timer";
pub const STACK_TIMER: usize = 16 * 1024;
pub const REPLAY_THREAD_NAME: &str = "sensor-replay";
pub const STACK_REPLAY: usize = 32 * 1024;

/// Sensor kinds tried in order when a detector picks its source.
pub const SENSOR_PREFERENCE: [SensorKind; 2] =
    [SensorKind::LinearAcceleration, SensorKind::Accelerometer];

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Host-facing settings for a [`crate::service::GestureService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Raw user value; clamped to 1..=10 when applied.
    pub sensitivity: i32,
    pub tap_enabled: bool,
    pub shake_enabled: bool,
    pub cooldown: Duration,
    pub sensor_preference: Vec<SensorKind>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sensitivity: SENSITIVITY_DEFAULT as i32,
            tap_enabled: true,
            shake_enabled: true,
            cooldown: TRIGGER_COOLDOWN,
            sensor_preference: SENSOR_PREFERENCE.to_vec(),
        }
    }
}
