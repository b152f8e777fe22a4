// TapShake: Samples, Gestures & Events

use std::fmt;
use std::time::Instant;

// ---------------------------------------------------------------------------
// Sensor Data (3-axis acceleration)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub timestamp: Instant,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SensorSample {
    pub fn new(timestamp: Instant, x: f32, y: f32, z: f32) -> Self {
        Self { timestamp, x, y, z }
    }

    /// False when any axis is NaN or infinite (a glitching driver).
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Which underlying sensor a stream comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// Gravity already removed; preferred.
    LinearAcceleration,
    /// Raw accelerometer including gravity (~9.81 m/s² at rest).
    Accelerometer,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinearAcceleration => "linear-acceleration",
            Self::Accelerometer => "accelerometer",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Gestures
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    DoubleTap,
    TripleShake,
}

impl GestureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoubleTap => "double-tap",
            Self::TripleShake => "triple-shake",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened after a gesture was recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Coordinator granted the trigger and the actuator ran.
    Activated,
    /// Another trigger already owns the current cooldown window.
    Suppressed,
    /// Trigger granted but the actuator reported an error. The cooldown stands.
    ActuatorFailed(String),
}

impl TriggerOutcome {
    pub fn was_granted(&self) -> bool {
        !matches!(self, Self::Suppressed)
    }
}

// ---------------------------------------------------------------------------
// Gesture Events: published to the host via channel
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub at: Instant,
    pub outcome: TriggerOutcome,
}
