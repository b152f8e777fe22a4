// TapShake: Sensor Replay Task
//
// Streams a scripted motion profile into a simulated sensor at a fixed
// native rate, the way a real driver would push IMU readings.  Used by the
// host binary to exercise the whole pipeline in real time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::REPLAY_SAMPLE_INTERVAL_MS;
use crate::drivers::source::{SampleSource, SimulatedSensor};
use crate::events::{SensorKind, SensorSample};

const GRAVITY: f32 = 9.81;
// Spikes last one filter interval so the rate gate always keeps one of them.
const IMPULSE_WIDTH: Duration = Duration::from_millis(10);

/// One step of a motion script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Device at rest for the given time.
    Still(Duration),
    /// Short knock on the back (z axis), in m/s².
    Knock(f32),
    /// Short sideways jolt (x axis), in m/s².
    Jolt(f32),
}

/// Double back-tap followed, after the cooldown, by a triple shake.
pub fn demo_script() -> Vec<Motion> {
    let ms = Duration::from_millis;
    vec![
        Motion::Still(ms(300)),
        Motion::Knock(4.0),
        Motion::Still(ms(200)),
        Motion::Knock(4.0),
        Motion::Still(ms(1500)),
        Motion::Jolt(60.0),
        Motion::Still(ms(300)),
        Motion::Jolt(-60.0),
        Motion::Still(ms(300)),
        Motion::Jolt(60.0),
        Motion::Still(ms(1000)),
    ]
}

/// Expand `script` into timestamped samples starting at `start`.
pub fn expand(
    script: &[Motion],
    kind: SensorKind,
    start: Instant,
    interval: Duration,
) -> Vec<SensorSample> {
    let rest_z = match kind {
        SensorKind::LinearAcceleration => 0.0,
        SensorKind::Accelerometer => GRAVITY,
    };
    let mut samples = Vec::new();
    let mut t = start;

    for motion in script {
        let (duration, x, z) = match *motion {
            Motion::Still(duration) => (duration, 0.0, rest_z),
            Motion::Knock(magnitude) => (IMPULSE_WIDTH, 0.0, rest_z + magnitude),
            Motion::Jolt(magnitude) => (IMPULSE_WIDTH, magnitude, rest_z),
        };
        let end = t + duration;
        while t < end {
            samples.push(SensorSample::new(t, x, 0.0, z));
            t += interval;
        }
    }
    samples
}

/// Publish `script` in real time.  Returns early when `stop` is raised.
pub fn replay_task(sensor: Arc<SimulatedSensor>, script: Vec<Motion>, stop: Arc<AtomicBool>) {
    log::info!("Replay task started on {}", sensor.kind());

    let interval = Duration::from_millis(REPLAY_SAMPLE_INTERVAL_MS);
    let samples = expand(&script, sensor.kind(), Instant::now(), interval);
    let total = samples.len();

    for sample in samples {
        if stop.load(Ordering::SeqCst) {
            log::warn!("Replay interrupted");
            return;
        }
        // Sleep until the sample's scheduled time, then push it.
        let wait = sample.timestamp.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        sensor.publish(sample);
    }

    log::info!("Replay finished ({} samples)", total);
}
