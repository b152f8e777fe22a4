// Host lifecycle: start/stop, screen-off suspend, live sensitivity changes.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tapshake::config::ServiceConfig;
use tapshake::drivers::source::SimulatedSensor;
use tapshake::timer::ManualScheduler;
use tapshake::{GestureEvent, GestureKind, GestureService, SensorKind, SensorSample, SimulatedHub, Torch};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

struct Host {
    sensor: Arc<SimulatedSensor>,
    scheduler: Arc<ManualScheduler>,
    service: GestureService,
    events: Receiver<GestureEvent>,
}

fn host(config: ServiceConfig) -> Host {
    let hub = SimulatedHub::new().with_sensor(SensorKind::LinearAcceleration);
    let sensor = hub.sensor(SensorKind::LinearAcceleration).unwrap();
    let scheduler = Arc::new(ManualScheduler::new());
    let (tx, events) = mpsc::channel();
    let service = GestureService::new(
        &hub,
        &config,
        Arc::new(Torch::new()),
        scheduler.clone(),
        Some(tx),
    );
    Host {
        sensor,
        scheduler,
        service,
        events,
    }
}

fn double_tap(sensor: &SimulatedSensor, t0: Instant, magnitude: f32) {
    sensor.publish(SensorSample::new(t0, 0.0, 0.0, magnitude));
    sensor.publish(SensorSample::new(t0 + ms(20), 0.0, 0.0, 0.0));
    sensor.publish(SensorSample::new(t0 + ms(200), 0.0, 0.0, magnitude));
    sensor.publish(SensorSample::new(t0 + ms(220), 0.0, 0.0, 0.0));
}

#[test]
fn repeated_start_and_stop_match_single_calls() {
    let host = host(ServiceConfig::default());

    host.service.start();
    let once = host.service.status();
    host.service.start();
    assert_eq!(host.service.status(), once);
    assert_eq!(host.sensor.subscriber_count(), 2);

    host.service.stop();
    let stopped = host.service.status();
    host.service.stop();
    assert_eq!(host.service.status(), stopped);
    assert_eq!(host.sensor.subscriber_count(), 0);
}

#[test]
fn screen_off_suspends_and_screen_on_resumes() {
    let host = host(ServiceConfig::default());
    host.service.start();

    host.service.set_interactive(false);
    assert_eq!(host.sensor.subscriber_count(), 0);
    let status = host.service.status();
    assert!(status.started && !status.interactive);
    assert!(!status.tap.running && !status.shake.running);

    let t0 = Instant::now();
    double_tap(&host.sensor, t0, 4.0);
    assert!(host.events.try_recv().is_err());

    host.service.set_interactive(true);
    assert_eq!(host.sensor.subscriber_count(), 2);
    double_tap(&host.sensor, t0 + ms(1000), 4.0);
    let event = host.events.try_recv().unwrap();
    assert_eq!(event.kind, GestureKind::DoubleTap);
}

#[test]
fn interactive_toggle_before_start_does_not_start() {
    let host = host(ServiceConfig::default());
    host.service.set_interactive(false);
    host.service.set_interactive(true);
    assert_eq!(host.sensor.subscriber_count(), 0);
    assert!(!host.service.status().started);
}

#[test]
fn disabled_tap_stays_off_across_resume() {
    let host = host(ServiceConfig {
        tap_enabled: false,
        ..ServiceConfig::default()
    });
    host.service.start();
    host.service.set_interactive(false);
    host.service.set_interactive(true);

    let status = host.service.status();
    assert!(!status.tap.running);
    assert!(status.shake.running);

    double_tap(&host.sensor, Instant::now(), 4.0);
    assert!(host.events.try_recv().is_err());

    host.service.set_gesture_enabled(GestureKind::DoubleTap, true);
    assert!(host.service.status().tap.running);
}

#[test]
fn sensitivity_change_applies_without_restart() {
    let host = host(ServiceConfig {
        sensitivity: 1,
        ..ServiceConfig::default()
    });
    host.service.start();

    // 3.0 is below the least-sensitive tap band.
    let t0 = Instant::now();
    double_tap(&host.sensor, t0, 3.0);
    assert!(host.events.try_recv().is_err());

    host.service.set_sensitivity(10);
    assert!(host.service.status().tap.running);
    double_tap(&host.sensor, t0 + ms(1000), 3.0);
    assert_eq!(host.events.try_recv().unwrap().kind, GestureKind::DoubleTap);
}

#[test]
fn stop_clears_pending_shake_reset() {
    let host = host(ServiceConfig::default());
    host.service.start();

    let t0 = Instant::now();
    host.sensor.publish(SensorSample::new(t0, 0.0, 0.0, 0.0));
    host.sensor.publish(SensorSample::new(t0 + ms(20), 60.0, 0.0, 0.0));
    assert!(host.service.shake().has_pending_reset());

    host.service.stop();
    assert!(!host.service.shake().has_pending_reset());
    assert_eq!(host.scheduler.advance_to(t0 + ms(5000)), 0);
}
