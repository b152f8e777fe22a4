// TapShake: Gesture Service
//
// Host-facing bundle: one coordinator, one actuator, both detectors.  The
// host flips three switches (started, interactive, per-gesture enabled) and
// the service works out which detectors should be subscribed.  Screen-off
// suspends everything to save battery; screen-on resumes what is enabled.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::ServiceConfig;
use crate::coordinator::GestureCoordinator;
use crate::detectors::{Dispatch, GestureDetector, ShakeDetector, TapDetector};
use crate::drivers::source::{select_source, SensorHub};
use crate::drivers::torch::Actuator;
use crate::events::{GestureEvent, GestureKind, SensorKind};
use crate::sensitivity::SensitivityLevel;
use crate::timer::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorStatus {
    pub available: bool,
    pub enabled: bool,
    pub running: bool,
    pub sensor: Option<SensorKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    pub started: bool,
    pub interactive: bool,
    pub sensitivity: SensitivityLevel,
    pub tap: DetectorStatus,
    pub shake: DetectorStatus,
}

#[derive(Debug)]
struct Switches {
    started: bool,
    interactive: bool,
    sensitivity: SensitivityLevel,
    tap_enabled: bool,
    shake_enabled: bool,
}

pub struct GestureService {
    coordinator: Arc<GestureCoordinator>,
    tap: TapDetector,
    shake: ShakeDetector,
    switches: Mutex<Switches>,
}

impl GestureService {
    pub fn new(
        hub: &dyn SensorHub,
        config: &ServiceConfig,
        actuator: Arc<dyn Actuator>,
        scheduler: Arc<dyn Scheduler>,
        events: Option<Sender<GestureEvent>>,
    ) -> Self {
        let coordinator = Arc::new(GestureCoordinator::new(config.cooldown));
        let mut dispatch = Dispatch::new(Arc::clone(&coordinator), actuator);
        if let Some(events) = events {
            dispatch = dispatch.with_events(events);
        }
        let level = SensitivityLevel::from(config.sensitivity);

        let tap = TapDetector::with_source(
            select_source(hub, &config.sensor_preference),
            level,
            dispatch.clone(),
        );
        let shake = ShakeDetector::with_source(
            select_source(hub, &config.sensor_preference),
            level,
            dispatch,
            scheduler,
        );

        Self {
            coordinator,
            tap,
            shake,
            switches: Mutex::new(Switches {
                started: false,
                interactive: true,
                sensitivity: level,
                tap_enabled: config.tap_enabled,
                shake_enabled: config.shake_enabled,
            }),
        }
    }

    pub fn coordinator(&self) -> &Arc<GestureCoordinator> {
        &self.coordinator
    }

    pub fn tap(&self) -> &TapDetector {
        &self.tap
    }

    pub fn shake(&self) -> &ShakeDetector {
        &self.shake
    }

    pub fn start(&self) {
        let mut switches = self.lock();
        if !switches.started {
            log::info!("Gesture service starting");
            switches.started = true;
        }
        self.apply(&switches);
    }

    pub fn stop(&self) {
        let mut switches = self.lock();
        if switches.started {
            log::info!("Gesture service stopping");
            switches.started = false;
        }
        self.apply(&switches);
    }

    /// Screen on/off from the host.  Non-interactive suspends both detectors.
    pub fn set_interactive(&self, interactive: bool) {
        let mut switches = self.lock();
        if switches.interactive != interactive {
            log::info!(
                "Device {}; {} detectors",
                if interactive { "interactive" } else { "idle" },
                if interactive { "resuming" } else { "suspending" }
            );
            switches.interactive = interactive;
        }
        self.apply(&switches);
    }

    pub fn set_gesture_enabled(&self, kind: GestureKind, enabled: bool) {
        let mut switches = self.lock();
        match kind {
            GestureKind::DoubleTap => switches.tap_enabled = enabled,
            GestureKind::TripleShake => switches.shake_enabled = enabled,
        }
        self.apply(&switches);
    }

    /// Clamped to 1..=10 and applied to running detectors in place.
    pub fn set_sensitivity(&self, level: i32) {
        let level: SensitivityLevel = level.into();
        let mut switches = self.lock();
        switches.sensitivity = level;
        self.tap.set_sensitivity(level);
        self.shake.set_sensitivity(level);
        log::info!("Sensitivity set to {}", level.get());
    }

    pub fn status(&self) -> ServiceStatus {
        let switches = self.lock();
        ServiceStatus {
            started: switches.started,
            interactive: switches.interactive,
            sensitivity: switches.sensitivity,
            tap: detector_status(&self.tap, switches.tap_enabled),
            shake: detector_status(&self.shake, switches.shake_enabled),
        }
    }

    fn apply(&self, switches: &Switches) {
        let live = switches.started && switches.interactive;
        drive(&self.tap, live && switches.tap_enabled);
        drive(&self.shake, live && switches.shake_enabled);
    }

    fn lock(&self) -> MutexGuard<'_, Switches> {
        self.switches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for GestureService {
    fn drop(&mut self) {
        self.tap.stop();
        self.shake.stop();
    }
}

fn drive(detector: &dyn GestureDetector, run: bool) {
    if run {
        detector.start();
    } else {
        detector.stop();
    }
}

fn detector_status(detector: &dyn GestureDetector, enabled: bool) -> DetectorStatus {
    DetectorStatus {
        available: detector.is_available(),
        enabled,
        running: detector.is_running(),
        sensor: detector.sensor_kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::SimulatedHub;
    use crate::drivers::torch::Torch;
    use crate::timer::ManualScheduler;

    fn service(hub: &SimulatedHub) -> GestureService {
        GestureService::new(
            hub,
            &ServiceConfig::default(),
            Arc::new(Torch::new()),
            Arc::new(ManualScheduler::new()),
            None,
        )
    }

    #[test]
    fn constructed_service_is_idle() {
        let hub = SimulatedHub::new().with_sensor(SensorKind::LinearAcceleration);
        let service = service(&hub);
        let status = service.status();
        assert!(!status.started);
        assert!(!status.tap.running);
        assert!(!status.shake.running);
        assert_eq!(status.sensitivity.get(), 5);
    }

    #[test]
    fn start_runs_enabled_detectors() {
        let hub = SimulatedHub::new().with_sensor(SensorKind::LinearAcceleration);
        let service = service(&hub);
        service.start();
        let status = service.status();
        assert!(status.tap.running && status.shake.running);
        assert_eq!(status.tap.sensor, Some(SensorKind::LinearAcceleration));
    }

    #[test]
    fn disabling_a_gesture_stops_only_that_detector() {
        let hub = SimulatedHub::new().with_sensor(SensorKind::LinearAcceleration);
        let service = service(&hub);
        service.start();
        service.set_gesture_enabled(GestureKind::TripleShake, false);
        let status = service.status();
        assert!(status.tap.running);
        assert!(!status.shake.running);
        assert!(!status.shake.enabled);
    }

    #[test]
    fn sensitivity_is_clamped() {
        let hub = SimulatedHub::new().with_sensor(SensorKind::LinearAcceleration);
        let service = service(&hub);
        service.set_sensitivity(42);
        assert_eq!(service.status().sensitivity.get(), 10);
        service.set_sensitivity(-3);
        assert_eq!(service.status().sensitivity.get(), 1);
    }

    #[test]
    fn no_hardware_degrades_quietly() {
        let hub = SimulatedHub::new();
        let service = service(&hub);
        service.start();
        let status = service.status();
        assert!(status.started);
        assert!(!status.tap.available && !status.tap.running);
        assert!(!status.shake.available && !status.shake.running);
    }
}
