// TapShake: Gesture Detectors
//
// Shared plumbing for the tap and shake detectors: the trigger path through
// the coordinator to the actuator, and subscription bookkeeping for the
// start/stop lifecycle.

pub mod shake;
pub mod tap;

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::coordinator::GestureCoordinator;
use crate::drivers::source::{SampleListener, SampleSource, SubscriptionId};
use crate::drivers::torch::Actuator;
use crate::events::{GestureEvent, GestureKind, SensorKind, TriggerOutcome};
use crate::sensitivity::{DetectorConfig, SensitivityLevel};

pub use shake::{ShakeDetector, ShakeRecognizer, ShakeStep};
pub use tap::{TapDetector, TapRecognizer};

/// Lifecycle and tuning surface the host drives.
pub trait GestureDetector: Send + Sync {
    fn gesture(&self) -> GestureKind;

    /// `None` when no usable sensor was found at construction.
    fn sensor_kind(&self) -> Option<SensorKind>;

    fn is_available(&self) -> bool {
        self.sensor_kind().is_some()
    }

    /// Subscribe to the sample source.  Returns whether the detector is
    /// running afterwards; an unavailable detector never runs.
    fn start(&self) -> bool;

    /// Unsubscribe and clear all in-flight state.
    fn stop(&self);

    fn is_running(&self) -> bool;

    /// Swap thresholds without touching the recognition state.
    fn set_sensitivity(&self, level: SensitivityLevel);

    fn config(&self) -> DetectorConfig;
}

// ---------------------------------------------------------------------------
// Trigger path: coordinator -> actuator -> host channel
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Dispatch {
    coordinator: Arc<GestureCoordinator>,
    actuator: Arc<dyn Actuator>,
    events: Option<Sender<GestureEvent>>,
}

impl Dispatch {
    pub fn new(coordinator: Arc<GestureCoordinator>, actuator: Arc<dyn Actuator>) -> Self {
        Self {
            coordinator,
            actuator,
            events: None,
        }
    }

    /// Also publish every recognized gesture on `events`.
    pub fn with_events(mut self, events: Sender<GestureEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn coordinator(&self) -> &Arc<GestureCoordinator> {
        &self.coordinator
    }

    /// Ask the coordinator for the trigger and run the actuator if granted.
    /// Actuator errors are reported, not retried, and leave the cooldown in
    /// place.
    pub fn fire(&self, kind: GestureKind, at: Instant) -> TriggerOutcome {
        let outcome = if !self.coordinator.request_trigger_at(at) {
            log::debug!("{} recognized during cooldown; suppressed", kind);
            TriggerOutcome::Suppressed
        } else {
            match self.actuator.activate() {
                Ok(()) => {
                    log::info!("{} recognized; actuator triggered", kind);
                    TriggerOutcome::Activated
                }
                Err(e) => {
                    log::warn!("{} recognized but actuator failed: {:#}", kind, e);
                    TriggerOutcome::ActuatorFailed(format!("{:#}", e))
                }
            }
        };

        if let Some(events) = &self.events {
            // Host may have stopped listening; recognition carries on.
            let _ = events.send(GestureEvent {
                kind,
                at,
                outcome: outcome.clone(),
            });
        }
        outcome
    }
}

// ---------------------------------------------------------------------------
// Subscription bookkeeping
// ---------------------------------------------------------------------------

pub(crate) struct Subscription {
    gesture: GestureKind,
    source: Option<Arc<dyn SampleSource>>,
    id: Mutex<Option<SubscriptionId>>,
}

impl Subscription {
    pub(crate) fn new(gesture: GestureKind, source: Option<Arc<dyn SampleSource>>) -> Self {
        if source.is_none() {
            log::warn!("{} detector unavailable: no accelerometer", gesture);
        }
        Self {
            gesture,
            source,
            id: Mutex::new(None),
        }
    }

    pub(crate) fn sensor_kind(&self) -> Option<SensorKind> {
        self.source.as_ref().map(|s| s.kind())
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.id.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Run `arm` then subscribe `listener`, unless already subscribed.
    pub(crate) fn attach(&self, arm: impl FnOnce(), listener: SampleListener) -> bool {
        let mut id = self.id.lock().unwrap_or_else(PoisonError::into_inner);
        if id.is_some() {
            return true;
        }
        let Some(source) = &self.source else {
            log::debug!("{} detector has no sensor; start ignored", self.gesture);
            return false;
        };
        arm();
        *id = Some(source.subscribe(listener));
        log::info!("{} detector started on {}", self.gesture, source.kind());
        true
    }

    /// Unsubscribe, then run `disarm`.  Returns whether anything was attached.
    pub(crate) fn detach(&self, disarm: impl FnOnce()) -> bool {
        let mut id = self.id.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sub) = id.take() else {
            return false;
        };
        if let Some(source) = &self.source {
            source.unsubscribe(sub);
        }
        disarm();
        log::info!("{} detector stopped", self.gesture);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::torch::Torch;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn fire_activates_once_per_cooldown() {
        let coordinator = Arc::new(GestureCoordinator::default());
        let torch = Arc::new(Torch::new());
        let (tx, rx) = mpsc::channel();
        let dispatch = Dispatch::new(coordinator, torch.clone()).with_events(tx);
        let t0 = Instant::now();

        assert_eq!(dispatch.fire(GestureKind::DoubleTap, t0), TriggerOutcome::Activated);
        assert_eq!(
            dispatch.fire(GestureKind::TripleShake, t0 + Duration::from_millis(10)),
            TriggerOutcome::Suppressed
        );
        assert_eq!(torch.toggle_count(), 1);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, GestureKind::DoubleTap);
        assert_eq!(events[1].outcome, TriggerOutcome::Suppressed);
    }

    #[test]
    fn actuator_failure_keeps_the_cooldown() {
        let coordinator = Arc::new(GestureCoordinator::default());
        let torch = Arc::new(Torch::new());
        torch.set_busy(true);
        let dispatch = Dispatch::new(Arc::clone(&coordinator), torch.clone());
        let t0 = Instant::now();

        let outcome = dispatch.fire(GestureKind::DoubleTap, t0);
        assert!(matches!(outcome, TriggerOutcome::ActuatorFailed(_)));
        assert!(outcome.was_granted());
        assert!(coordinator.is_in_cooldown_at(t0 + Duration::from_millis(500)));

        torch.set_busy(false);
        assert_eq!(
            dispatch.fire(GestureKind::DoubleTap, t0 + Duration::from_millis(500)),
            TriggerOutcome::Suppressed
        );
        assert_eq!(torch.toggle_count(), 0);
    }
}
