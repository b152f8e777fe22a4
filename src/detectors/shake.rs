// TapShake: Triple Shake Detector
//
// Three sharp jolts within the window.  Works on the change between
// consecutive vectors, so gravity cancels out on either sensor kind.  A run
// that stalls is cleared by a deferred reset, re-armed on every jolt.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Instant;

use crate::config::SENSOR_PREFERENCE;
use crate::detectors::{Dispatch, GestureDetector, Subscription};
use crate::drivers::source::{select_source, SampleSource, SensorHub};
use crate::events::{GestureKind, SensorKind, SensorSample};
use crate::filter::{delta_magnitude, SignalFilter};
use crate::sensitivity::{DetectorConfig, SensitivityLevel, SensitivityProfile};
use crate::timer::{Scheduler, TaskHandle};

/// Result of feeding one sample to a [`ShakeRecognizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShakeStep {
    /// Nothing qualified.
    Idle,
    /// A jolt counted toward the current run (or started a new one).
    Counted,
    /// The run reached the required count.
    Completed,
}

// ---------------------------------------------------------------------------
// Recognition state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ShakeRecognizer {
    previous: Option<SensorSample>,
    event_count: u8,
    last_event_time: Option<Instant>,
    run: u64,
}

impl ShakeRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self) -> u8 {
        self.event_count
    }

    /// Identifies the current run; bumps whenever a run restarts.
    pub fn run(&self) -> u64 {
        self.run
    }

    /// Forget everything except the run counter, so stale resets scheduled
    /// for an older run stay inert.
    pub fn reset(&mut self) {
        self.previous = None;
        self.event_count = 0;
        self.last_event_time = None;
        self.run = self.run.wrapping_add(1);
    }

    /// Deferred-reset target: zero the count if `run` is still current.
    pub fn expire(&mut self, run: u64) -> bool {
        if run != self.run || self.event_count == 0 {
            return false;
        }
        self.event_count = 0;
        true
    }

    pub fn on_sample(&mut self, sample: SensorSample, config: &DetectorConfig) -> ShakeStep {
        // A bad reading must not become the reference for the next delta.
        if !sample.is_finite() {
            return ShakeStep::Idle;
        }
        let Some(previous) = self.previous.replace(sample) else {
            return ShakeStep::Idle;
        };
        if !(delta_magnitude(&previous, &sample) > config.low_threshold) {
            return ShakeStep::Idle;
        }

        let at = sample.timestamp;
        let elapsed = self.last_event_time.map(|last| at.saturating_duration_since(last));
        if elapsed.is_some_and(|e| e <= config.min_gap) {
            return ShakeStep::Idle;
        }

        match elapsed {
            Some(e) if e <= config.time_window && self.event_count > 0 => {
                self.event_count = self.event_count.saturating_add(1);
            }
            _ => {
                self.run = self.run.wrapping_add(1);
                self.event_count = 1;
            }
        }
        self.last_event_time = Some(at);

        if self.event_count >= config.required_count {
            self.event_count = 0;
            ShakeStep::Completed
        } else {
            ShakeStep::Counted
        }
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

struct ShakeState {
    active: bool,
    filter: SignalFilter,
    recognizer: ShakeRecognizer,
    pending_reset: Option<TaskHandle>,
}

impl ShakeState {
    fn cancel_reset(&mut self) {
        if let Some(handle) = self.pending_reset.take() {
            handle.cancel();
        }
    }
}

struct ShakeShared {
    config: RwLock<DetectorConfig>,
    state: Mutex<ShakeState>,
    scheduler: Arc<dyn Scheduler>,
    dispatch: Dispatch,
}

impl ShakeShared {
    fn state(&self) -> MutexGuard<'_, ShakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn config(&self) -> DetectorConfig {
        *self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_sample(self: &Arc<Self>, sample: SensorSample) {
        let config = self.config();
        let completed = {
            let mut state = self.state();
            if !state.active || !state.filter.accept(&sample) {
                return;
            }
            match state.recognizer.on_sample(sample, &config) {
                ShakeStep::Idle => false,
                ShakeStep::Counted => {
                    state.cancel_reset();
                    let run = state.recognizer.run();
                    let weak = Arc::downgrade(self);
                    let handle = self.scheduler.schedule_at(
                        sample.timestamp + config.time_window,
                        Box::new(move || Self::expire(&weak, run)),
                    );
                    state.pending_reset = Some(handle);
                    false
                }
                ShakeStep::Completed => {
                    state.cancel_reset();
                    true
                }
            }
        };

        if completed {
            self.dispatch.fire(GestureKind::TripleShake, sample.timestamp);
        }
    }

    fn expire(weak: &Weak<Self>, run: u64) {
        // Detector dropped or stopped since scheduling: nothing to do.
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut state = shared.state();
        if !state.active {
            return;
        }
        if state.recognizer.expire(run) {
            log::trace!("Shake run {} timed out", run);
            state.pending_reset = None;
        }
    }
}

pub struct ShakeDetector {
    subscription: Subscription,
    shared: Arc<ShakeShared>,
}

impl ShakeDetector {
    pub fn new(
        hub: &dyn SensorHub,
        level: SensitivityLevel,
        dispatch: Dispatch,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self::with_source(
            select_source(hub, &SENSOR_PREFERENCE),
            level,
            dispatch,
            scheduler,
        )
    }

    pub fn with_source(
        source: Option<Arc<dyn SampleSource>>,
        level: SensitivityLevel,
        dispatch: Dispatch,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            subscription: Subscription::new(GestureKind::TripleShake, source),
            shared: Arc::new(ShakeShared {
                config: RwLock::new(SensitivityProfile::shake(level)),
                state: Mutex::new(ShakeState {
                    active: false,
                    filter: SignalFilter::default(),
                    recognizer: ShakeRecognizer::new(),
                    pending_reset: None,
                }),
                scheduler,
                dispatch,
            }),
        }
    }

    /// Feed a sample directly, bypassing the subscription.  Ignored unless
    /// the detector is running.
    pub fn on_sample(&self, sample: SensorSample) {
        self.shared.on_sample(sample);
    }

    pub fn event_count(&self) -> u8 {
        self.shared.state().recognizer.event_count()
    }

    pub fn has_pending_reset(&self) -> bool {
        self.shared.state().pending_reset.is_some()
    }
}

impl GestureDetector for ShakeDetector {
    fn gesture(&self) -> GestureKind {
        GestureKind::TripleShake
    }

    fn sensor_kind(&self) -> Option<SensorKind> {
        self.subscription.sensor_kind()
    }

    fn start(&self) -> bool {
        let weak = Arc::downgrade(&self.shared);
        self.subscription.attach(
            || {
                let mut state = self.shared.state();
                state.active = true;
                state.filter.reset();
                state.recognizer.reset();
            },
            Arc::new(move |sample: SensorSample| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_sample(sample);
                }
            }),
        )
    }

    fn stop(&self) {
        self.subscription.detach(|| {
            let mut state = self.shared.state();
            state.active = false;
            state.cancel_reset();
            state.recognizer.reset();
        });
    }

    fn is_running(&self) -> bool {
        self.subscription.is_attached()
    }

    fn set_sensitivity(&self, level: SensitivityLevel) {
        let config = SensitivityProfile::shake(level);
        *self
            .shared
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
        log::debug!(
            "Shake sensitivity {} -> threshold {:.2}",
            level.get(),
            config.low_threshold
        );
    }

    fn config(&self) -> DetectorConfig {
        self.shared.config()
    }
}

impl Drop for ShakeDetector {
    fn drop(&mut self) {
        self.stop();
    }
}
