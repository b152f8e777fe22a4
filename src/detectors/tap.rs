// TapShake: Double Back-Tap Detector
//
// Two light knocks on the back of the device within half a second.  A knock
// must land inside the band (low, high): below `low` is handling noise, at or
// above `high` is vigorous motion (a shake), which cancels the run.
// Recognition is eager: the second tap fires immediately.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Instant;

use crate::config::SENSOR_PREFERENCE;
use crate::detectors::{Dispatch, GestureDetector, Subscription};
use crate::drivers::source::{select_source, SampleSource, SensorHub};
use crate::events::{GestureKind, SensorKind, SensorSample};
use crate::filter::SignalFilter;
use crate::sensitivity::{DetectorConfig, SensitivityLevel, SensitivityProfile};

// ---------------------------------------------------------------------------
// Recognition state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TapRecognizer {
    event_count: u8,
    last_event_time: Option<Instant>,
}

impl TapRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self) -> u8 {
        self.event_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed one filtered magnitude.  Returns `true` when this sample completes
    /// a double tap.
    pub fn on_magnitude(
        &mut self,
        magnitude: f32,
        at: Instant,
        in_cooldown: bool,
        config: &DetectorConfig,
    ) -> bool {
        // A trigger was just consumed somewhere; drop any partial run.
        if in_cooldown {
            self.event_count = 0;
            return false;
        }

        let high = config.high_threshold.unwrap_or(f32::INFINITY);
        if !(magnitude > config.low_threshold && magnitude < high) {
            if magnitude >= high {
                if self.event_count > 0 {
                    log::trace!("Vigorous motion ({:.2}) cancelled tap run", magnitude);
                }
                self.event_count = 0;
            }
            // Noise below the band, or an unusable reading.
            return false;
        }

        let elapsed = self.last_event_time.map(|last| at.saturating_duration_since(last));
        if elapsed.is_some_and(|e| e < config.min_gap) {
            // Bounce from the same knock.
            return false;
        }

        match elapsed {
            Some(e) if e <= config.time_window => {
                self.event_count = self.event_count.saturating_add(1);
            }
            _ => self.event_count = 1,
        }
        self.last_event_time = Some(at);

        if self.event_count >= config.required_count {
            self.event_count = 0;
            return true;
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

struct TapState {
    active: bool,
    filter: SignalFilter,
    recognizer: TapRecognizer,
}

struct TapShared {
    config: RwLock<DetectorConfig>,
    state: Mutex<TapState>,
    dispatch: Dispatch,
}

impl TapShared {
    fn state(&self) -> MutexGuard<'_, TapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn config(&self) -> DetectorConfig {
        *self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_sample(&self, sample: SensorSample) {
        let config = self.config();
        let fired = {
            let mut state = self.state();
            if !state.active {
                return;
            }
            let Some(magnitude) = state.filter.filter(&sample) else {
                return;
            };
            let in_cooldown = self.dispatch.coordinator().is_in_cooldown_at(sample.timestamp);
            state
                .recognizer
                .on_magnitude(magnitude, sample.timestamp, in_cooldown, &config)
        };

        if fired {
            self.dispatch.fire(GestureKind::DoubleTap, sample.timestamp);
        }
    }
}

pub struct TapDetector {
    subscription: Subscription,
    shared: Arc<TapShared>,
}

impl TapDetector {
    /// Pick a sensor from `hub` (gravity-filtered first) and build the
    /// detector.  Without any sensor the detector is built unavailable.
    pub fn new(hub: &dyn SensorHub, level: SensitivityLevel, dispatch: Dispatch) -> Self {
        Self::with_source(select_source(hub, &SENSOR_PREFERENCE), level, dispatch)
    }

    pub fn with_source(
        source: Option<Arc<dyn SampleSource>>,
        level: SensitivityLevel,
        dispatch: Dispatch,
    ) -> Self {
        let kind = source
            .as_ref()
            .map(|s| s.kind())
            .unwrap_or(SensorKind::LinearAcceleration);
        Self {
            subscription: Subscription::new(GestureKind::DoubleTap, source),
            shared: Arc::new(TapShared {
                config: RwLock::new(SensitivityProfile::tap(level, kind)),
                state: Mutex::new(TapState {
                    active: false,
                    filter: SignalFilter::default(),
                    recognizer: TapRecognizer::new(),
                }),
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
}

impl GestureDetector for TapDetector {
    fn gesture(&self) -> GestureKind {
        GestureKind::DoubleTap
    }

    fn sensor_kind(&self) -> Option<SensorKind> {
        self.subscription.sensor_kind()
    }

    fn start(&self) -> bool {
        let weak: Weak<TapShared> = Arc::downgrade(&self.shared);
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
            state.recognizer.reset();
        });
    }

    fn is_running(&self) -> bool {
        self.subscription.is_attached()
    }

    fn set_sensitivity(&self, level: SensitivityLevel) {
        let kind = self.sensor_kind().unwrap_or(SensorKind::LinearAcceleration);
        let config = SensitivityProfile::tap(level, kind);
        *self
            .shared
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
        log::debug!(
            "Tap sensitivity {} -> band ({:.2}, {:.2})",
            level.get(),
            config.low_threshold,
            config.high_threshold.unwrap_or(f32::INFINITY)
        );
    }

    fn config(&self) -> DetectorConfig {
        self.shared.config()
    }
}

impl Drop for TapDetector {
    fn drop(&mut self) {
        self.stop();
    }
}
