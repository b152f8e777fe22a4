// TapShake: Sample Sources
//
// Push-style sensor streams.  A detector picks one source at construction
// from a `SensorHub`, trying the gravity-filtered stream first, then the raw
// accelerometer.  No re-selection happens afterwards.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::events::{SensorKind, SensorSample};

/// Callback invoked for every sample at the sensor's native rate.
pub type SampleListener = Arc<dyn Fn(SensorSample) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub trait SampleSource: Send + Sync {
    fn kind(&self) -> SensorKind;
    fn subscribe(&self, listener: SampleListener) -> SubscriptionId;
    /// Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Hardware inventory: which sensor kinds exist on this device.
pub trait SensorHub: Send + Sync {
    fn open(&self, kind: SensorKind) -> Option<Arc<dyn SampleSource>>;
}

/// First available source in `preference` order.
pub fn select_source(
    hub: &dyn SensorHub,
    preference: &[SensorKind],
) -> Option<Arc<dyn SampleSource>> {
    for (i, &kind) in preference.iter().enumerate() {
        if let Some(source) = hub.open(kind) {
            if i > 0 {
                log::info!("Sensor {} unavailable; falling back to {}", preference[0], kind);
            }
            return Some(source);
        }
    }
    log::warn!("No usable sensor among {:?}", preference);
    None
}

// ---------------------------------------------------------------------------
// In-process simulated sensor
// ---------------------------------------------------------------------------

pub struct SimulatedSensor {
    kind: SensorKind,
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, SampleListener)>>,
}

impl SimulatedSensor {
    pub fn new(kind: SensorKind) -> Self {
        Self {
            kind,
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Deliver one sample to every current subscriber, in subscription order.
    pub fn publish(&self, sample: SensorSample) {
        // Snapshot so a listener may unsubscribe from inside its callback.
        let listeners: Vec<SampleListener> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(sample);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, SampleListener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SampleSource for SimulatedSensor {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn subscribe(&self, listener: SampleListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().retain(|(sub, _)| *sub != id);
    }
}

/// Hub exposing whichever simulated sensors were installed.
#[derive(Default)]
pub struct SimulatedHub {
    sensors: HashMap<SensorKind, Arc<SimulatedSensor>>,
}

impl SimulatedHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sensor(mut self, kind: SensorKind) -> Self {
        self.sensors
            .insert(kind, Arc::new(SimulatedSensor::new(kind)));
        self
    }

    pub fn sensor(&self, kind: SensorKind) -> Option<Arc<SimulatedSensor>> {
        self.sensors.get(&kind).cloned()
    }
}

impl SensorHub for SimulatedHub {
    fn open(&self, kind: SensorKind) -> Option<Arc<dyn SampleSource>> {
        self.sensors
            .get(&kind)
            .map(|sensor| Arc::clone(sensor) as Arc<dyn SampleSource>)
    }
}
