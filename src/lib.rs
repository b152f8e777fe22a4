// TapShake: Gesture Detection & Arbitration Engine
//
// Turns a raw accelerometer stream into discrete gestures (double back-tap,
// triple shake) and makes sure one physical gesture toggles the torch exactly
// once, however many detectors noticed it.
//
// Pipeline:
//   SampleSource -> SignalFilter -> {TapDetector, ShakeDetector}
//                -> GestureCoordinator::request_trigger -> Actuator

pub mod config;
pub mod coordinator;
pub mod detectors;
pub mod drivers;
pub mod events;
pub mod filter;
pub mod sensitivity;
pub mod service;
pub mod tasks;
pub mod timer;

pub use coordinator::GestureCoordinator;
pub use detectors::{Dispatch, GestureDetector, ShakeDetector, TapDetector};
pub use drivers::source::{SampleSource, SensorHub, SimulatedHub, SimulatedSensor};
pub use drivers::torch::{Actuator, Torch};
pub use events::{GestureEvent, GestureKind, SensorKind, SensorSample, TriggerOutcome};
pub use sensitivity::{DetectorConfig, SensitivityLevel, SensitivityProfile};
pub use service::GestureService;
