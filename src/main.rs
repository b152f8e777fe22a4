// TapShake: Host Entry Point
//
// Start-up sequence:
//   1. Initialise logging and parse options.
//   2. Build the sensor hub (simulated) and pick the requested sensor kinds.
//   3. Wire coordinator, torch, deferred-task timer and both detectors.
//   4. Replay a double back-tap followed by a triple shake in real time.
//   5. Report every recognized gesture and the final torch state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};

use tapshake::config::{ServiceConfig, REPLAY_THREAD_NAME, STACK_REPLAY};
use tapshake::events::{SensorKind, TriggerOutcome};
use tapshake::tasks::sensor::{demo_script, replay_task};
use tapshake::timer::ThreadScheduler;
use tapshake::{GestureService, SimulatedHub, Torch};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SensorChoice {
    /// Gravity-filtered stream.
    Linear,
    /// Raw accelerometer only (exercises the fallback).
    Accelerometer,
    /// No motion hardware at all.
    Absent,
}

#[derive(Debug, Parser)]
#[command(name = "tapshake", about = "Double-tap / triple-shake torch toggle demo")]
struct Args {
    /// Gesture sensitivity, 1 (hard) to 10 (easy).  Clamped.
    #[arg(short, long, default_value_t = 5, allow_negative_numbers = true)]
    sensitivity: i32,

    /// Which sensor the simulated device exposes.
    #[arg(long, value_enum, default_value_t = SensorChoice::Linear)]
    sensor: SensorChoice,

    /// Cooldown between granted triggers.
    #[arg(long, default_value_t = 1000)]
    cooldown_ms: u64,

    /// Cut the replay short after this many milliseconds.
    #[arg(long)]
    max_runtime_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    log::info!("TapShake starting…");

    // ---- Hardware -----------------------------------------------------------
    let hub = match args.sensor {
        SensorChoice::Linear => SimulatedHub::new()
            .with_sensor(SensorKind::LinearAcceleration)
            .with_sensor(SensorKind::Accelerometer),
        SensorChoice::Accelerometer => SimulatedHub::new().with_sensor(SensorKind::Accelerometer),
        SensorChoice::Absent => SimulatedHub::new(),
    };

    // ---- Engine -------------------------------------------------------------
    let config = ServiceConfig {
        sensitivity: args.sensitivity,
        cooldown: Duration::from_millis(args.cooldown_ms),
        ..ServiceConfig::default()
    };
    let torch = Arc::new(Torch::new());
    let scheduler = Arc::new(ThreadScheduler::new()?);
    let (event_tx, event_rx) = mpsc::channel();

    let service = GestureService::new(
        &hub,
        &config,
        torch.clone(),
        scheduler,
        Some(event_tx),
    );
    service.start();

    let status = service.status();
    log::info!(
        "Sensitivity {} | tap: {:?} | shake: {:?}",
        status.sensitivity.get(),
        status.tap.sensor,
        status.shake.sensor
    );

    let Some(kind) = status.tap.sensor.or(status.shake.sensor) else {
        log::warn!("No accelerometer on this device; gestures disabled");
        return Ok(());
    };
    let Some(sensor) = hub.sensor(kind) else {
        anyhow::bail!("sensor {} vanished from the hub", kind);
    };

    // ---- Replay ---------------------------------------------------------------
    let stop = Arc::new(AtomicBool::new(false));
    let replay_stop = Arc::clone(&stop);
    let replay = thread::Builder::new()
        .name(REPLAY_THREAD_NAME.into())
        .stack_size(STACK_REPLAY)
        .spawn(move || replay_task(sensor, demo_script(), replay_stop))?;

    let deadline = args
        .max_runtime_ms
        .map(|limit| Instant::now() + Duration::from_millis(limit));
    let mut activated = 0u32;
    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) && !stop.swap(true, Ordering::SeqCst) {
            log::info!("Run time limit reached; stopping replay");
        }

        match event_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                match &event.outcome {
                    TriggerOutcome::Activated => activated += 1,
                    TriggerOutcome::Suppressed => {}
                    TriggerOutcome::ActuatorFailed(reason) => {
                        log::warn!("Actuator error: {}", reason)
                    }
                }
                log::info!("Gesture: {} -> {:?}", event.kind, event.outcome);
            }
            Err(RecvTimeoutError::Timeout) if replay.is_finished() => break,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if replay.join().is_err() {
        log::error!("Replay thread panicked");
    }

    service.stop();
    log::info!(
        "Done: {} trigger(s), torch is {}",
        activated,
        if torch.is_on() { "on" } else { "off" }
    );
    Ok(())
}
