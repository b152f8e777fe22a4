// TapShake: Gesture Coordinator
//
// Process-wide cooldown gate shared by every detector.  A single mutex-guarded
// deadline; the check and the set happen under the same lock so two detectors
// firing in the same instant cannot both be granted.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::TRIGGER_COOLDOWN;

#[derive(Debug, Default)]
struct CooldownWindow {
    active_until: Option<Instant>,
}

impl CooldownWindow {
    fn is_active(&self, now: Instant) -> bool {
        self.active_until.is_some_and(|until| now < until)
    }
}

#[derive(Debug)]
pub struct GestureCoordinator {
    cooldown: Duration,
    window: Mutex<CooldownWindow>,
}

impl Default for GestureCoordinator {
    fn default() -> Self {
        Self::new(TRIGGER_COOLDOWN)
    }
}

impl GestureCoordinator {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            window: Mutex::new(CooldownWindow::default()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn is_in_cooldown(&self) -> bool {
        self.is_in_cooldown_at(Instant::now())
    }

    pub fn is_in_cooldown_at(&self, now: Instant) -> bool {
        self.lock().is_active(now)
    }

    /// Time left before the next grant is possible.  Zero when idle.
    pub fn cooldown_remaining_at(&self, now: Instant) -> Duration {
        self.lock()
            .active_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or_default()
    }

    pub fn request_trigger(&self) -> bool {
        self.request_trigger_at(Instant::now())
    }

    /// Grant the trigger and open a new cooldown window, unless one is already
    /// open at `now`.  A denied request changes nothing.
    pub fn request_trigger_at(&self, now: Instant) -> bool {
        let mut window = self.lock();
        if window.is_active(now) {
            return false;
        }
        window.active_until = Some(now + self.cooldown);
        true
    }

    fn lock(&self) -> MutexGuard<'_, CooldownWindow> {
        // The window is a plain deadline; a panic elsewhere cannot leave it
        // half-written.
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
