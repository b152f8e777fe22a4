// TapShake: Torch Actuator
//
// The side effect a granted gesture performs.  `Torch` stands in for the
// flash hardware: it flips a lit flag and can be marked busy to make
// activation fail.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub trait Actuator: Send + Sync {
    fn activate(&self) -> anyhow::Result<()>;
}

impl<F> Actuator for F
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    fn activate(&self) -> anyhow::Result<()> {
        self()
    }
}

#[derive(Debug, Default)]
pub struct Torch {
    lit: AtomicBool,
    busy: AtomicBool,
    toggles: AtomicU32,
}

impl Torch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.lit.load(Ordering::SeqCst)
    }

    pub fn toggle_count(&self) -> u32 {
        self.toggles.load(Ordering::SeqCst)
    }

    /// Simulate the camera holding the flash.
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }
}

impl Actuator for Torch {
    fn activate(&self) -> anyhow::Result<()> {
        if self.busy.load(Ordering::SeqCst) {
            anyhow::bail!("torch is held by another client");
        }
        let was_on = self.lit.fetch_xor(true, Ordering::SeqCst);
        self.toggles.fetch_add(1, Ordering::SeqCst);
        log::info!("Torch {}", if was_on { "off" } else { "on" });
        Ok(())
    }
}
