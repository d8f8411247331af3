//! POWER block as [`PowerControl`].

use platform::{PowerControl, PowerMode};

use super::regs::{power as r, POWER};

/// POWER block. Starts in the reset default, low power mode.
pub struct PowerBlock {
    mode: Option<PowerMode>,
}

impl PowerBlock {
    /// Take the POWER block.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { mode: None }
    }
}

impl PowerControl for PowerBlock {
    fn set_mode(&mut self, mode: PowerMode) {
        let task = match mode {
            PowerMode::ConstantLatency => r::TASKS_CONSTLAT,
            PowerMode::LowPower => r::TASKS_LOWPWR,
        };
        POWER.trigger(task);
        self.mode = Some(mode);
    }

    fn mode(&self) -> Option<PowerMode> {
        self.mode
    }
}
