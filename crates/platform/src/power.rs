//! SoC power mode control.
//!
//! The nRF91 POWER block offers two system ON sub-modes. In constant latency
//! mode the HFINT clock and regulators stay up, so interrupt latency is fixed
//! but idle current rises. In low power mode they are gated when idle.

/// System ON sub-mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    /// TASKS_CONSTLAT: keep clocks on, fixed wakeup latency.
    ConstantLatency,
    /// TASKS_LOWPWR: gate clocks while idle (reset default).
    LowPower,
}

impl PowerMode {
    /// Operator-facing description.
    pub const fn describe(self) -> &'static str {
        match self {
            Self::ConstantLatency => "Constant latency mode",
            Self::LowPower => "low power mode",
        }
    }
}

/// POWER block interface.
pub trait PowerControl {
    /// Trigger the task for `mode`.
    fn set_mode(&mut self, mode: PowerMode);

    /// Last mode requested, if any.
    fn mode(&self) -> Option<PowerMode> {
        None
    }
}
