//! GPIO port P0 as a [`PinBank`].

use platform::{Level, PinBank, PinConfig};

use super::regs::{gpio as r, indexed, Block, P0};

/// Single-bit mask for `pin`, empty for out-of-range pins.
pub(crate) fn bit(pin: u8) -> u32 {
    1u32.checked_shl(u32::from(pin)).unwrap_or(0)
}

/// Drive `pin` low for eight cycles, then high again. Wide enough for the
/// peer's GPIOTE to latch, too short to read as a REQ release.
pub(crate) fn pulse_low(pin: u8) {
    let mask = bit(pin);
    critical_section::with(|_| {
        P0.write(r::OUTCLR, mask);
        for _ in 0..8 {
            cortex_m::asm::nop();
        }
        P0.write(r::OUTSET, mask);
    });
}

/// Port P0.
pub struct Port0 {
    regs: Block,
}

impl Port0 {
    /// Take P0. Only one instance may exist.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { regs: P0 }
    }
}

impl PinBank for Port0 {
    fn configure(&mut self, pin: u8, config: PinConfig) {
        self.regs.write(indexed(r::PIN_CNF, pin), config.to_bits());
    }

    fn config(&self, pin: u8) -> PinConfig {
        PinConfig::from_bits(self.regs.read(indexed(r::PIN_CNF, pin)))
    }

    fn set_level(&mut self, pin: u8, level: Level) {
        let offset = match level {
            Level::High => r::OUTSET,
            Level::Low => r::OUTCLR,
        };
        self.regs.write(offset, bit(pin));
    }

    fn level(&self, pin: u8) -> Level {
        Level::from(self.regs.read(r::IN) & bit(pin) != 0)
    }
}
