//! GPIO response-time loopback.
//!
//! "Receive" drives the output high and arms an edge watch on the input.
//! The interrupt handler itself drives the output low, so the delay from
//! input edge to output edge on a scope is pure interrupt latency.
//! "Send" is a one second high pulse on the output.

use embassy_time::{Duration, Timer};
use platform::routing::EdgeResponse;
use platform::{Drive, EventRouter, Level, PinBank, PinConfig, Polarity, Pull, Slot, TransferError};

use super::{pin_list, release_pins, PinList, Rig};
use crate::config::{HarnessConfig, LoopbackPins};

/// Operator hint printed after selection.
pub const HINT: &str = "Select 'Receive' and pull input low to measure response time on output";

/// Input edge to output pin driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioLoopback {
    pins: LoopbackPins,
    slot: Slot,
    pulse: Duration,
    active: bool,
}

impl GpioLoopback {
    /// Driver on the configured loopback pins.
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            pins: config.loopback,
            slot: config.routing.loopback_slot,
            pulse: config.timing.gpio_pulse,
            active: false,
        }
    }

    /// Output low, input with pull-up.
    pub fn init<E, P, R>(&mut self, rig: &mut Rig<E, P, R>) -> Result<(), TransferError>
    where
        P: PinBank,
    {
        let LoopbackPins { input, output } = self.pins;
        rig.pins
            .drive(output, Level::Low, PinConfig::output(Drive::S0S1).connected());
        rig.pins.configure(input, PinConfig::input(Pull::Up));
        self.active = true;
        Ok(())
    }

    /// Pulse the output high. Always reports 0 bytes.
    pub async fn send<E, P, R>(&mut self, rig: &mut Rig<E, P, R>) -> Result<usize, TransferError>
    where
        P: PinBank,
    {
        if !self.active {
            return Err(TransferError::NotInitialised);
        }
        let output = self.pins.output;
        rig.pins.set_level(output, Level::High);
        Timer::after(self.pulse).await;
        rig.pins.set_level(output, Level::Low);
        Ok(0)
    }

    /// Output high, then wait for the input to fall. Always reports 0
    /// bytes.
    pub async fn recv<E, P, R>(&mut self, rig: &mut Rig<E, P, R>) -> Result<usize, TransferError>
    where
        P: PinBank,
        R: EventRouter,
    {
        if !self.active {
            return Err(TransferError::NotInitialised);
        }
        let LoopbackPins { input, output } = self.pins;
        rig.pins.set_level(output, Level::High);
        rig.router.watch_edge(self.slot, input, Polarity::HiToLo);
        rig.router.listen_edge(
            self.slot,
            Some(EdgeResponse {
                pin: output,
                level: Level::Low,
            }),
        );
        rig.router.wait_edge(self.slot).await;
        rig.router.unlisten_edge(self.slot);
        rig.router.disable_watch(self.slot, input);
        rig.router.clear_watch(self.slot);
        rig.pins.set_level(output, Level::Low);
        Ok(0)
    }

    /// Both pins back to reset.
    pub fn deinit<E, P, R>(&mut self, rig: &mut Rig<E, P, R>)
    where
        P: PinBank,
    {
        if !self.active {
            return;
        }
        release_pins(&mut rig.pins, &[self.pins.output, self.pins.input]);
        self.active = false;
    }

    /// Pin assignment printout.
    pub fn pins(&self) -> PinList {
        pin_list(&[("Input", self.pins.input), ("Output", self.pins.output)])
    }
}
