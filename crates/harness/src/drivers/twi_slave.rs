//! TWI slave.
//!
//! Both directions load their buffer and wait for the master. READ and
//! WRITE are shorted to SUSPEND; the interrupt handler prepares the buffer
//! for whichever direction the master chose and resumes. After STOPPED the
//! driver checks TXSTARTED or RXSTARTED to confirm the master went the way
//! the test expected.

use embassy_time::Duration;
use platform::engine::Event;
use platform::{
    Direction, EngineConfig, EventRouter, PeripheralKind, PinBank, PinRoles, Task, TransferEngine, TransferError,
};

use super::twi_master::BUS_LINE;
use super::{ensure_ready, pin_list, release_pins, rx_window, tx_window, PinList, Rig};
use crate::config::{HarnessConfig, TwiPins};
use crate::session::TransferBuffers;
use crate::transfer::{Plan, TimeoutPolicy};

/// TWIS driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwiSlave {
    pins: TwiPins,
    address: u8,
    window: Duration,
}

impl TwiSlave {
    /// Driver answering on the configured address.
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            pins: config.twi,
            address: config.twi_address,
            window: config.timing.twi_slave_window,
        }
    }

    /// Bus lines, then the engine.
    pub fn init<E, P, R>(&mut self, rig: &mut Rig<E, P, R>) -> Result<(), TransferError>
    where
        E: TransferEngine,
        P: PinBank,
    {
        let TwiPins { scl, sda } = self.pins;
        rig.pins.configure(scl, BUS_LINE);
        rig.pins.configure(sda, BUS_LINE);
        let config = EngineConfig::new(PeripheralKind::TwiSlave)
            .with_pins(PinRoles::twi(scl, sda))
            .with_address(self.address);
        rig.machine.init(&config, true)
    }

    /// Serve a master read of up to `size` bytes.
    pub async fn send<E, P, R>(
        &mut self,
        rig: &mut Rig<E, P, R>,
        buffers: &mut TransferBuffers,
        size: usize,
    ) -> Result<usize, TransferError>
    where
        E: TransferEngine,
        P: PinBank,
        R: EventRouter,
    {
        ensure_ready(&rig.machine)?;
        let tx = tx_window(&buffers.tx, size)?;
        rig.machine.arm()?;
        // SAFETY: the transfer settles before the buffer is touched again.
        unsafe { rig.machine.engine().load_tx(tx) };
        self.serve(rig, Direction::Transmit, Event::TxStarted).await
    }

    /// Accept a master write of up to `size` bytes.
    pub async fn recv<E, P, R>(
        &mut self,
        rig: &mut Rig<E, P, R>,
        buffers: &mut TransferBuffers,
        size: usize,
    ) -> Result<usize, TransferError>
    where
        E: TransferEngine,
        P: PinBank,
        R: EventRouter,
    {
        ensure_ready(&rig.machine)?;
        let rx = rx_window(&mut buffers.rx, size)?;
        rig.machine.arm()?;
        // SAFETY: as in `send`.
        unsafe { rig.machine.engine().load_rx(rx) };
        self.serve(rig, Direction::Receive, Event::RxStarted).await
    }

    async fn serve<E, P, R>(&mut self, rig: &mut Rig<E, P, R>, direction: Direction, expected: Event) -> Result<usize, TransferError>
    where
        E: TransferEngine,
    {
        let plan = Plan::peer_started(direction)
            .stop_with(Task::Stop)
            .deadline(self.window, TimeoutPolicy::Fail);
        let outcome = rig.machine.settle(&plan).await?;
        if !rig.machine.engine().take_event(expected) {
            debug!("master addressed the other direction");
            return Err(TransferError::WrongDirection);
        }
        Ok(outcome.amount)
    }

    /// Engine off, lines back to reset.
    pub fn deinit<E, P, R>(&mut self, rig: &mut Rig<E, P, R>)
    where
        E: TransferEngine,
        P: PinBank,
    {
        rig.machine.deinit();
        release_pins(&mut rig.pins, &[self.pins.scl, self.pins.sda]);
    }

    /// Pin assignment printout.
    pub fn pins(&self) -> PinList {
        pin_list(&[("SCL", self.pins.scl), ("SDA", self.pins.sda)])
    }
}
