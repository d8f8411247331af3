//! SPI slave.
//!
//! The CPU owns the SPIS semaphore between transfers. Loading the buffers
//! and triggering RELEASE hands it to the peripheral, which then waits for
//! the master to assert CSN. END fires when CSN is released.

use platform::{
    Direction, Drive, EngineConfig, EventRouter, PeripheralKind, PinBank, PinConfig, PinRoles, Pull, Task, TransferEngine,
    TransferError,
};

use super::{ensure_ready, pin_list, release_pins, rx_window, tx_window, PinList, Rig};
use crate::config::{HarnessConfig, SpiPins};
use crate::session::TransferBuffers;
use crate::transfer::Plan;

/// SPIS driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiSlave {
    pins: SpiPins,
}

impl SpiSlave {
    /// Driver on the configured slave pins.
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            pins: config.spi_slave,
        }
    }

    /// SCK, MOSI and CSN inputs, engine up, MISO output.
    pub fn init<E, P, R>(&mut self, rig: &mut Rig<E, P, R>) -> Result<(), TransferError>
    where
        E: TransferEngine,
        P: PinBank,
    {
        let SpiPins { sck, mosi, miso, cs } = self.pins;
        for pin in [sck, mosi, cs] {
            rig.pins.configure(pin, PinConfig::input(Pull::None));
        }
        let config = EngineConfig::new(PeripheralKind::SpiSlave).with_pins(PinRoles::spi_slave(sck, mosi, miso, cs));
        rig.machine.init(&config, true)?;
        rig.pins.configure(miso, PinConfig::output(Drive::H0H1));
        Ok(())
    }

    /// Offer `size` bytes to the next master transaction.
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
        let rx = buffers.rx.get_mut(..0).unwrap_or_default();
        let engine = rig.machine.engine();
        // SAFETY: the transfer settles before the buffers are touched again.
        unsafe {
            engine.load_tx(tx);
            engine.load_rx(rx);
        }
        let outcome = rig.machine.run(&Plan::new(Direction::Transmit, Task::Release)).await?;
        Ok(outcome.amount)
    }

    /// Accept up to `size` bytes from the next master transaction.
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
        let (tx, rx) = (&buffers.tx, &mut buffers.rx);
        let rx = rx_window(rx, size)?;
        let tx = tx.get(..0).unwrap_or_default();
        let engine = rig.machine.engine();
        // SAFETY: as in `send`.
        unsafe {
            engine.load_tx(tx);
            engine.load_rx(rx);
        }
        let outcome = rig.machine.run(&Plan::new(Direction::Receive, Task::Release)).await?;
        Ok(outcome.amount)
    }

    /// Engine off, pins back to reset.
    pub fn deinit<E, P, R>(&mut self, rig: &mut Rig<E, P, R>)
    where
        E: TransferEngine,
        P: PinBank,
    {
        rig.machine.deinit();
        let SpiPins { sck, mosi, miso, cs } = self.pins;
        release_pins(&mut rig.pins, &[sck, mosi, miso, cs]);
    }

    /// Pin assignment printout.
    pub fn pins(&self) -> PinList {
        let SpiPins { sck, mosi, miso, cs } = self.pins;
        pin_list(&[("CSN", cs), ("SCK", sck), ("MOSI", mosi), ("MISO", miso)])
    }
}
