//! TWI master.
//!
//! SCL and SDA are open drain with the internal pull-ups, so two boards can
//! be wired together without external resistors. LASTTX/LASTRX are shorted
//! to STOP, so STOPPED marks completion. On ERROR the handler latches the
//! failure and the state machine reads ERRORSRC, issues STOP and waits for
//! STOPPED before reporting.

use platform::{
    Bitrate, Direction, Drive, EngineConfig, EventRouter, PeripheralKind, PinBank, PinConfig, PinRoles, Pull, Task,
    TransferEngine, TransferError,
};

use super::{ensure_ready, pin_list, release_pins, rx_window, tx_window, PinList, Rig};
use crate::config::{HarnessConfig, TwiPins};
use crate::session::TransferBuffers;
use crate::transfer::Plan;

/// Bus line configuration: input connected, pull-up, open drain.
pub(crate) const BUS_LINE: PinConfig = PinConfig::input(Pull::Up).with_drive(Drive::S0D1);

/// TWIM driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwiMaster {
    pins: TwiPins,
    bitrate: Bitrate,
    address: u8,
}

impl TwiMaster {
    /// Driver at `bitrate` addressing the configured target.
    pub fn new(config: &HarnessConfig, bitrate: Bitrate) -> Self {
        Self {
            pins: config.twi,
            bitrate,
            address: config.twi_address,
        }
    }

    /// Configured clock.
    pub fn bitrate(&self) -> Bitrate {
        self.bitrate
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
        let config = EngineConfig::new(PeripheralKind::TwiMaster)
            .with_bitrate(self.bitrate)
            .with_pins(PinRoles::twi(scl, sda))
            .with_address(self.address);
        rig.machine.init(&config, true)
    }

    /// Write `size` bytes to the target.
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
        // SAFETY: the transfer settles before the buffer is touched again.
        unsafe { rig.machine.engine().load_tx(tx) };
        let plan = Plan::new(Direction::Transmit, Task::StartTx).stop_with(Task::Stop);
        Ok(rig.machine.run(&plan).await?.amount)
    }

    /// Read `size` bytes from the target.
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
        // SAFETY: as in `send`.
        unsafe { rig.machine.engine().load_rx(rx) };
        let plan = Plan::new(Direction::Receive, Task::StartRx).stop_with(Task::Stop);
        Ok(rig.machine.run(&plan).await?.amount)
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
