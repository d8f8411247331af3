//! SPI master with manual chip select.
//!
//! CS is a plain GPIO so the CS-to-clock delay can be stretched for slaves
//! that need time to wake. Each transfer waits `spi_lead_in` first so the
//! slave on the other board is armed before the clock starts.

use embassy_time::{Delay, Duration, Timer};
use embedded_hal::delay::DelayNs;
use platform::{
    Bitrate, Direction, Drive, EngineConfig, EventRouter, Level, PeripheralKind, PinBank, PinConfig, PinRoles, Pull, Task,
    TransferEngine, TransferError,
};

use super::{ensure_ready, pin_list, release_pins, rx_window, tx_window, PinList, Rig};
use crate::config::{HarnessConfig, SpiPins};
use crate::session::TransferBuffers;
use crate::transfer::Plan;

/// SPIM driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiMaster {
    pins: SpiPins,
    bitrate: Bitrate,
    lead_in: Duration,
    csn_to_clk_us: u32,
    clk_to_csn_us: u32,
}

impl SpiMaster {
    /// Driver for `bitrate`. `extended_delay` selects the long CS-to-clock
    /// delay.
    pub fn new(config: &HarnessConfig, bitrate: Bitrate, extended_delay: bool) -> Self {
        let timing = &config.timing;
        Self {
            pins: config.spi_master,
            bitrate,
            lead_in: timing.spi_lead_in,
            csn_to_clk_us: if extended_delay {
                timing.csn_to_clk_extended_us
            } else {
                timing.csn_to_clk_us
            },
            clk_to_csn_us: timing.clk_to_csn_us,
        }
    }

    /// Configured clock.
    pub fn bitrate(&self) -> Bitrate {
        self.bitrate
    }

    /// CS low to first clock, in microseconds.
    pub fn csn_to_clk_us(&self) -> u32 {
        self.csn_to_clk_us
    }

    /// MISO input, engine up, then SCK and MOSI as outputs and CS high.
    pub fn init<E, P, R>(&mut self, rig: &mut Rig<E, P, R>) -> Result<(), TransferError>
    where
        E: TransferEngine,
        P: PinBank,
    {
        let SpiPins { sck, mosi, miso, cs } = self.pins;
        rig.pins.configure(miso, PinConfig::input(Pull::None));
        let config = EngineConfig::new(PeripheralKind::SpiMaster)
            .with_bitrate(self.bitrate)
            .with_pins(PinRoles::spi_master(sck, mosi, miso));
        rig.machine.init(&config, true)?;
        rig.pins.configure(sck, PinConfig::output(Drive::H0H1));
        rig.pins.configure(mosi, PinConfig::output(Drive::H0H1));
        rig.pins.drive(cs, Level::High, PinConfig::output(Drive::H0H1));
        Ok(())
    }

    /// Clock out `size` bytes of the transmit buffer.
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
        Timer::after(self.lead_in).await;
        let engine = rig.machine.engine();
        // SAFETY: both buffers outlive the transfer, which settles before
        // this function returns.
        unsafe {
            engine.load_tx(tx);
            engine.load_rx(rx);
        }
        self.transact(rig, Direction::Transmit).await
    }

    /// Clock in `size` bytes.
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
        Timer::after(self.lead_in).await;
        let engine = rig.machine.engine();
        // SAFETY: as in `send`.
        unsafe {
            engine.load_tx(tx);
            engine.load_rx(rx);
        }
        self.transact(rig, Direction::Receive).await
    }

    async fn transact<E, P, R>(&mut self, rig: &mut Rig<E, P, R>, direction: Direction) -> Result<usize, TransferError>
    where
        E: TransferEngine,
        P: PinBank,
    {
        let cs = self.pins.cs;
        rig.pins.set_level(cs, Level::Low);
        Delay.delay_us(self.csn_to_clk_us);
        let outcome = rig
            .machine
            .run(&Plan::new(direction, Task::Start).stop_with(Task::Stop))
            .await;
        Delay.delay_us(self.clk_to_csn_us);
        rig.pins.set_level(cs, Level::High);
        Ok(outcome?.amount)
    }

    /// Engine off, every pin back to reset.
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
        pin_list(&[("SCK", sck), ("MOSI", mosi), ("MISO", miso), ("CS", cs)])
    }
}
