//! Device dispatch.
//!
//! [`Profile`] is what a menu entry asks for; [`Device`] is the driver it
//! becomes. Dispatch is a plain enum match, one arm per driver.

use platform::{Bitrate, EventRouter, PeripheralKind, PinBank, TransferEngine, TransferError};

use crate::config::HarnessConfig;
use crate::drivers::{
    gpio_loopback, GpioLoopback, LowPowerUart, PinList, Rig, SpiMaster, SpiSlave, TwiMaster, TwiSlave, Uart,
};
use crate::session::TransferBuffers;

/// A selectable driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Everything off, for the idle baseline.
    None,
    /// SPI master.
    SpiMaster {
        /// SCK frequency.
        bitrate: Bitrate,
        /// Use the long CS-to-clock delay.
        extended_delay: bool,
    },
    /// SPI slave.
    SpiSlave,
    /// TWI master.
    TwiMaster {
        /// SCL frequency.
        bitrate: Bitrate,
    },
    /// TWI slave.
    TwiSlave,
    /// Always-on UART.
    Uart {
        /// Baud rate.
        bitrate: Bitrate,
        /// End receptions on a line idle gap.
        idle_timeout: bool,
    },
    /// Handshaked low-power UART.
    UartLowPower {
        /// Baud rate.
        bitrate: Bitrate,
    },
    /// GPIO edge loopback.
    GpioLoopback,
}

impl Profile {
    /// Peripheral personality this profile selects.
    pub const fn kind(self) -> PeripheralKind {
        match self {
            Self::None => PeripheralKind::None,
            Self::SpiMaster { .. } => PeripheralKind::SpiMaster,
            Self::SpiSlave => PeripheralKind::SpiSlave,
            Self::TwiMaster { .. } => PeripheralKind::TwiMaster,
            Self::TwiSlave => PeripheralKind::TwiSlave,
            Self::Uart { .. } => PeripheralKind::Uart,
            Self::UartLowPower { .. } => PeripheralKind::UartLowPower,
            Self::GpioLoopback => PeripheralKind::GpioLoopback,
        }
    }
}

/// The active driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// Nothing selected. Every operation succeeds and moves 0 bytes.
    None,
    /// SPI master.
    SpiMaster(SpiMaster),
    /// SPI slave.
    SpiSlave(SpiSlave),
    /// TWI master.
    TwiMaster(TwiMaster),
    /// TWI slave.
    TwiSlave(TwiSlave),
    /// Always-on UART.
    Uart(Uart),
    /// Handshaked low-power UART.
    UartLowPower(LowPowerUart),
    /// GPIO edge loopback.
    GpioLoopback(GpioLoopback),
}

impl Device {
    /// Build the driver for `profile`. Nothing is touched until
    /// [`init`](Self::init).
    pub fn from_profile(profile: Profile, config: &HarnessConfig) -> Self {
        match profile {
            Profile::None => Self::None,
            Profile::SpiMaster {
                bitrate,
                extended_delay,
            } => Self::SpiMaster(SpiMaster::new(config, bitrate, extended_delay)),
            Profile::SpiSlave => Self::SpiSlave(SpiSlave::new(config)),
            Profile::TwiMaster { bitrate } => Self::TwiMaster(TwiMaster::new(config, bitrate)),
            Profile::TwiSlave => Self::TwiSlave(TwiSlave::new(config)),
            Profile::Uart {
                bitrate,
                idle_timeout,
            } => Self::Uart(Uart::new(config, bitrate, idle_timeout)),
            Profile::UartLowPower { bitrate } => Self::UartLowPower(LowPowerUart::new(config, bitrate)),
            Profile::GpioLoopback => Self::GpioLoopback(GpioLoopback::new(config)),
        }
    }

    /// Peripheral personality.
    pub fn kind(&self) -> PeripheralKind {
        match self {
            Self::None => PeripheralKind::None,
            Self::SpiMaster(_) => PeripheralKind::SpiMaster,
            Self::SpiSlave(_) => PeripheralKind::SpiSlave,
            Self::TwiMaster(_) => PeripheralKind::TwiMaster,
            Self::TwiSlave(_) => PeripheralKind::TwiSlave,
            Self::Uart(_) => PeripheralKind::Uart,
            Self::UartLowPower(_) => PeripheralKind::UartLowPower,
            Self::GpioLoopback(_) => PeripheralKind::GpioLoopback,
        }
    }

    /// Configure pins and hardware.
    pub fn init<E, P, R>(&mut self, rig: &mut Rig<E, P, R>) -> Result<(), TransferError>
    where
        E: TransferEngine,
        P: PinBank,
        R: EventRouter,
    {
        match self {
            Self::None => Ok(()),
            Self::SpiMaster(d) => d.init(rig),
            Self::SpiSlave(d) => d.init(rig),
            Self::TwiMaster(d) => d.init(rig),
            Self::TwiSlave(d) => d.init(rig),
            Self::Uart(d) => d.init(rig),
            Self::UartLowPower(d) => d.init(rig),
            Self::GpioLoopback(d) => d.init(rig),
        }
    }

    /// Send `size` bytes of the transmit buffer. Returns the count the
    /// hardware reports.
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
        match self {
            Self::None => Ok(0),
            Self::SpiMaster(d) => d.send(rig, buffers, size).await,
            Self::SpiSlave(d) => d.send(rig, buffers, size).await,
            Self::TwiMaster(d) => d.send(rig, buffers, size).await,
            Self::TwiSlave(d) => d.send(rig, buffers, size).await,
            Self::Uart(d) => d.send(rig, buffers, size).await,
            Self::UartLowPower(d) => d.send(rig, buffers, size).await,
            Self::GpioLoopback(d) => d.send(rig).await,
        }
    }

    /// Receive up to `size` bytes into the receive buffer. Returns the
    /// count the hardware reports.
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
        match self {
            Self::None => Ok(0),
            Self::SpiMaster(d) => d.recv(rig, buffers, size).await,
            Self::SpiSlave(d) => d.recv(rig, buffers, size).await,
            Self::TwiMaster(d) => d.recv(rig, buffers, size).await,
            Self::TwiSlave(d) => d.recv(rig, buffers, size).await,
            Self::Uart(d) => d.recv(rig, buffers, size).await,
            Self::UartLowPower(d) => d.recv(rig, buffers, size).await,
            Self::GpioLoopback(d) => d.recv(rig).await,
        }
    }

    /// Return the hardware to its reset state. Safe to call twice.
    pub fn deinit<E, P, R>(&mut self, rig: &mut Rig<E, P, R>)
    where
        E: TransferEngine,
        P: PinBank,
        R: EventRouter,
    {
        match self {
            Self::None => {}
            Self::SpiMaster(d) => d.deinit(rig),
            Self::SpiSlave(d) => d.deinit(rig),
            Self::TwiMaster(d) => d.deinit(rig),
            Self::TwiSlave(d) => d.deinit(rig),
            Self::Uart(d) => d.deinit(rig),
            Self::UartLowPower(d) => d.deinit(rig),
            Self::GpioLoopback(d) => d.deinit(rig),
        }
    }

    /// Pins the driver uses, for the selection printout.
    pub fn pins(&self) -> PinList {
        match self {
            Self::None => PinList::new(),
            Self::SpiMaster(d) => d.pins(),
            Self::SpiSlave(d) => d.pins(),
            Self::TwiMaster(d) => d.pins(),
            Self::TwiSlave(d) => d.pins(),
            Self::Uart(d) => d.pins(),
            Self::UartLowPower(d) => d.pins(),
            Self::GpioLoopback(d) => d.pins(),
        }
    }

    /// Extra operator instructions.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::GpioLoopback(_) => Some(gpio_loopback::HINT),
            _ => None,
        }
    }
}
