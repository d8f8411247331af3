//! Peripheral drivers.
//!
//! Each driver owns its configuration and borrows the shared [`Rig`] for
//! every call, so switching drivers never moves hardware handles around.
//! All drivers expose the same four operations: `init`, `send`, `recv` and
//! `deinit`. [`crate::device::Device`] dispatches between them.

pub mod gpio_loopback;
pub mod spi_master;
pub mod spi_slave;
pub mod twi_master;
pub mod twi_slave;
pub mod uart;
pub mod uart_lp;

pub use gpio_loopback::GpioLoopback;
pub use spi_master::SpiMaster;
pub use spi_slave::SpiSlave;
pub use twi_master::TwiMaster;
pub use twi_slave::TwiSlave;
pub use uart::Uart;
pub use uart_lp::LowPowerUart;

use platform::{PinBank, TransferEngine, TransferError};

use crate::transfer::{check_length, TransferMachine};

/// Hardware shared by every driver: the serial block behind its state
/// machine, the GPIO port and the routing fabric.
pub struct Rig<E, P, R> {
    /// Transfer state machine over the serial block.
    pub machine: TransferMachine<E>,
    /// GPIO port.
    pub pins: P,
    /// GPIOTE, DPPI and idle timer.
    pub router: R,
}

impl<E, P, R> Rig<E, P, R> {
    /// Bundle the hardware.
    pub fn new(machine: TransferMachine<E>, pins: P, router: R) -> Self {
        Self {
            machine,
            pins,
            router,
        }
    }
}

/// One line of the pin assignment printout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinLabel {
    /// Signal name, e.g. `SCL`.
    pub role: &'static str,
    /// P0 pin number.
    pub pin: u8,
}

/// Pin assignment of one driver.
pub type PinList = heapless::Vec<PinLabel, 4>;

pub(crate) fn pin_list(labels: &[(&'static str, u8)]) -> PinList {
    labels
        .iter()
        .take(4)
        .map(|&(role, pin)| PinLabel { role, pin })
        .collect()
}

/// Fail fast before touching any pin if the engine is not up.
pub(crate) fn ensure_ready<E: TransferEngine>(machine: &TransferMachine<E>) -> Result<(), TransferError> {
    if machine.is_initialised() {
        Ok(())
    } else {
        Err(TransferError::NotInitialised)
    }
}

/// Bounds-checked prefix of a transmit buffer.
pub(crate) fn tx_window(buf: &[u8], size: usize) -> Result<&[u8], TransferError> {
    check_length(size, buf.len())?;
    buf.get(..size).ok_or(TransferError::InvalidLength {
        requested: size,
        capacity: buf.len(),
    })
}

/// Bounds-checked prefix of a receive buffer.
pub(crate) fn rx_window(buf: &mut [u8], size: usize) -> Result<&mut [u8], TransferError> {
    let capacity = buf.len();
    check_length(size, capacity)?;
    buf.get_mut(..size).ok_or(TransferError::InvalidLength {
        requested: size,
        capacity,
    })
}

/// Return every pin in `pins` to the reset state.
pub(crate) fn release_pins<P: PinBank>(bank: &mut P, pins: &[u8]) {
    for &pin in pins {
        bank.disconnect(pin);
    }
}
