//! EasyDMA transfer engine abstraction.
//!
//! One [`TransferEngine`] wraps one serial block (on the nRF9160 the shared
//! SERIAL1 instance that can be SPIM, SPIS, TWIM, TWIS or UARTE). The engine
//! only knows registers: pointers, counts, tasks and events. Sequencing lives
//! in the harness transfer state machine.

use core::fmt;

use crate::completion::CompletionSignal;
use crate::peripheral::{Bitrate, PeripheralKind, PinRoles, SpiMode};

/// Largest MAXCNT the nRF9160 EasyDMA accepts (13-bit field).
pub const MAX_COUNT: usize = 0x1FFF;

/// Transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Memory to bus.
    Transmit,
    /// Bus to memory.
    Receive,
}

/// Hardware tasks the harness triggers, either from software or through a
/// DPPI subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Task {
    /// SPIM: start a full-duplex transaction.
    Start,
    /// SPIM/TWIM/TWIS: stop the current transaction.
    Stop,
    /// UARTE/TWIM: start transmitting.
    StartTx,
    /// UARTE: stop transmitting.
    StopTx,
    /// UARTE/TWIM: start receiving.
    StartRx,
    /// UARTE: stop receiving.
    StopRx,
    /// SPIS: hand the semaphore to the peripheral.
    Release,
    /// TWIS: resume after a READ/WRITE suspend.
    Resume,
    /// TWIS: prepare the TX buffer.
    PrepareTx,
    /// TWIS: prepare the RX buffer.
    PrepareRx,
}

/// Events a driver inspects after completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// TWIS: the master read from us.
    TxStarted,
    /// TWIS: the master wrote to us.
    RxStarted,
}

/// Static engine configuration applied by [`TransferEngine::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    /// Which personality of the serial block to use.
    pub kind: PeripheralKind,
    /// Clock or baud rate. `None` for slave roles.
    pub bitrate: Option<Bitrate>,
    /// Pin selection.
    pub pins: PinRoles,
    /// Own address (TWIS) or target address (TWIM).
    pub address: Option<u8>,
    /// Clock polarity and phase for SPI roles.
    pub spi_mode: SpiMode,
}

impl EngineConfig {
    /// Configuration with no pins, no bitrate and SPI mode 3.
    pub const fn new(kind: PeripheralKind) -> Self {
        Self {
            kind,
            bitrate: None,
            pins: PinRoles::none(),
            address: None,
            spi_mode: SpiMode::Mode3,
        }
    }

    /// Set the bitrate.
    pub const fn with_bitrate(mut self, bitrate: Bitrate) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Set the pin roles.
    pub const fn with_pins(mut self, pins: PinRoles) -> Self {
        self.pins = pins;
        self
    }

    /// Set the bus address.
    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = Some(address);
        self
    }
}

/// Transfer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// The engine raised ERROR; carries the raw, non-zero ERRORSRC value.
    Hardware(u32),
    /// The engine raised ERROR but ERRORSRC held no source bit.
    UnknownFault,
    /// The stop task was never acknowledged. The engine may still own the
    /// buffer; only a deinit returns the instance to service.
    StopUnacknowledged,
    /// Requested length is zero or exceeds the buffer or MAXCNT.
    InvalidLength {
        /// Bytes asked for.
        requested: usize,
        /// Bytes available.
        capacity: usize,
    },
    /// send/recv before init, or after deinit.
    NotInitialised,
    /// A transfer is already armed on this instance.
    Busy,
    /// TWI slave: the master addressed the opposite direction.
    WrongDirection,
    /// No bus activity within the slave wait window.
    TimedOut,
    /// The engine has no register encoding for this rate (Hz).
    UnsupportedBitrate(u32),
}

const EIO: i32 = 5;
const EINVAL: i32 = 22;
const ENODEV: i32 = 19;
const EBUSY: i32 = 16;
const EBADR: i32 = 53;
const ETIME: i32 = 62;
const ETIMEDOUT: i32 = 116;
const ENOTSUP: i32 = 134;

impl TransferError {
    /// Error for a latched ERROR, given what ERRORSRC held.
    pub fn from_errorsrc(source: Option<u32>) -> Self {
        match source {
            Some(src) if src != 0 => Self::Hardware(src),
            _ => Self::UnknownFault,
        }
    }

    /// Negative status code printed by the operator menu.
    ///
    /// Hardware errors are the negated ERRORSRC value; the rest follow
    /// errno numbering. Never zero.
    pub fn code(&self) -> i32 {
        match self {
            Self::Hardware(src) => i32::try_from(*src).map_or(i32::MIN, |v| v.wrapping_neg()),
            Self::UnknownFault => -EIO,
            Self::StopUnacknowledged => -ETIME,
            Self::InvalidLength { .. } => -EINVAL,
            Self::NotInitialised => -ENODEV,
            Self::Busy => -EBUSY,
            Self::WrongDirection => -EBADR,
            Self::TimedOut => -ETIMEDOUT,
            Self::UnsupportedBitrate(_) => -ENOTSUP,
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(src) => write!(f, "engine error, ERRORSRC={src:#x}"),
            Self::UnknownFault => write!(f, "engine error with empty ERRORSRC"),
            Self::StopUnacknowledged => write!(f, "stop task not acknowledged"),
            Self::InvalidLength {
                requested,
                capacity,
            } => write!(f, "invalid length {requested} (capacity {capacity})"),
            Self::NotInitialised => write!(f, "device not initialised"),
            Self::Busy => write!(f, "transfer already in flight"),
            Self::WrongDirection => write!(f, "master addressed the opposite direction"),
            Self::TimedOut => write!(f, "no bus activity"),
            Self::UnsupportedBitrate(hz) => write!(f, "unsupported bitrate {hz} Hz"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TransferError {}

/// One EasyDMA serial block.
///
/// Methods map one-to-one onto register writes so the harness controls the
/// exact sequence measured on the power analyser.
pub trait TransferEngine {
    /// Completion latch raised by this engine's interrupt handler.
    fn completion(&self) -> &'static CompletionSignal;

    /// Select the personality, pins, rate and shortcuts.
    ///
    /// Fails with [`TransferError::UnsupportedBitrate`] if the rate has no
    /// register encoding for this personality.
    fn configure(&mut self, config: &EngineConfig) -> Result<(), TransferError>;

    /// Undo [`configure`](Self::configure): clear shortcuts and disconnect
    /// PSEL. Safe to call on an unconfigured engine.
    fn release(&mut self);

    /// Write ENABLE. A disabled engine draws no current.
    fn set_powered(&mut self, on: bool);

    /// Current ENABLE state.
    fn is_powered(&self) -> bool;

    /// Enable the completion interrupts for the configured personality and
    /// unmask the IRQ line.
    fn listen(&mut self);

    /// Mask every interrupt this engine can raise.
    fn unlisten(&mut self);

    /// Point TXD at `data` and set TXD.MAXCNT to its length.
    ///
    /// # Safety
    ///
    /// `data` must stay valid and unaliased by writers until the completion
    /// settles and the engine has stopped.
    unsafe fn load_tx(&mut self, data: &[u8]);

    /// Point RXD at `buf` and set RXD.MAXCNT to its length.
    ///
    /// # Safety
    ///
    /// `buf` must stay valid and otherwise unaccessed until the completion
    /// settles and the engine has stopped.
    unsafe fn load_rx(&mut self, buf: &mut [u8]);

    /// Trigger a task.
    fn trigger(&mut self, task: Task);

    /// TXD.AMOUNT or RXD.AMOUNT of the last transfer.
    fn amount(&self, direction: Direction) -> usize;

    /// Read and clear ERRORSRC. `None` if no error bits are set.
    fn take_error(&mut self) -> Option<u32>;

    /// Read and clear an event flag.
    fn take_event(&mut self, event: Event) -> bool;
}
