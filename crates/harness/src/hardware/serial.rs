//! SERIAL1 as a [`TransferEngine`].
//!
//! The same register window is SPIM1, SPIS1, TWIM1, TWIS1 or UARTE1
//! depending on the ENABLE value. [`Serial1`] programs whichever
//! personality the driver asks for and the shared interrupt handler in
//! [`super::irq`] reads [`ACTIVE_KIND`] to decode events.

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use platform::engine::Event;
use platform::{
    Completion, CompletionSignal, Direction, EngineConfig, PeripheralKind, Task, TransferEngine, TransferError,
};

use super::regs::{serial as r, Block, PSEL_DISCONNECTED, SERIAL1};

/// Completion latch raised by the SERIAL1 interrupt handler.
pub static SERIAL1_DONE: CompletionSignal = CompletionSignal::new();

/// Personality currently programmed, for the interrupt handler.
static ACTIVE_KIND: AtomicU8 = AtomicU8::new(KIND_NONE);

const KIND_NONE: u8 = 0;
const KIND_SPIM: u8 = 1;
const KIND_SPIS: u8 = 2;
const KIND_TWIM: u8 = 3;
const KIND_TWIS: u8 = 4;
const KIND_UARTE: u8 = 5;

const fn kind_tag(kind: PeripheralKind) -> u8 {
    match kind {
        PeripheralKind::SpiMaster => KIND_SPIM,
        PeripheralKind::SpiSlave => KIND_SPIS,
        PeripheralKind::TwiMaster => KIND_TWIM,
        PeripheralKind::TwiSlave => KIND_TWIS,
        PeripheralKind::Uart | PeripheralKind::UartLowPower => KIND_UARTE,
        PeripheralKind::None | PeripheralKind::GpioLoopback => KIND_NONE,
    }
}

/// ENABLE value per personality.
const fn enable_value(kind: PeripheralKind) -> u32 {
    match kind {
        PeripheralKind::SpiSlave => 2,
        PeripheralKind::TwiMaster => 6,
        PeripheralKind::SpiMaster => 7,
        PeripheralKind::Uart | PeripheralKind::UartLowPower => 8,
        PeripheralKind::TwiSlave => 9,
        PeripheralKind::None | PeripheralKind::GpioLoopback => 0,
    }
}

/// Write ENABLE for the configured personality. Used by the PORT handler,
/// which holds no engine handle.
pub(crate) fn power_on_active() {
    let kind = match ACTIVE_KIND.load(Ordering::Acquire) {
        KIND_SPIM => PeripheralKind::SpiMaster,
        KIND_SPIS => PeripheralKind::SpiSlave,
        KIND_TWIM => PeripheralKind::TwiMaster,
        KIND_TWIS => PeripheralKind::TwiSlave,
        KIND_UARTE => PeripheralKind::UartLowPower,
        _ => PeripheralKind::None,
    };
    SERIAL1.write(r::ENABLE, enable_value(kind));
}

/// Task register offset. Shared with the routing fabric, which subscribes
/// to `offset + SUBSCRIBE`.
pub(crate) const fn task_offset(task: Task) -> usize {
    match task {
        Task::StartRx => r::TASKS_STARTRX,
        Task::StopRx => r::TASKS_STOPRX,
        Task::StartTx => r::TASKS_STARTTX,
        Task::StopTx => r::TASKS_STOPTX,
        Task::Start => r::TASKS_START,
        Task::Stop => r::TASKS_STOP,
        Task::Resume => r::TASKS_RESUME,
        Task::Release => r::TASKS_RELEASE,
        Task::PrepareRx => r::TASKS_PREPARERX,
        Task::PrepareTx => r::TASKS_PREPARETX,
    }
}

const fn psel(pin: Option<u8>) -> u32 {
    match pin {
        Some(pin) => pin as u32,
        None => PSEL_DISCONNECTED,
    }
}

/// SERIAL1 register block.
pub struct Serial1 {
    regs: Block,
    kind: PeripheralKind,
    interrupts: u32,
}

impl Serial1 {
    /// Take SERIAL1. Only one instance may exist.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            regs: SERIAL1,
            kind: PeripheralKind::None,
            interrupts: 0,
        }
    }

    fn errorsrc(&self) -> Option<usize> {
        match self.kind {
            PeripheralKind::TwiMaster => Some(r::ERRORSRC_TWIM),
            PeripheralKind::TwiSlave => Some(r::ERRORSRC_TWIS),
            PeripheralKind::Uart | PeripheralKind::UartLowPower => Some(r::ERRORSRC_UARTE),
            _ => None,
        }
    }
}

impl TransferEngine for Serial1 {
    fn completion(&self) -> &'static CompletionSignal {
        &SERIAL1_DONE
    }

    fn configure(&mut self, config: &EngineConfig) -> Result<(), TransferError> {
        let kind = config.kind;
        let regs = self.regs;
        regs.write(r::ENABLE, 0);

        let needs_rate = matches!(
            kind,
            PeripheralKind::SpiMaster | PeripheralKind::TwiMaster | PeripheralKind::Uart | PeripheralKind::UartLowPower
        );
        let rate = match (needs_rate, config.bitrate) {
            (false, _) => None,
            (true, None) => return Err(TransferError::UnsupportedBitrate(0)),
            (true, Some(bitrate)) => Some(
                bitrate
                    .register_for(kind)
                    .ok_or(TransferError::UnsupportedBitrate(bitrate.hz()))?,
            ),
        };

        let pins = config.pins;
        let address = config.address.map_or(0, u32::from);
        let (psel, shorts, interrupts) = match kind {
            PeripheralKind::SpiMaster => {
                regs.write(r::SPI_CONFIG, config.spi_mode.config_bits());
                regs.write(r::ORC, 0xFF);
                // END (6) and STOPPED (1)
                ([pins.clock, pins.data_out, pins.data_in, None], 0, (1 << 6) | (1 << 1))
            }
            PeripheralKind::SpiSlave => {
                regs.write(r::SPI_CONFIG, config.spi_mode.config_bits());
                regs.write(r::SPIS_DEF, 0xFF);
                regs.write(r::ORC, 0xFF);
                // END_ACQUIRE; END (1)
                ([pins.clock, pins.data_out, pins.data_in, pins.select], 1 << 2, 1 << 1)
            }
            PeripheralKind::TwiMaster => {
                regs.write(r::TWI_ADDRESS, address);
                // LASTTX_STOP, LASTRX_STOP; STOPPED (1), ERROR (9)
                ([pins.clock, pins.data_out, None, None], (1 << 9) | (1 << 12), (1 << 1) | (1 << 9))
            }
            PeripheralKind::TwiSlave => {
                regs.write(r::TWI_ADDRESS, address);
                regs.write(r::TWIS_CONFIG, 1);
                regs.write(r::ORC, 0xFF);
                // WRITE_SUSPEND, READ_SUSPEND; STOPPED, ERROR, WRITE (25), READ (26)
                (
                    [pins.clock, pins.data_out, None, None],
                    (1 << 13) | (1 << 14),
                    (1 << 1) | (1 << 9) | (1 << 25) | (1 << 26),
                )
            }
            PeripheralKind::Uart | PeripheralKind::UartLowPower => {
                regs.write(r::UARTE_CONFIG, 0);
                // RTS, TXD, CTS, RXD; ENDRX (4), ENDTX (8)
                ([None, pins.data_out, None, pins.data_in], 0, (1 << 4) | (1 << 8))
            }
            PeripheralKind::None | PeripheralKind::GpioLoopback => ([None; 4], 0, 0),
        };

        for (offset, pin) in r::PSEL.iter().zip(psel) {
            regs.write(*offset, psel(pin));
        }
        if let Some(rate) = rate {
            // FREQUENCY and BAUDRATE share the offset.
            regs.write(r::FREQUENCY, rate);
        }
        regs.write(r::SHORTS, shorts);

        self.kind = kind;
        self.interrupts = interrupts;
        ACTIVE_KIND.store(kind_tag(kind), Ordering::Release);
        Ok(())
    }

    fn release(&mut self) {
        let regs = self.regs;
        regs.write(r::ENABLE, 0);
        regs.write(r::INTENCLR, 0xFFFF_FFFF);
        regs.write(r::SHORTS, 0);
        for offset in r::PSEL {
            regs.write(offset, PSEL_DISCONNECTED);
        }
        self.kind = PeripheralKind::None;
        self.interrupts = 0;
        ACTIVE_KIND.store(KIND_NONE, Ordering::Release);
    }

    fn set_powered(&mut self, on: bool) {
        let value = if on { enable_value(self.kind) } else { 0 };
        self.regs.write(r::ENABLE, value);
    }

    fn is_powered(&self) -> bool {
        self.regs.read(r::ENABLE) != 0
    }

    fn listen(&mut self) {
        self.regs.write(r::INTENSET, self.interrupts);
        let irq = interrupt::UARTE1_SPIM1_SPIS1_TWIM1_TWIS1;
        irq.unpend();
        irq.set_priority(Priority::P2);
        // SAFETY: the handler only touches SERIAL1 and SERIAL1_DONE.
        unsafe { irq.enable() };
    }

    fn unlisten(&mut self) {
        interrupt::UARTE1_SPIM1_SPIS1_TWIM1_TWIS1.disable();
        self.regs.write(r::INTENCLR, 0xFFFF_FFFF);
    }

    unsafe fn load_tx(&mut self, data: &[u8]) {
        self.regs.write(r::TXD_PTR, data.as_ptr() as u32);
        self.regs.write(r::TXD_MAXCNT, data.len() as u32);
    }

    unsafe fn load_rx(&mut self, buf: &mut [u8]) {
        self.regs.write(r::RXD_PTR, buf.as_mut_ptr() as u32);
        self.regs.write(r::RXD_MAXCNT, buf.len() as u32);
    }

    fn trigger(&mut self, task: Task) {
        self.regs.trigger(task_offset(task));
    }

    fn amount(&self, direction: Direction) -> usize {
        let offset = match direction {
            Direction::Transmit => r::TXD_AMOUNT,
            Direction::Receive => r::RXD_AMOUNT,
        };
        self.regs.read(offset) as usize
    }

    fn take_error(&mut self) -> Option<u32> {
        let offset = self.errorsrc()?;
        let source = self.regs.read(offset);
        // ERRORSRC is write-one-to-clear.
        self.regs.write(offset, source);
        (source != 0).then_some(source)
    }

    fn take_event(&mut self, event: Event) -> bool {
        let offset = match event {
            Event::TxStarted => r::EVENTS_TXSTARTED,
            Event::RxStarted => r::EVENTS_RXSTARTED,
        };
        self.regs.take(offset)
    }
}

/// SERIAL1 interrupt body.
///
/// Latches the outcome into [`SERIAL1_DONE`]. For TWIS it also prepares the
/// buffer for the direction the master chose and resumes the bus.
pub(crate) fn on_serial1_interrupt() {
    let regs = SERIAL1;
    match ACTIVE_KIND.load(Ordering::Acquire) {
        KIND_SPIM => {
            let ended = regs.take(r::EVENTS_END);
            let stopped = regs.take(r::EVENTS_STOPPED);
            if ended || stopped {
                SERIAL1_DONE.complete(Completion::Done);
            }
        }
        KIND_SPIS => {
            let _ = regs.take(r::EVENTS_ACQUIRED);
            if regs.take(r::EVENTS_END) {
                SERIAL1_DONE.complete(Completion::Done);
            }
        }
        KIND_TWIM => {
            if regs.take(r::EVENTS_ERROR) {
                SERIAL1_DONE.complete(Completion::Error);
            }
            if regs.take(r::EVENTS_STOPPED) {
                SERIAL1_DONE.complete(Completion::Done);
            }
        }
        KIND_TWIS => {
            if regs.take(r::EVENTS_READ) {
                regs.trigger(r::TASKS_PREPARETX);
                regs.trigger(r::TASKS_RESUME);
            }
            if regs.take(r::EVENTS_WRITE) {
                regs.trigger(r::TASKS_PREPARERX);
                regs.trigger(r::TASKS_RESUME);
            }
            if regs.take(r::EVENTS_ERROR) {
                SERIAL1_DONE.complete(Completion::Error);
            }
            if regs.take(r::EVENTS_STOPPED) {
                SERIAL1_DONE.complete(Completion::Done);
            }
        }
        KIND_UARTE => {
            let _ = regs.take(r::EVENTS_TXSTOPPED);
            let ended_rx = regs.take(r::EVENTS_ENDRX);
            let ended_tx = regs.take(r::EVENTS_ENDTX);
            if ended_rx || ended_tx {
                SERIAL1_DONE.complete(Completion::Done);
            }
        }
        _ => {
            // Nothing owns the block; mask everything.
            regs.write(r::INTENCLR, 0xFFFF_FFFF);
        }
    }
}
