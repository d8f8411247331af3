//! UARTE0 as a low-power [`Console`].
//!
//! The UART is enabled only while a print or a key read is in progress, so
//! an idle console costs nothing on the rail. Prints go out in chunks from a
//! RAM scratch buffer because EasyDMA cannot read flash.

use core::fmt::{self, Write as _};

use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use platform::{Bitrate, Console, Drive, Level, PinBank, PinConfig, Pull};

use super::pins::Port0;
use super::regs::{serial as r, Block, PSEL_DISCONNECTED, UARTE0};

/// nRF9160 DK VCOM0 transmit.
const TXD: u8 = 29;
/// nRF9160 DK VCOM0 receive.
const RXD: u8 = 28;

const ENABLE_UARTE: u32 = 8;
const CHUNK: usize = 64;

/// ENDRX (4)
const INT_ENDRX: u32 = 1 << 4;

static KEY_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Operator console on UARTE0.
pub struct LowPowerConsole {
    regs: Block,
    scratch: [u8; CHUNK],
    key: [u8; 1],
}

impl LowPowerConsole {
    /// Configure UARTE0 at 115200 baud on the DK's VCOM pins and leave it
    /// disabled.
    pub fn new(pins: &mut Port0) -> Self {
        let regs = UARTE0;
        regs.trigger(r::TASKS_STOPRX);
        regs.write(r::INTENCLR, 0xFFFF_FFFF);
        regs.write(r::ENABLE, 0);

        pins.drive(TXD, Level::High, PinConfig::output(Drive::S0S1));
        pins.configure(RXD, PinConfig::input(Pull::None));
        regs.write(r::PSEL[0], PSEL_DISCONNECTED);
        regs.write(r::PSEL[1], u32::from(TXD));
        regs.write(r::PSEL[2], PSEL_DISCONNECTED);
        regs.write(r::PSEL[3], u32::from(RXD));
        regs.write(r::BAUDRATE, Bitrate::BAUD_115200.uarte_baudrate().unwrap_or(0x01D6_0000));
        regs.write(r::UARTE_CONFIG, 0);

        let irq = interrupt::UARTE0_SPIM0_SPIS0_TWIM0_TWIS0;
        irq.unpend();
        irq.set_priority(Priority::P3);
        // SAFETY: the handler only touches UARTE0 and KEY_READY.
        unsafe { irq.enable() };

        Self {
            regs,
            scratch: [0; CHUNK],
            key: [0],
        }
    }
}

/// Chunked EasyDMA writer.
struct Wire<'a> {
    regs: Block,
    buf: &'a mut [u8; CHUNK],
    len: usize,
}

impl Wire<'_> {
    fn push(&mut self, byte: u8) {
        if self.len >= CHUNK {
            self.flush();
        }
        if let Some(slot) = self.buf.get_mut(self.len) {
            *slot = byte;
            self.len = self.len.saturating_add(1);
        }
    }

    fn flush(&mut self) {
        let Some(chunk) = self.buf.get(..self.len) else {
            return;
        };
        if chunk.is_empty() {
            return;
        }
        let regs = self.regs;
        regs.write(r::TXD_PTR, chunk.as_ptr() as u32);
        regs.write(r::TXD_MAXCNT, chunk.len() as u32);
        regs.write(r::EVENTS_ENDTX, 0);
        regs.trigger(r::TASKS_STARTTX);
        while !regs.take(r::EVENTS_ENDTX) {}
        self.len = 0;
    }
}

impl fmt::Write for Wire<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.push(b'\r');
            }
            self.push(byte);
        }
        Ok(())
    }
}

impl Console for LowPowerConsole {
    fn print(&mut self, args: fmt::Arguments<'_>) {
        let regs = self.regs;
        regs.write(r::ENABLE, ENABLE_UARTE);
        let mut wire = Wire {
            regs,
            buf: &mut self.scratch,
            len: 0,
        };
        let _ = wire.write_fmt(args);
        wire.flush();
        regs.write(r::EVENTS_TXSTOPPED, 0);
        regs.trigger(r::TASKS_STOPTX);
        while !regs.take(r::EVENTS_TXSTOPPED) {}
        regs.write(r::ENABLE, 0);
    }

    async fn read_key(&mut self) -> u8 {
        let regs = self.regs;
        KEY_READY.reset();
        regs.write(r::ENABLE, ENABLE_UARTE);
        regs.write(r::RXD_PTR, self.key.as_mut_ptr() as u32);
        regs.write(r::RXD_MAXCNT, 1);
        regs.write(r::EVENTS_ENDRX, 0);
        regs.write(r::INTENSET, INT_ENDRX);
        regs.trigger(r::TASKS_STARTRX);
        KEY_READY.wait().await;
        regs.write(r::EVENTS_RXTO, 0);
        regs.trigger(r::TASKS_STOPRX);
        while !regs.take(r::EVENTS_RXTO) {}
        regs.write(r::ENABLE, 0);
        let [key] = self.key;
        key
    }
}

/// UARTE0 interrupt body.
pub(crate) fn on_console_interrupt() {
    if UARTE0.take(r::EVENTS_ENDRX) {
        UARTE0.write(r::INTENCLR, INT_ENDRX);
        KEY_READY.signal(());
    }
}
